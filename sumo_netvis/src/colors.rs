use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::net::LaneKind;

/// An RGBA color, each component in [0, 1]. Serialized as a `#RRGGBBAA` string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb_f(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb_f(1.0, 1.0, 1.0);
    pub const RED: Color = Color::rgb_f(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb_f(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb_f(0.0, 0.0, 1.0);
    pub const CYAN: Color = Color::rgb_f(0.0, 1.0, 1.0);
    pub const MAGENTA: Color = Color::rgb_f(1.0, 0.0, 1.0);
    pub const YELLOW: Color = Color::rgb_f(1.0, 1.0, 0.0);
    pub const ORANGE: Color = Color::rgb_f(1.0, 0.5, 0.0);
    pub const GREY: Color = Color::rgb_f(0.5, 0.5, 0.5);
    pub const INVISIBLE: Color = Color::rgba_f(0.0, 0.0, 0.0, 0.0);

    pub fn rgb(r: usize, g: usize, b: usize) -> Color {
        Color::rgba(r, g, b, 1.0)
    }

    pub const fn rgb_f(r: f32, g: f32, b: f32) -> Color {
        Color { r, g, b, a: 1.0 }
    }

    pub fn rgba(r: usize, g: usize, b: usize, a: f32) -> Color {
        Color {
            r: (r as f32) / 255.0,
            g: (g as f32) / 255.0,
            b: (b as f32) / 255.0,
            a,
        }
    }

    pub const fn rgba_f(r: f32, g: f32, b: f32, a: f32) -> Color {
        Color { r, g, b, a }
    }

    pub fn alpha(self, a: f32) -> Color {
        Color { a, ..self }
    }

    pub fn lerp(self, other: Color, pct: f64) -> Color {
        let pct = pct as f32;
        Color::rgba_f(
            self.r + (other.r - self.r) * pct,
            self.g + (other.g - self.g) * pct,
            self.b + (other.b - self.b) * pct,
            self.a + (other.a - self.a) * pct,
        )
    }

    /// `#RRGGBB` or `#RRGGBBAA`
    pub fn hex(raw: &str) -> Result<Color> {
        let digits = raw.strip_prefix('#').unwrap_or(raw);
        if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
            bail!("{} isn't a hex color", raw);
        }
        let component = |idx: usize| -> Result<usize> {
            Ok(usize::from_str_radix(&digits[idx..idx + 2], 16)?)
        };
        let a = if digits.len() == 8 {
            (component(6)? as f32) / 255.0
        } else {
            1.0
        };
        Ok(Color::rgba(component(0)?, component(2)?, component(4)?, a))
    }

    pub fn to_hex(self) -> String {
        let c = |x: f32| (x.clamp(0.0, 1.0) * 255.0).round() as usize;
        if self.a < 1.0 {
            format!(
                "#{:02X}{:02X}{:02X}{:02X}",
                c(self.r),
                c(self.g),
                c(self.b),
                c(self.a)
            )
        } else {
            format!("#{:02X}{:02X}{:02X}", c(self.r), c(self.g), c(self.b))
        }
    }

    /// Parses any of SUMO's color notations: `r,g,b[,a]` as 0-255 integers or 0-1 floats,
    /// `#RRGGBB[AA]`, or a color name.
    pub fn from_sumo(raw: &str) -> Result<Color> {
        let raw = raw.trim();
        if raw.starts_with('#') {
            return Color::hex(raw);
        }
        if raw.contains(',') {
            let parts: Vec<&str> = raw.split(',').map(|x| x.trim()).collect();
            if parts.len() != 3 && parts.len() != 4 {
                bail!("color {} needs 3 or 4 components", raw);
            }
            let as_floats = parts.iter().any(|x| x.contains('.'));
            let mut values = Vec::new();
            for part in &parts {
                let x = part.parse::<f64>()?;
                let x = if as_floats { x } else { x / 255.0 };
                if !(0.0..=1.0).contains(&x) {
                    bail!("color {} has a component out of range", raw);
                }
                values.push(x as f32);
            }
            let a = values.get(3).cloned().unwrap_or(1.0);
            return Ok(Color::rgba_f(values[0], values[1], values[2], a));
        }
        match raw.to_lowercase().as_str() {
            "red" => Ok(Color::RED),
            "green" => Ok(Color::GREEN),
            "blue" => Ok(Color::BLUE),
            "yellow" => Ok(Color::YELLOW),
            "cyan" => Ok(Color::CYAN),
            "magenta" => Ok(Color::MAGENTA),
            "orange" => Ok(Color::ORANGE),
            "white" => Ok(Color::WHITE),
            "black" => Ok(Color::BLACK),
            "grey" | "gray" => Ok(Color::GREY),
            "invisible" => Ok(Color::INVISIBLE),
            _ => bail!("unknown color {}", raw),
        }
    }

    fn from_colorous(c: colorous::Color) -> Color {
        Color::rgb(c.r as usize, c.g as usize, c.b as usize)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Color(r={}, g={}, b={}, a={})", self.r, self.g, self.b, self.a)
    }
}

impl TryFrom<String> for Color {
    type Error = anyhow::Error;

    fn try_from(x: String) -> Result<Color> {
        Color::from_sumo(&x)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> String {
        let a = (c.a.clamp(0.0, 1.0) * 255.0).round() as usize;
        format!("{}{:02X}", c.alpha(1.0).to_hex(), a)
    }
}

/// Maps a value in [0, 1], or a category index, to a color.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColorMap {
    Viridis,
    Plasma,
    Inferno,
    Magma,
    Turbo,
    /// Cyclic, so 0 and 1 get the same color. Good for headings.
    Sinebow,
    Tableau10,
    Category10,
    /// Linear interpolation between evenly spaced stops. Needs at least 2 colors.
    Scale(Vec<Color>),
}

impl ColorMap {
    /// `pct` is clamped to [0, 1].
    pub fn eval(&self, pct: f64) -> Color {
        let pct = if pct.is_finite() {
            pct.clamp(0.0, 1.0)
        } else {
            0.0
        };
        match self {
            ColorMap::Viridis => Color::from_colorous(colorous::VIRIDIS.eval_continuous(pct)),
            ColorMap::Plasma => Color::from_colorous(colorous::PLASMA.eval_continuous(pct)),
            ColorMap::Inferno => Color::from_colorous(colorous::INFERNO.eval_continuous(pct)),
            ColorMap::Magma => Color::from_colorous(colorous::MAGMA.eval_continuous(pct)),
            ColorMap::Turbo => Color::from_colorous(colorous::TURBO.eval_continuous(pct)),
            ColorMap::Sinebow => Color::from_colorous(colorous::SINEBOW.eval_continuous(pct)),
            ColorMap::Tableau10 | ColorMap::Category10 => {
                self.categorical((pct * 9.0).round() as usize)
            }
            ColorMap::Scale(stops) => {
                if stops.is_empty() {
                    return Color::BLACK;
                }
                if stops.len() == 1 {
                    return stops[0];
                }
                let (low, pct) = inner_eval(stops.len(), pct);
                stops[low].lerp(stops[low + 1], pct)
            }
        }
    }

    /// A distinct color per category index. Indices wrap around.
    pub fn categorical(&self, idx: usize) -> Color {
        match self {
            ColorMap::Tableau10 => Color::from_colorous(colorous::TABLEAU10[idx % 10]),
            ColorMap::Category10 => Color::from_colorous(colorous::CATEGORY10[idx % 10]),
            ColorMap::Scale(stops) => {
                if stops.is_empty() {
                    Color::BLACK
                } else {
                    stops[idx % stops.len()]
                }
            }
            _ => self.eval(((idx % 10) as f64) / 9.0),
        }
    }
}

// Which pair of stops does pct fall between, and how far between them?
fn inner_eval(num_stops: usize, pct: f64) -> (usize, f64) {
    let width = 1.0 / (num_stops - 1) as f64;
    let low = (pct / width).floor() as usize;
    if low >= num_stops - 1 {
        return (num_stops - 2, 1.0);
    }
    (low, (pct % width) / width)
}

/// Every color the renderer and exporter use. This is a plain value passed into render calls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorScheme {
    pub junction: Color,
    pub pedestrian: Color,
    pub bicycle: Color,
    pub ship: Color,
    pub authority: Color,
    pub none: Color,
    pub no_passenger: Color,
    pub other: Color,
    pub white_marking: Color,
    pub yellow_marking: Color,
    pub stop_line: Color,
    pub stop_area_sumo: Color,
    pub stop_area_usa: Color,
    pub stop_marking_ger: Color,
    pub stop_marking_uk: Color,
    pub stop_marking_usa: Color,
    pub default_poi: Color,
    pub default_poly: Color,
    pub trajectory: Color,
}

impl ColorScheme {
    /// The colors sumo-gui uses.
    pub fn sumo() -> ColorScheme {
        ColorScheme {
            junction: Color::rgb(0x66, 0x00, 0x00),
            pedestrian: Color::rgb(0x80, 0x80, 0x80),
            bicycle: Color::rgb(0xC0, 0x42, 0x2C),
            ship: Color::rgb(0x96, 0xC8, 0xC8),
            authority: Color::rgb(0xFF, 0x00, 0x00),
            none: Color::rgb(0xFF, 0xFF, 0xFF),
            no_passenger: Color::rgb(0x5C, 0x5C, 0x5C),
            other: Color::rgb(0x00, 0x00, 0x00),
            white_marking: Color::WHITE,
            yellow_marking: Color::YELLOW,
            stop_line: Color::WHITE,
            stop_area_sumo: Color::rgb(0x00, 0x88, 0x53),
            stop_area_usa: Color::rgb(0xC0, 0x42, 0x2C),
            stop_marking_ger: Color::WHITE,
            stop_marking_uk: Color::YELLOW,
            stop_marking_usa: Color::WHITE,
            default_poi: Color::RED,
            default_poly: Color::rgb(0x80, 0x80, 0x80),
            trajectory: Color::BLACK,
        }
    }

    pub fn lane(&self, kind: LaneKind) -> Color {
        match kind {
            LaneKind::Pedestrian => self.pedestrian,
            LaneKind::Bicycle => self.bicycle,
            LaneKind::Ship => self.ship,
            LaneKind::Authority => self.authority,
            LaneKind::None => self.none,
            LaneKind::NoPassenger => self.no_passenger,
            LaneKind::Other => self.other,
        }
    }

    /// Missing fields keep their SUMO defaults.
    pub fn load(path: &str) -> Result<ColorScheme> {
        netutil::read_json(path)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        netutil::write_json(path, self)
    }
}

impl Default for ColorScheme {
    fn default() -> ColorScheme {
        ColorScheme::sumo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sumo_notation() {
        assert_eq!(Color::from_sumo("255,0,0").unwrap(), Color::RED);
        assert_eq!(Color::from_sumo("1.0,0,0").unwrap(), Color::RED);
        assert_eq!(Color::from_sumo("red").unwrap(), Color::RED);
        assert_eq!(Color::from_sumo("#FF0000").unwrap(), Color::RED);
        assert_eq!(Color::from_sumo("0,0,0,0").unwrap().a, 0.0);
        assert!(Color::from_sumo("300,0,0").is_err());
        assert!(Color::from_sumo("chartreuse-ish").is_err());
        assert!(Color::from_sumo("1,2").is_err());
    }

    #[test]
    fn hex_roundtrip() {
        let c = Color::hex("#C0422C").unwrap();
        assert_eq!(c.to_hex(), "#C0422C");
        let s: String = c.alpha(0.0).into();
        assert_eq!(s, "#C0422C00");
    }

    #[test]
    fn scale() {
        let two = ColorMap::Scale(vec![Color::BLACK, Color::WHITE]);
        assert_eq!(two.eval(0.0), Color::BLACK);
        assert_eq!(two.eval(1.0), Color::WHITE);
        assert_eq!(two.eval(2.0), Color::WHITE);
        let three = ColorMap::Scale(vec![Color::BLACK, Color::RED, Color::WHITE]);
        assert_eq!(three.eval(0.5), Color::RED);
        assert_eq!(ColorMap::Tableau10.categorical(3), ColorMap::Tableau10.categorical(13));
    }

    #[test]
    fn partial_scheme() {
        let cs: ColorScheme = serde_json::from_str(r##"{"junction": "#000000"}"##).unwrap();
        assert_eq!(cs.junction, Color::BLACK);
        assert_eq!(cs.bicycle, ColorScheme::sumo().bicycle);
    }
}
