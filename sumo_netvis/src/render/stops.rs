use anyhow::Result;

use geom::{Distance, Line, PolyLine, Polygon, Pt2D};

use crate::render::{MarkingColor, StopStyle};
use crate::{Color, ColorScheme, Stop};

/// The filled area and painted lines for one stop. Either can be empty, depending on the style.
pub(crate) struct StopGeometry {
    pub area: Option<Polygon>,
    pub markings: Vec<Polygon>,
}

impl StopStyle {
    /// The area color, for styles that fill one in.
    pub(crate) fn area_color(self, cs: &ColorScheme) -> Color {
        match self {
            StopStyle::Usa => cs.stop_area_usa,
            _ => cs.stop_area_sumo,
        }
    }

    pub(crate) fn marking_color(self, cs: &ColorScheme) -> Color {
        match self {
            StopStyle::Uk => cs.stop_marking_uk,
            StopStyle::Usa => cs.stop_marking_usa,
            _ => cs.stop_marking_ger,
        }
    }

    /// Added to the stop area z-order. The SUMO band is drawn over the lane markings, the other
    /// styles under them.
    pub(crate) fn area_zorder_offset(self) -> f64 {
        match self {
            StopStyle::Sumo => 16.0,
            _ => 0.0,
        }
    }

    /// Which paint the markings would use on a real street.
    pub(crate) fn marking_paint(self) -> MarkingColor {
        match self {
            StopStyle::Uk => MarkingColor::Yellow,
            _ => MarkingColor::White,
        }
    }
}

/// Pieces that can't be built, usually because the stop is too short, are left out.
pub(crate) fn stop_geometry(stop: &Stop, style: StopStyle) -> StopGeometry {
    match style {
        StopStyle::Sumo => StopGeometry {
            // A 2m band centered on the curb
            area: stop
                .curb_line()
                .and_then(|curb| curb.make_polygons(Distance::meters(2.0)))
                .ok(),
            markings: Vec::new(),
        },
        StopStyle::Ger => StopGeometry {
            area: None,
            markings: zig_zag(stop).into_iter().collect(),
        },
        StopStyle::Uk => StopGeometry {
            area: None,
            markings: uk_box(stop),
        },
        StopStyle::Usa => {
            let area = stop.footprint().ok();
            let markings = area
                .as_ref()
                .and_then(|p| p.exterior().to_outline(Distance::meters(0.1)).ok())
                .into_iter()
                .collect();
            StopGeometry { area, markings }
        }
    }
}

/// A white zig-zag between the curb and a line 1.5m into the lane.
fn zig_zag(stop: &Stop) -> Result<Polygon> {
    let area_width = 1.5;
    let line_width = Distance::meters(0.12);

    let curb = stop.curb_line()?;
    let inner = stop
        .center_line
        .shift_right(stop.lane_width / 2.0 - Distance::meters(area_width))?;

    // An odd number of samples, so the pattern ends on the inner line
    let mut num_zags = (stop.center_line.length().inner_meters() / area_width / 2.0).round() as usize;
    if num_zags % 2 == 0 {
        num_zags += 1;
    }

    let mut pts = vec![curb.first_pt(), inner.first_pt()];
    for i in 1..num_zags {
        let pct = (i as f64) / ((num_zags - 1) as f64);
        if i % 2 == 0 {
            pts.push(pct_along(&inner, pct)?);
        } else {
            pts.push(pct_along(&curb, pct)?);
        }
    }
    pts.push(curb.last_pt());
    PolyLine::deduping_new(pts)?.make_polygons(line_width)
}

fn pct_along(pl: &PolyLine, pct: f64) -> Result<Pt2D> {
    Ok(pl.dist_along(pl.length() * pct)?.0)
}

/// A yellow box inset from the lane edges: a heavy solid line along the curb and light dashes on
/// the other three sides.
fn uk_box(stop: &Stop) -> Vec<Polygon> {
    let inset = Distance::meters(0.2);
    let heavy = Distance::meters(0.3);
    let light = Distance::meters(0.1);
    let (dash, gap) = (Distance::meters(1.0), Distance::meters(0.5));
    let half_width = stop.lane_width / 2.0;

    let mut result = Vec::new();
    let (curb, inner) = match (
        stop.center_line
            .shift_right(half_width - inset - heavy / 2.0),
        stop.center_line
            .shift_left(half_width - inset - light / 2.0),
    ) {
        (Ok(c), Ok(i)) => (c, i),
        _ => return result,
    };

    for (pt1, pt2) in [
        (curb.first_pt(), inner.first_pt()),
        (curb.last_pt(), inner.last_pt()),
    ] {
        if let Ok(l) = Line::new(pt1, pt2) {
            result.extend(l.to_polyline().dashed_lines(light, dash, gap));
        }
    }
    result.extend(inner.dashed_lines(light, dash, gap));

    let len = curb.length();
    if let Ok(heavy_line) = curb
        .exact_slice(light * 2.0, len - light * 2.0)
        .and_then(|pl| pl.shift_right(heavy / 2.0))
        .and_then(|pl| pl.make_polygons(heavy))
    {
        result.push(heavy_line);
    }
    result
}
