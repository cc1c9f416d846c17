//! Polygons, POIs and stops from a SUMO
//! [additional file](https://sumo.dlr.de/docs/Simulation/Shapes.html).

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use geom::{Distance, PolyLine, Polygon, Pt2D, Ring};
use netutil::{prettyprint_usize, slurp_file, Timer};

use crate::net::{parse_f64, parse_shape};
use crate::{Color, Lane, LaneID, Network, ParseError};

pub struct Additionals {
    pub polys: BTreeMap<String, Poly>,
    pub pois: BTreeMap<String, Poi>,
    /// Bus, train and container stops, and charging stations
    pub stops: BTreeMap<String, Stop>,
    /// Objects skipped during parsing, and why.
    pub diagnostics: Vec<ParseError>,
    /// Copied from the reference network, so rendering can undo it. Zero without one.
    pub net_offset: Pt2D,
}

#[derive(Clone, Debug)]
pub enum PolyShape {
    Filled(Polygon),
    /// Unfilled polygons are drawn as their outline, `line_width` thick.
    Outline(PolyLine),
}

#[derive(Clone, Debug)]
pub struct Poly {
    pub id: String,
    pub shape: PolyShape,
    pub color: Option<Color>,
    pub layer: f64,
    pub poly_type: String,
    pub line_width: Distance,
    pub angle: f64,
    pub params: BTreeMap<String, String>,
}

impl Poly {
    pub fn is_filled(&self) -> bool {
        matches!(self.shape, PolyShape::Filled(_))
    }
}

/// Where a lane-anchored object was declared to be.
#[derive(Clone, Debug, PartialEq)]
pub struct LaneAnchor {
    pub lane: LaneID,
    pub pos: Distance,
    /// Positive is to the left of the lane's direction.
    pub lateral: Distance,
}

#[derive(Clone, Debug)]
pub struct Poi {
    pub id: String,
    /// None for POIs placed by lat/lon, which aren't supported.
    pub pos: Option<Pt2D>,
    pub anchor: Option<LaneAnchor>,
    pub color: Option<Color>,
    pub poi_type: String,
    pub layer: f64,
    pub width: Distance,
    pub height: Distance,
    pub angle: f64,
    pub params: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum StopKind {
    Bus,
    Train,
    Container,
    Charging,
}

impl StopKind {
    fn from_tag(tag: &str) -> Option<StopKind> {
        match tag {
            "busStop" => Some(StopKind::Bus),
            "trainStop" => Some(StopKind::Train),
            "containerStop" => Some(StopKind::Container),
            "chargingStation" => Some(StopKind::Charging),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            StopKind::Bus => "busStop",
            StopKind::Train => "trainStop",
            StopKind::Container => "containerStop",
            StopKind::Charging => "chargingStation",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Stop {
    pub id: String,
    pub kind: StopKind,
    pub lane: LaneID,
    pub start_pos: Distance,
    pub end_pos: Distance,
    pub friendly_pos: bool,
    pub name: String,
    pub lines: Vec<String>,
    /// The stretch of the lane's center line between `start_pos` and `end_pos`
    pub center_line: PolyLine,
    pub lane_width: Distance,
    pub params: BTreeMap<String, String>,
}

impl Stop {
    /// The edge of the lane on the curb side.
    pub fn curb_line(&self) -> Result<PolyLine> {
        self.center_line.shift_right(self.lane_width / 2.0)
    }

    /// The lane slice the stop occupies.
    pub fn footprint(&self) -> Result<Polygon> {
        self.center_line.make_polygons(self.lane_width)
    }
}

impl Additionals {
    pub fn load(path: &str, reference_net: Option<&Network>, timer: &mut Timer) -> Result<Additionals> {
        timer.start(format!("read {}", path));
        let bytes = slurp_file(path)?;
        let raw_string = std::str::from_utf8(&bytes).with_context(|| format!("reading {}", path))?;
        timer.stop(format!("read {}", path));
        Additionals::parse(raw_string, reference_net, timer)
    }

    /// Objects anchored to a lane need `reference_net`; without it, they're skipped with a
    /// `ParseError::Resolution` diagnostic.
    pub fn parse(xml: &str, reference_net: Option<&Network>, timer: &mut Timer) -> Result<Additionals> {
        timer.start("parse additionals");
        let result = parse_additionals(xml, reference_net, timer);
        timer.stop("parse additionals");
        result
    }

    pub fn is_empty(&self) -> bool {
        self.polys.is_empty() && self.pois.is_empty() && self.stops.is_empty()
    }
}

fn structural<S: Into<String>>(msg: S) -> anyhow::Error {
    ParseError::Structural(msg.into()).into()
}

fn parse_additionals(
    xml: &str,
    reference_net: Option<&Network>,
    timer: &mut Timer,
) -> Result<Additionals> {
    let tree = roxmltree::Document::parse(xml)
        .map_err(|err| structural(format!("invalid XML: {}", err)))?;
    let root = tree.root_element();
    if !matches!(root.tag_name().name(), "additional" | "additionals") {
        return Err(structural(format!(
            "root element is <{}>, not <additional>",
            root.tag_name().name()
        )));
    }

    let mut additionals = Additionals {
        polys: BTreeMap::new(),
        pois: BTreeMap::new(),
        stops: BTreeMap::new(),
        diagnostics: Vec::new(),
        net_offset: reference_net
            .map(|net| net.location.net_offset)
            .unwrap_or_else(Pt2D::zero),
    };
    for obj in root.children().filter(|n| n.is_element()) {
        let tag = obj.tag_name().name();
        if !matches!(tag, "poly" | "poi") && StopKind::from_tag(tag).is_none() {
            // vTypes, routes, detectors, ...
            continue;
        }
        let id = obj
            .attribute("id")
            .ok_or_else(|| structural(format!("<{}> without an id", tag)))?
            .to_string();
        if additionals.polys.contains_key(&id)
            || additionals.pois.contains_key(&id)
            || additionals.stops.contains_key(&id)
        {
            return Err(structural(format!("duplicate object {}", id)));
        }

        let result = match tag {
            "poly" => parse_poly(obj, id, timer).map(|p| {
                additionals.polys.insert(p.id.clone(), p);
            }),
            "poi" => parse_poi(obj, id, reference_net, timer).map(|p| {
                additionals.pois.insert(p.id.clone(), p);
            }),
            _ => match StopKind::from_tag(tag) {
                Some(kind) => parse_stop(obj, id, kind, reference_net).map(|s| {
                    additionals.stops.insert(s.id.clone(), s);
                }),
                None => Ok(()),
            },
        };
        if let Err(diag) = result {
            timer.warn(diag.to_string());
            additionals.diagnostics.push(diag);
        }
    }

    timer.note(format!(
        "{} polygons, {} POIs, {} stops, {} skipped",
        prettyprint_usize(additionals.polys.len()),
        prettyprint_usize(additionals.pois.len()),
        prettyprint_usize(additionals.stops.len()),
        prettyprint_usize(additionals.diagnostics.len())
    ));
    Ok(additionals)
}

fn parse_params(obj: roxmltree::Node) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    for child in obj
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "param")
    {
        if let (Some(key), Some(value)) = (child.attribute("key"), child.attribute("value")) {
            params.insert(key.to_string(), value.to_string());
        }
    }
    params
}

fn parse_bool(raw: Option<&str>) -> bool {
    matches!(raw, Some("1") | Some("t") | Some("true"))
}

// Optional numbers fall back to the default with a warning.
fn optional_f64(obj: roxmltree::Node, id: &str, key: &str, default: f64, timer: &mut Timer) -> f64 {
    match obj.attribute(key) {
        Some(raw) => match parse_f64(raw) {
            Ok(x) => x,
            Err(err) => {
                timer.warn(format!("{} has a bad {}, using {}: {}", id, key, default, err));
                default
            }
        },
        None => default,
    }
}

fn parse_color(obj: roxmltree::Node, id: &str, timer: &mut Timer) -> Option<Color> {
    let raw = obj.attribute("color")?;
    match Color::from_sumo(raw) {
        Ok(c) => Some(c),
        Err(err) => {
            timer.warn(format!("{} has a bad color, using the default: {}", id, err));
            None
        }
    }
}

fn parse_poly(obj: roxmltree::Node, id: String, timer: &mut Timer) -> Result<Poly, ParseError> {
    let fail = |reason: String| ParseError::geometry(id.clone(), reason);

    if parse_bool(obj.attribute("geo")) {
        timer.warn(format!(
            "polygon {} uses geographic coordinates, which aren't supported",
            id
        ));
    }
    if obj.attribute("imgFile").is_some() {
        timer.warn(format!("polygon {} has an image, which won't be drawn", id));
    }

    let raw_shape = obj
        .attribute("shape")
        .ok_or_else(|| fail("missing shape".to_string()))?;
    let pts = parse_shape(raw_shape).map_err(|err| fail(format!("bad shape: {}", err)))?;
    let shape = if parse_bool(obj.attribute("fill")) {
        let ring = Ring::deduping_new(pts).map_err(|err| fail(format!("bad shape: {}", err)))?;
        PolyShape::Filled(
            Polygon::from_ring(ring).map_err(|err| fail(format!("bad shape: {}", err)))?,
        )
    } else {
        PolyShape::Outline(
            PolyLine::deduping_new(pts).map_err(|err| fail(format!("bad shape: {}", err)))?,
        )
    };

    Ok(Poly {
        shape,
        color: parse_color(obj, &id, timer),
        layer: optional_f64(obj, &id, "layer", 0.0, timer),
        poly_type: obj.attribute("type").unwrap_or("").to_string(),
        line_width: Distance::meters(optional_f64(obj, &id, "lineWidth", 1.0, timer)),
        angle: optional_f64(obj, &id, "angle", 0.0, timer),
        params: parse_params(obj),
        id,
    })
}

fn parse_poi(
    obj: roxmltree::Node,
    id: String,
    reference_net: Option<&Network>,
    timer: &mut Timer,
) -> Result<Poi, ParseError> {
    if obj.attribute("imgFile").is_some() {
        timer.warn(format!("POI {} has an image, which won't be drawn", id));
    }

    let number = |key: &str| -> Result<f64, ParseError> {
        let raw = obj
            .attribute(key)
            .ok_or_else(|| ParseError::geometry(id.clone(), format!("missing {}", key)))?;
        parse_f64(raw).map_err(|err| ParseError::geometry(id.clone(), format!("bad {}: {}", key, err)))
    };

    let (pos, anchor) = if obj.attribute("x").is_some() && obj.attribute("y").is_some() {
        (Some(Pt2D::new(number("x")?, number("y")?)), None)
    } else if let (Some(lane), Some(_)) = (obj.attribute("lane"), obj.attribute("pos")) {
        let anchor = LaneAnchor {
            lane: LaneID(lane.to_string()),
            pos: Distance::meters(number("pos")?),
            lateral: match obj.attribute("posLat") {
                Some(_) => Distance::meters(number("posLat")?),
                None => Distance::ZERO,
            },
        };
        let lane = resolve_lane(reference_net, &id, &anchor.lane)?;
        let pt = resolve_point(lane, anchor.pos, anchor.lateral)
            .map_err(|err| ParseError::resolution(id.clone(), err.to_string()))?;
        (Some(pt), Some(anchor))
    } else if obj.attribute("lat").is_some() && obj.attribute("lon").is_some() {
        timer.warn(format!(
            "POI {} is placed by lat/lon, which isn't supported; it has no position",
            id
        ));
        (None, None)
    } else {
        return Err(ParseError::geometry(id, "no x/y, lane/pos, or lat/lon"));
    };

    Ok(Poi {
        pos,
        anchor,
        color: parse_color(obj, &id, timer),
        poi_type: obj.attribute("type").unwrap_or("").to_string(),
        layer: optional_f64(obj, &id, "layer", 0.0, timer),
        width: Distance::meters(optional_f64(obj, &id, "width", 0.0, timer)),
        height: Distance::meters(optional_f64(obj, &id, "height", 0.0, timer)),
        angle: optional_f64(obj, &id, "angle", 0.0, timer),
        params: parse_params(obj),
        id,
    })
}

fn parse_stop(
    obj: roxmltree::Node,
    id: String,
    kind: StopKind,
    reference_net: Option<&Network>,
) -> Result<Stop, ParseError> {
    let lane_id = LaneID(
        obj.attribute("lane")
            .ok_or_else(|| ParseError::resolution(id.clone(), "no lane"))?
            .to_string(),
    );
    let lane = resolve_lane(reference_net, &id, &lane_id)?;
    let length = lane.center_line.length();
    let friendly_pos = parse_bool(obj.attribute("friendlyPos"));

    let position = |key: &str, default: Distance| -> Result<Distance, ParseError> {
        match obj.attribute(key) {
            Some(raw) => {
                let x = parse_f64(raw).map_err(|err| {
                    ParseError::geometry(id.clone(), format!("bad {}: {}", key, err))
                })?;
                Ok(from_lane_end(Distance::meters(x), length))
            }
            None => Ok(default),
        }
    };
    let mut start_pos = position("startPos", Distance::ZERO)?;
    let mut end_pos = position("endPos", length)?;
    if friendly_pos {
        start_pos = start_pos.max(Distance::ZERO).min(length);
        end_pos = end_pos.max(Distance::ZERO).min(length);
    }
    if start_pos < Distance::ZERO || end_pos > length + geom::EPSILON_DIST || start_pos >= end_pos {
        return Err(ParseError::resolution(
            id,
            format!(
                "[{}, {}] doesn't fit on {}, which is {} long",
                start_pos, end_pos, lane_id, length
            ),
        ));
    }
    let center_line = lane
        .center_line
        .exact_slice(start_pos, end_pos.min(length))
        .map_err(|err| ParseError::resolution(id.clone(), err.to_string()))?;

    Ok(Stop {
        kind,
        start_pos,
        end_pos,
        friendly_pos,
        name: obj.attribute("name").unwrap_or("").to_string(),
        lines: obj
            .attribute("lines")
            .map(|raw| raw.split_whitespace().map(|x| x.to_string()).collect())
            .unwrap_or_default(),
        center_line,
        lane_width: lane.width,
        params: parse_params(obj),
        lane: lane_id,
        id,
    })
}

fn resolve_lane<'a>(
    reference_net: Option<&'a Network>,
    id: &str,
    lane: &LaneID,
) -> Result<&'a Lane, ParseError> {
    let net = reference_net.ok_or_else(|| {
        ParseError::resolution(id, format!("anchored to {}, but there's no network", lane))
    })?;
    net.get_lane(lane)
        .ok_or_else(|| ParseError::resolution(id, format!("{} isn't in the network", lane)))
}

// SUMO counts negative positions back from the end of the lane.
fn from_lane_end(pos: Distance, length: Distance) -> Distance {
    if pos < Distance::ZERO {
        length + pos
    } else {
        pos
    }
}

/// The point `pos` along the lane, shifted `lateral` to the left.
fn resolve_point(lane: &Lane, pos: Distance, lateral: Distance) -> Result<Pt2D> {
    let dist = from_lane_end(pos, lane.center_line.length());
    let (pt, angle) = lane.center_line.dist_along(dist)?;
    if lateral == Distance::ZERO {
        return Ok(pt);
    }
    Ok(pt.project_away(lateral, angle.rotate_degs(90.0)))
}
