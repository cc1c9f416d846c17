use geom::{Distance, PolyLine, Polygon};

use crate::render::MarkingStyle;
use crate::{Color, ColorScheme, Edge, Lane, Network, VehicleClass};

const STRIPE_WIDTH: Distance = Distance::const_meters(0.1);
const STOP_LINE_WIDTH: Distance = Distance::const_meters(0.5);

/// Markings only come in two paints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum MarkingColor {
    White,
    Yellow,
}

impl MarkingColor {
    pub fn color(self, cs: &ColorScheme) -> Color {
        match self {
            MarkingColor::White => cs.white_marking,
            MarkingColor::Yellow => cs.yellow_marking,
        }
    }

    /// Default OBJ material name
    pub fn material(self) -> &'static str {
        match self {
            MarkingColor::White => "white_markings",
            MarkingColor::Yellow => "yellow_markings",
        }
    }
}

/// Lines painted along one lane.
pub(crate) struct LaneMarking {
    pub color: MarkingColor,
    pub polygons: Vec<Polygon>,
}

/// Guesses the markings on a lane from its position in the edge. Only lanes that passenger cars
/// may use on regular edges are marked. Every such lane has a line on its left side: solid for
/// the innermost lane and dashed between lanes. The rightmost lane also gets a solid line on its
/// right side.
pub(crate) fn lane_markings(
    edge: &Edge,
    lane: &Lane,
    style: MarkingStyle,
    stripe_width_scale: f64,
) -> Vec<LaneMarking> {
    let mut markings = Vec::new();
    if edge.is_internal() || !lane.allow.allows(VehicleClass::Passenger) {
        return markings;
    }
    let width = STRIPE_WIDTH * stripe_width_scale;

    if let Ok(left) = lane.left_boundary() {
        if edge.inverse_lane_index(lane) == 0 {
            let color = match style {
                MarkingStyle::Usa => MarkingColor::Yellow,
                MarkingStyle::Eur => MarkingColor::White,
            };
            markings.push(LaneMarking {
                color,
                polygons: solid(&left, width),
            });
        } else {
            let (dash, gap) = style.dashes();
            markings.push(LaneMarking {
                color: MarkingColor::White,
                polygons: left.dashed_lines(width, dash, gap),
            });
        }
    }

    if lane.index == 0 {
        if let Ok(right) = lane.right_boundary() {
            markings.push(LaneMarking {
                color: MarkingColor::White,
                polygons: solid(&right, width),
            });
        }
    }

    markings.retain(|m| !m.polygons.is_empty());
    markings
}

fn solid(pl: &PolyLine, width: Distance) -> Vec<Polygon> {
    pl.make_polygons(width).into_iter().collect()
}

/// A bar across the end of the lane, if traffic on it has to stop or yield there. Pedestrian
/// lanes, internal edges, and lanes shorter than the bar don't get one.
pub(crate) fn stop_line(
    net: &Network,
    edge: &Edge,
    lane: &Lane,
    stripe_width_scale: f64,
) -> Option<Polygon> {
    if edge.is_internal() || lane.allow.is_only(VehicleClass::Pedestrian) {
        return None;
    }
    let junction = net.get_junction(edge.to.as_ref()?)?;
    if !junction.is_controlled() {
        return None;
    }

    let thickness = STOP_LINE_WIDTH * stripe_width_scale;
    let len = lane.center_line.length();
    if thickness >= len {
        return None;
    }
    lane.center_line
        .exact_slice(len - thickness, len)
        .and_then(|pl| pl.make_polygons(lane.width))
        .ok()
}
