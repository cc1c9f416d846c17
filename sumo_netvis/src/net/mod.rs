//! The network model: edges, lanes, junctions and connections from a `.net.xml` file, with lane
//! and junction polygons derived once at load time.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use geom::{Bounds, Distance, PolyLine, Polygon, Pt2D, Speed};

use crate::{Allowance, ParseError, VehicleClass};

mod junction;
mod parse;

pub(crate) use self::parse::{parse_f64, parse_shape};

/// What SUMO assumes when a lane has no `width`. Only applied when `ParseOptions` asks for it.
pub const DEFAULT_LANE_WIDTH: Distance = Distance::const_meters(3.2);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeID(pub String);

impl fmt::Display for EdgeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Edge {}", self.0)
    }
}

/// SUMO names lanes `{edge}_{index}`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LaneID(pub String);

impl fmt::Display for LaneID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Lane {}", self.0)
    }
}

impl LaneID {
    /// Splits off the edge and index. Edge IDs may themselves contain underscores.
    pub fn edge_and_index(&self) -> Option<(EdgeID, usize)> {
        let (edge, idx) = self.0.rsplit_once('_')?;
        Some((EdgeID(edge.to_string()), idx.parse::<usize>().ok()?))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JunctionID(pub String);

impl fmt::Display for JunctionID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Junction {}", self.0)
    }
}

/// How to read a network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Used for lanes without a `width` attribute. When None, those lanes are skipped with a
    /// geometry diagnostic.
    pub default_lane_width: Option<Distance>,
    /// Keep internal edges, the short lanes inside junctions.
    pub keep_internal: bool,
}

impl Default for ParseOptions {
    fn default() -> ParseOptions {
        ParseOptions {
            default_lane_width: None,
            keep_internal: true,
        }
    }
}

impl ParseOptions {
    /// Fill in missing lane widths the way SUMO itself does.
    pub fn sumo_defaults() -> ParseOptions {
        ParseOptions {
            default_lane_width: Some(DEFAULT_LANE_WIDTH),
            ..Default::default()
        }
    }
}

/// A SUMO [network](https://sumo.dlr.de/docs/Networks/SUMO_Road_Networks.html).
#[derive(Clone, Debug)]
pub struct Network {
    pub location: Location,
    pub edges: BTreeMap<EdgeID, Edge>,
    pub junctions: BTreeMap<JunctionID, Junction>,
    pub connections: Vec<Connection>,
    /// Entities skipped during parsing, and why.
    pub diagnostics: Vec<ParseError>,
}

/// The `<location>` element
#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    /// Added to the original projected coordinates to get network coordinates.
    pub net_offset: Pt2D,
    pub converted_boundary: Option<Bounds>,
    pub orig_boundary: Option<Bounds>,
    pub projection: String,
}

impl Default for Location {
    fn default() -> Location {
        Location {
            net_offset: Pt2D::zero(),
            converted_boundary: None,
            orig_boundary: None,
            projection: "!".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeFunction {
    Normal,
    Internal,
    Connector,
    Crossing,
    WalkingArea,
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub id: EdgeID,
    pub function: EdgeFunction,
    pub from: Option<JunctionID>,
    pub to: Option<JunctionID>,
    pub edge_type: Option<String>,
    pub name: Option<String>,
    pub priority: Option<isize>,
    /// Sorted by index. 0 is the rightmost lane. Lanes with bad geometry are missing, so the
    /// position in this list isn't necessarily the index.
    pub lanes: Vec<Lane>,
}

/// The color class a lane falls into, based on who may use it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LaneKind {
    Pedestrian,
    Bicycle,
    Ship,
    Authority,
    /// Nobody may use it
    None,
    NoPassenger,
    Other,
}

impl LaneKind {
    /// Also used as the default OBJ material name.
    pub fn name(self) -> &'static str {
        match self {
            LaneKind::Pedestrian => "pedestrian",
            LaneKind::Bicycle => "bicycle",
            LaneKind::Ship => "ship",
            LaneKind::Authority => "authority",
            LaneKind::None => "none",
            LaneKind::NoPassenger => "no_passenger",
            LaneKind::Other => "other",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Lane {
    pub id: LaneID,
    pub edge: EdgeID,
    /// 0 is the rightmost lane
    pub index: usize,
    pub speed: Speed,
    pub length: Distance,
    pub width: Distance,
    pub allow: Allowance,
    pub center_line: PolyLine,
    /// The lane's footprint, built from the center line and width.
    pub shape: Polygon,
    pub end_offset: Distance,
    pub acceleration: bool,
}

impl Lane {
    pub fn kind(&self) -> LaneKind {
        let allow = self.allow;
        if allow.is_only(VehicleClass::Pedestrian) {
            LaneKind::Pedestrian
        } else if allow.is_only(VehicleClass::Bicycle) {
            LaneKind::Bicycle
        } else if allow.is_only(VehicleClass::Ship) {
            LaneKind::Ship
        } else if allow.is_only(VehicleClass::Authority) {
            LaneKind::Authority
        } else if allow.allows_none() {
            LaneKind::None
        } else if !allow.allows(VehicleClass::Passenger) {
            LaneKind::NoPassenger
        } else {
            LaneKind::Other
        }
    }

    pub fn get_bounds(&self) -> Bounds {
        self.shape.get_bounds()
    }

    fn half_width(&self) -> Distance {
        self.width / 2.0
    }

    pub fn left_boundary(&self) -> anyhow::Result<PolyLine> {
        self.center_line.shift_left(self.half_width())
    }

    pub fn right_boundary(&self) -> anyhow::Result<PolyLine> {
        self.center_line.shift_right(self.half_width())
    }

    /// The left and right corners where the lane starts.
    pub fn start_corners(&self) -> Vec<Pt2D> {
        let l = self.center_line.first_line();
        vec![
            l.shift_left(self.half_width()).pt1(),
            l.shift_right(self.half_width()).pt1(),
        ]
    }

    /// The left and right corners where the lane ends.
    pub fn end_corners(&self) -> Vec<Pt2D> {
        let l = self.center_line.last_line();
        vec![
            l.shift_left(self.half_width()).pt2(),
            l.shift_right(self.half_width()).pt2(),
        ]
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.center_line = self.center_line.translate(dx, dy);
        self.shape = self.shape.translate(dx, dy);
    }
}

impl Edge {
    pub fn is_internal(&self) -> bool {
        self.function == EdgeFunction::Internal
    }

    pub fn get_lane(&self, index: usize) -> Option<&Lane> {
        self.lanes.iter().find(|l| l.index == index)
    }

    /// Lanes counted from the left, so the innermost lane is 0. Uses the highest index present,
    /// not the number of lanes that survived parsing.
    pub fn inverse_lane_index(&self, lane: &Lane) -> usize {
        let max_index = self.lanes.iter().map(|l| l.index).max().unwrap_or(0);
        max_index - lane.index
    }

    pub fn get_bounds(&self) -> Bounds {
        let mut b = Bounds::new();
        for lane in &self.lanes {
            b.union(lane.get_bounds());
        }
        b
    }
}

#[derive(Clone, Debug)]
pub struct Junction {
    pub id: JunctionID,
    pub junction_type: String,
    pub pt: Pt2D,
    pub incoming_lanes: Vec<LaneID>,
    pub internal_lanes: Vec<LaneID>,
    /// None when the shape couldn't be read or inferred.
    pub shape: Option<Polygon>,
    /// True when `shape` was guessed from the surrounding lanes instead of read from the file.
    /// The guess is a convex hull, so it won't match what SUMO draws for concave junctions.
    pub shape_inferred: bool,
}

impl Junction {
    /// Junctions where some approaches must stop or yield.
    pub fn is_controlled(&self) -> bool {
        matches!(
            self.junction_type.as_str(),
            "traffic_light"
                | "traffic_light_right_on_red"
                | "allway_stop"
                | "priority_stop"
                | "right_before_left"
                | "left_before_right"
        )
    }

    pub fn get_bounds(&self) -> Bounds {
        match self.shape {
            Some(ref p) => p.get_bounds(),
            None => Bounds::from(&[self.pt]),
        }
    }
}

/// See <https://sumo.dlr.de/docs/Networks/SUMO_Road_Networks.html#connections>
#[derive(Clone, Debug, PartialEq)]
pub struct Connection {
    pub from: EdgeID,
    pub to: EdgeID,
    pub from_lane: usize,
    pub to_lane: usize,
    pub via: Option<LaneID>,
    pub dir: Option<String>,
    pub state: Option<String>,
}

impl Network {
    pub fn get_edge(&self, id: &EdgeID) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn get_lane(&self, id: &LaneID) -> Option<&Lane> {
        let (edge, index) = id.edge_and_index()?;
        self.edges
            .get(&edge)?
            .lanes
            .iter()
            .find(|l| l.index == index && &l.id == id)
    }

    pub fn get_junction(&self, id: &JunctionID) -> Option<&Junction> {
        self.junctions.get(id)
    }

    /// Every lane, in edge order and then by index.
    pub fn lanes(&self) -> impl Iterator<Item = &Lane> {
        self.edges.values().flat_map(|e| e.lanes.iter())
    }

    pub fn normal_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(|e| !e.is_internal())
    }

    pub fn connections_from<'a>(&'a self, edge: &'a EdgeID) -> impl Iterator<Item = &'a Connection> {
        self.connections.iter().filter(move |c| &c.from == edge)
    }

    pub fn connections_to<'a>(&'a self, edge: &'a EdgeID) -> impl Iterator<Item = &'a Connection> {
        self.connections.iter().filter(move |c| &c.to == edge)
    }

    /// The bounds of every lane and junction polygon. Empty for a network with no geometry.
    pub fn extents(&self) -> Bounds {
        let mut b = Bounds::new();
        for lane in self.lanes() {
            b.union(lane.get_bounds());
        }
        for j in self.junctions.values() {
            if let Some(ref p) = j.shape {
                b.union(p.get_bounds());
            }
        }
        b
    }

    /// A copy with every coordinate shifted by the same amount.
    pub fn translated(&self, dx: f64, dy: f64) -> Network {
        let mut net = self.clone();
        for edge in net.edges.values_mut() {
            for lane in &mut edge.lanes {
                lane.translate(dx, dy);
            }
        }
        for j in net.junctions.values_mut() {
            j.pt = j.pt.offset(dx, dy);
            j.shape = j.shape.take().map(|p| p.translate(dx, dy));
        }
        net.location.net_offset = net.location.net_offset.offset(dx, dy);
        net.location.converted_boundary = net
            .location
            .converted_boundary
            .map(|b| b.translate(dx, dy));
        net
    }

    /// A copy in the original projected coordinates, undoing SUMO's `netOffset`.
    pub fn without_net_offset(&self) -> Network {
        let offset = self.location.net_offset;
        self.translated(-offset.x(), -offset.y())
    }
}
