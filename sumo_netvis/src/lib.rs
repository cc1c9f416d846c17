//! Reads [SUMO](https://www.eclipse.org/sumo/) road networks, additional objects, floating car
//! data and edge-based mean data, and turns them into 2D drawing primitives or a Wavefront OBJ
//! mesh.
//!
//! Parsing is lenient per entity and strict about structure: a malformed `<net>` hierarchy fails
//! the whole load, while a single lane with bad geometry is skipped and reported through the
//! model's `diagnostics`.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

pub use self::additionals::{Additionals, LaneAnchor, Poi, Poly, PolyShape, Stop, StopKind};
pub use self::allowance::{Allowance, VehicleClass};
pub use self::colors::{Color, ColorMap, ColorScheme};
pub use self::error::ParseError;
pub use self::mean_data::{
    EdgeBasedMeasures, Interval, MeasureRow, MeasureTable, MeasureValue, Measures,
};
pub use self::net::{
    Connection, Edge, EdgeFunction, EdgeID, Junction, JunctionID, Lane, LaneID, LaneKind,
    Location, Network, ParseOptions, DEFAULT_LANE_WIDTH,
};
pub use self::obj::{MaterialMap, Object3D, ObjOptions, PatchOptions, TerrainOptions};
pub use self::render::{
    Category, CategoryStyle, Drawing, MarkingStyle, Primitive, PrimitiveID, Render,
    RenderOptions, Shape, SourceID, StopStyle,
};
pub use self::trajectory::{
    AngleUnit, Attribute, Lookup, Sample, TimeSteps, Trajectories, Trajectory,
};

mod additionals;
mod allowance;
mod colors;
mod error;
mod mean_data;
mod net;
pub mod obj;
mod render;
mod trajectory;
