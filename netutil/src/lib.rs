//! Small utilities shared by the network tools: a hierarchical `Timer` that reports through the
//! `log` crate, and JSON/file IO helpers.

mod io;
mod time;

pub use crate::io::{read_json, slurp_file, write_json};
pub use crate::time::{elapsed_seconds, prettyprint_time, prettyprint_usize, Timer};

const PROGRESS_FREQUENCY_SECONDS: f64 = 0.2;
