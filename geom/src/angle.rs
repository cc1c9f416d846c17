use std::fmt;

use serde::{Deserialize, Serialize};

/// An angle, stored in radians. Counter-clockwise from east, matching a y-up frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Angle(f64);

impl Angle {
    pub const ZERO: Angle = Angle(0.0);

    pub(crate) fn new(rads: f64) -> Angle {
        // Retain more precision for angles than the trimmed coordinates.
        Angle(rads)
    }

    pub fn radians(rads: f64) -> Angle {
        Angle(rads)
    }

    pub fn degrees(degs: f64) -> Angle {
        Angle::new(degs.to_radians())
    }

    /// SUMO reports headings like a compass: 0 is north and degrees grow clockwise.
    pub fn from_navigational_degrees(degs: f64) -> Angle {
        Angle::degrees(90.0 - degs)
    }

    pub fn to_navigational_degrees(self) -> f64 {
        (90.0 - self.normalized_degrees()).rem_euclid(360.0)
    }

    pub fn rotate_degs(self, degrees: f64) -> Angle {
        Angle(self.0 + degrees.to_radians())
    }

    /// In [0, 2pi)
    pub fn normalized_radians(self) -> f64 {
        self.0.rem_euclid(2.0 * std::f64::consts::PI)
    }

    /// In [0, 360)
    pub fn normalized_degrees(self) -> f64 {
        self.normalized_radians().to_degrees()
    }

    /// The signed rotation in degrees, in (-180, 180], needed to turn from this angle to the other.
    /// Positive means counter-clockwise.
    pub fn shortest_rotation_towards(self, other: Angle) -> f64 {
        let diff = (other.normalized_degrees() - self.normalized_degrees()).rem_euclid(360.0);
        if diff > 180.0 {
            diff - 360.0
        } else {
            diff
        }
    }

    pub fn approx_eq(self, other: Angle, within_degrees: f64) -> bool {
        self.shortest_rotation_towards(other).abs() < within_degrees
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Angle({} degrees)", self.normalized_degrees())
    }
}
