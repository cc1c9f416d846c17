use std::{cmp, ops};

use serde::{Deserialize, Serialize};

use crate::{trim_f64, Duration};

/// In seconds since the simulation began. SUMO allows a negative begin time, so this can be
/// negative too.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Time(f64);

// By construction, Time is a finite f64 with trimmed precision.
impl Eq for Time {}

#[allow(clippy::derive_ord_xor_partial_ord)] // false positive
impl Ord for Time {
    fn cmp(&self, other: &Time) -> cmp::Ordering {
        self.partial_cmp(other).unwrap()
    }
}

impl Time {
    pub const START: Time = Time(0.0);

    pub fn seconds(value: f64) -> Time {
        if !value.is_finite() {
            panic!("Bad Time {}", value);
        }

        Time(trim_f64(value))
    }

    pub fn inner_seconds(self) -> f64 {
        self.0
    }

    /// Where this time falls between two others, as a fraction. Returns 0 when the range is empty.
    pub fn percent_between(self, start: Time, end: Time) -> f64 {
        let range = end - start;
        if range <= Duration::ZERO {
            return 0.0;
        }
        (self - start) / range
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl ops::Add<Duration> for Time {
    type Output = Time;

    fn add(self, other: Duration) -> Time {
        Time::seconds(self.0 + other.inner_seconds())
    }
}

impl ops::AddAssign<Duration> for Time {
    fn add_assign(&mut self, other: Duration) {
        *self = *self + other;
    }
}

impl ops::Sub<Duration> for Time {
    type Output = Time;

    fn sub(self, other: Duration) -> Time {
        Time::seconds(self.0 - other.inner_seconds())
    }
}

impl ops::Sub for Time {
    type Output = Duration;

    fn sub(self, other: Time) -> Duration {
        Duration::seconds(self.0 - other.0)
    }
}
