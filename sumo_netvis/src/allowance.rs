use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// See <https://sumo.dlr.de/docs/Definition_of_Vehicles,_Vehicle_Types,_and_Routes.html#abstract_vehicle_class>
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VehicleClass {
    Private,
    Emergency,
    Authority,
    Army,
    Vip,
    Pedestrian,
    Passenger,
    Hov,
    Taxi,
    Bus,
    Coach,
    Delivery,
    Truck,
    Trailer,
    Motorcycle,
    Moped,
    Bicycle,
    Evehicle,
    Tram,
    RailUrban,
    Rail,
    RailElectric,
    RailFast,
    Ship,
    Custom1,
    Custom2,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 26] = [
        VehicleClass::Private,
        VehicleClass::Emergency,
        VehicleClass::Authority,
        VehicleClass::Army,
        VehicleClass::Vip,
        VehicleClass::Pedestrian,
        VehicleClass::Passenger,
        VehicleClass::Hov,
        VehicleClass::Taxi,
        VehicleClass::Bus,
        VehicleClass::Coach,
        VehicleClass::Delivery,
        VehicleClass::Truck,
        VehicleClass::Trailer,
        VehicleClass::Motorcycle,
        VehicleClass::Moped,
        VehicleClass::Bicycle,
        VehicleClass::Evehicle,
        VehicleClass::Tram,
        VehicleClass::RailUrban,
        VehicleClass::Rail,
        VehicleClass::RailElectric,
        VehicleClass::RailFast,
        VehicleClass::Ship,
        VehicleClass::Custom1,
        VehicleClass::Custom2,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VehicleClass::Private => "private",
            VehicleClass::Emergency => "emergency",
            VehicleClass::Authority => "authority",
            VehicleClass::Army => "army",
            VehicleClass::Vip => "vip",
            VehicleClass::Pedestrian => "pedestrian",
            VehicleClass::Passenger => "passenger",
            VehicleClass::Hov => "hov",
            VehicleClass::Taxi => "taxi",
            VehicleClass::Bus => "bus",
            VehicleClass::Coach => "coach",
            VehicleClass::Delivery => "delivery",
            VehicleClass::Truck => "truck",
            VehicleClass::Trailer => "trailer",
            VehicleClass::Motorcycle => "motorcycle",
            VehicleClass::Moped => "moped",
            VehicleClass::Bicycle => "bicycle",
            VehicleClass::Evehicle => "evehicle",
            VehicleClass::Tram => "tram",
            VehicleClass::RailUrban => "rail_urban",
            VehicleClass::Rail => "rail",
            VehicleClass::RailElectric => "rail_electric",
            VehicleClass::RailFast => "rail_fast",
            VehicleClass::Ship => "ship",
            VehicleClass::Custom1 => "custom1",
            VehicleClass::Custom2 => "custom2",
        }
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl FromStr for VehicleClass {
    type Err = anyhow::Error;

    fn from_str(x: &str) -> anyhow::Result<VehicleClass> {
        for class in VehicleClass::ALL {
            if class.as_str() == x {
                return Ok(class);
            }
        }
        bail!("unknown vehicle class {}", x)
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which vehicle classes may use a lane. SUMO writes this as an `allow` or `disallow` list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowance {
    mask: u32,
}

impl Allowance {
    pub fn all() -> Allowance {
        Allowance {
            mask: VehicleClass::ALL.iter().fold(0, |mask, c| mask | c.bit()),
        }
    }

    pub fn none() -> Allowance {
        Allowance { mask: 0 }
    }

    /// Starts from `allow` (everything when empty or "all") and removes `disallow`. Class names
    /// this crate doesn't know about are ignored.
    pub fn parse(allow: Option<&str>, disallow: Option<&str>) -> Allowance {
        let mut result = match allow.map(|x| x.trim()) {
            None | Some("") | Some("all") => Allowance::all(),
            Some(list) => Allowance {
                mask: parse_list(list),
            },
        };
        match disallow.map(|x| x.trim()) {
            Some("all") => {
                result.mask = 0;
            }
            Some(list) => {
                result.mask &= !parse_list(list);
            }
            None => {}
        }
        result
    }

    pub fn allows(self, class: VehicleClass) -> bool {
        self.mask & class.bit() != 0
    }

    pub fn allows_all(self) -> bool {
        self == Allowance::all()
    }

    pub fn allows_none(self) -> bool {
        self.mask == 0
    }

    /// True if exactly this one class is allowed.
    pub fn is_only(self, class: VehicleClass) -> bool {
        self.mask == class.bit()
    }

    pub fn classes(self) -> Vec<VehicleClass> {
        VehicleClass::ALL
            .into_iter()
            .filter(|c| self.allows(*c))
            .collect()
    }
}

impl fmt::Display for Allowance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.allows_all() {
            return write!(f, "all");
        }
        let names: Vec<&str> = self.classes().into_iter().map(|c| c.as_str()).collect();
        write!(f, "{}", names.join(" "))
    }
}

fn parse_list(list: &str) -> u32 {
    let mut mask = 0;
    for name in list.split_whitespace() {
        match name.parse::<VehicleClass>() {
            Ok(class) => {
                mask |= class.bit();
            }
            Err(_) => {
                debug!("Ignoring unknown vehicle class {}", name);
            }
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_and_disallow() {
        let a = Allowance::parse(None, None);
        assert!(a.allows_all());

        let a = Allowance::parse(Some("pedestrian"), None);
        assert!(a.is_only(VehicleClass::Pedestrian));
        assert!(!a.allows(VehicleClass::Passenger));

        let a = Allowance::parse(None, Some("pedestrian bicycle"));
        assert!(a.allows(VehicleClass::Passenger));
        assert!(!a.allows(VehicleClass::Bicycle));

        let a = Allowance::parse(Some("all"), Some("all"));
        assert!(a.allows_none());

        // Unknown names are dropped
        let a = Allowance::parse(Some("bus hovercraft"), None);
        assert!(a.is_only(VehicleClass::Bus));
        assert_eq!(a.to_string(), "bus");
    }
}
