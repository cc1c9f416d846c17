#![allow(dead_code)]

use netutil::Timer;
use sumo_netvis::{Network, ParseOptions};

/// Two straight 2-lane edges, 100m each, joined by a traffic light whose shape isn't given. The
/// network is offset by (10, 20).
pub const NET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<net version="1.9" junctionCornerDetail="5" limitTurnSpeed="5.50">
    <location netOffset="10.00,20.00" convBoundary="0.00,0.00,212.00,0.00" origBoundary="-10.00,-20.00,202.00,-20.00" projParameter="!"/>

    <edge id=":J1_0" function="internal">
        <lane id=":J1_0_0" index="0" speed="13.89" length="10.00" width="3.50" shape="100.00,-1.75 110.00,-1.75"/>
    </edge>

    <edge id="in" from="J0" to="J1" priority="1">
        <lane id="in_0" index="0" speed="13.89" length="100.00" width="3.50" shape="0.00,-1.75 100.00,-1.75"/>
        <lane id="in_1" index="1" speed="13.89" length="100.00" width="3.50" shape="0.00,1.75 100.00,1.75"/>
    </edge>
    <edge id="out" from="J1" to="J2" priority="1">
        <lane id="out_0" index="0" speed="13.89" length="100.00" width="3.50" shape="110.00,-1.75 210.00,-1.75"/>
        <lane id="out_1" index="1" speed="13.89" length="100.00" width="3.50" shape="110.00,1.75 210.00,1.75"/>
    </edge>

    <tlLogic id="J1" type="static" programID="0" offset="0">
        <phase duration="42" state="GG"/>
    </tlLogic>

    <junction id="J0" type="dead_end" x="0.00" y="0.00" incLanes="" intLanes=""/>
    <junction id="J1" type="traffic_light" x="105.00" y="0.00" incLanes="in_0 in_1" intLanes=":J1_0_0"/>
    <junction id="J2" type="dead_end" x="211.00" y="0.00" incLanes="out_0 out_1" intLanes="" shape="210.00,3.50 210.00,-3.50 212.00,-3.50 212.00,3.50"/>

    <connection from="in" to="out" fromLane="0" toLane="0" via=":J1_0_0" dir="s" state="O"/>
    <connection from=":J1_0" to="out" fromLane="0" toLane="0" dir="s" state="M"/>
</net>
"#;

pub fn load_net() -> Network {
    Network::parse(NET, &ParseOptions::default(), &mut Timer::throwaway()).unwrap()
}

pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() <= epsilon
}
