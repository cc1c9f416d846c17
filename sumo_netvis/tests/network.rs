mod common;

use geom::{Distance, Polygon};
use netutil::Timer;
use sumo_netvis::{
    EdgeFunction, EdgeID, JunctionID, LaneID, LaneKind, Network, ParseError, ParseOptions,
};

use common::{approx_eq, load_net, NET};

#[test]
fn two_lane_edge() {
    let net = load_net();
    assert!(net.diagnostics.is_empty());

    let edge = net.get_edge(&EdgeID("in".to_string())).unwrap();
    assert_eq!(edge.function, EdgeFunction::Normal);
    assert_eq!(edge.lanes.len(), 2);
    for lane in &edge.lanes {
        assert!(approx_eq(lane.shape.area(), 350.0, 0.01));
        assert_eq!(lane.kind(), LaneKind::Other);
    }

    // Side by side without overlapping
    let union = Polygon::union_all(edge.lanes.iter().map(|l| l.shape.clone()).collect());
    assert_eq!(union.len(), 1);
    assert!(approx_eq(union[0].area(), 700.0, 0.01));

    let b = edge.get_bounds();
    assert!(approx_eq(b.min_y, -3.5, 1e-6));
    assert!(approx_eq(b.max_y, 3.5, 1e-6));
}

#[test]
fn shift_round_trip() {
    let net = load_net();
    let lane = net.get_lane(&LaneID("in_1".to_string())).unwrap();
    let there_and_back = lane
        .center_line
        .shift_right(lane.width)
        .unwrap()
        .shift_left(lane.width)
        .unwrap();
    for (pt1, pt2) in there_and_back
        .points()
        .iter()
        .zip(lane.center_line.points().iter())
    {
        assert!(pt1.dist_to(*pt2) < Distance::meters(1e-3));
    }
}

#[test]
fn location_and_queries() {
    let net = load_net();
    assert_eq!(net.location.net_offset.x(), 10.0);
    assert_eq!(net.location.net_offset.y(), 20.0);

    assert_eq!(net.edges.len(), 3);
    assert_eq!(net.normal_edges().count(), 2);
    assert_eq!(net.lanes().count(), 5);
    assert_eq!(net.connections.len(), 2);
    assert_eq!(
        net.connections_from(&EdgeID("in".to_string())).count(),
        1
    );
    // Directly, and through the junction's internal edge
    assert_eq!(net.connections_to(&EdgeID("out".to_string())).count(), 2);
    assert_eq!(net.connections_to(&EdgeID("in".to_string())).count(), 0);

    let back = net.without_net_offset();
    let lane = back.get_lane(&LaneID("in_0".to_string())).unwrap();
    assert_eq!(lane.center_line.first_pt().x(), -10.0);
    assert_eq!(lane.center_line.first_pt().y(), -21.75);
}

#[test]
fn drop_internal_edges() {
    let opts = ParseOptions {
        keep_internal: false,
        ..Default::default()
    };
    let net = Network::parse(NET, &opts, &mut Timer::throwaway()).unwrap();
    assert_eq!(net.edges.len(), 2);
    assert!(net.edges.values().all(|e| !e.is_internal()));
    assert_eq!(net.connections.len(), 1);
}

#[test]
fn junction_shape_inferred() {
    let net = load_net();

    let j1 = net.get_junction(&JunctionID("J1".to_string())).unwrap();
    assert!(j1.is_controlled());
    assert!(j1.shape_inferred);
    // The gap between the two edges, 10m long and as wide as the edges
    let shape = j1.shape.as_ref().unwrap();
    assert!(approx_eq(shape.area(), 70.0, 0.01));

    let j2 = net.get_junction(&JunctionID("J2".to_string())).unwrap();
    assert!(!j2.shape_inferred);
    assert!(approx_eq(j2.shape.as_ref().unwrap().area(), 14.0, 0.01));

    // Only one edge touches J0, and all of its corners are in a line
    let j0 = net.get_junction(&JunctionID("J0".to_string())).unwrap();
    assert!(j0.shape.is_none());
}

const MISSING_WIDTH: &str = r#"<net version="1.9">
    <edge id="e" from="A" to="B">
        <lane id="e_0" index="0" speed="13.89" length="100.00" width="3.20" shape="0.00,-1.60 100.00,-1.60"/>
        <lane id="e_1" index="1" speed="13.89" length="100.00" shape="0.00,1.60 100.00,1.60"/>
    </edge>
    <junction id="A" type="dead_end" x="0.00" y="0.00"/>
    <junction id="B" type="dead_end" x="100.00" y="0.00"/>
</net>"#;

#[test]
fn missing_lane_width() {
    let mut timer = Timer::throwaway();
    let net = Network::parse(MISSING_WIDTH, &ParseOptions::default(), &mut timer).unwrap();
    let edge = net.get_edge(&EdgeID("e".to_string())).unwrap();
    assert_eq!(edge.lanes.len(), 1);
    assert_eq!(edge.lanes[0].id, LaneID("e_0".to_string()));

    assert_eq!(net.diagnostics.len(), 1);
    assert!(net.diagnostics[0].is_geometry());
    assert_eq!(net.diagnostics[0].id(), Some("e_1"));
    assert_eq!(timer.warnings().len(), 1);

    // SUMO's own default fills the gap
    let net = Network::parse(
        MISSING_WIDTH,
        &ParseOptions::sumo_defaults(),
        &mut Timer::throwaway(),
    )
    .unwrap();
    assert!(net.diagnostics.is_empty());
    let edge = net.get_edge(&EdgeID("e".to_string())).unwrap();
    assert_eq!(edge.lanes.len(), 2);
    assert_eq!(edge.lanes[1].width, Distance::meters(3.2));
}

#[test]
fn bad_lane_geometry() {
    let xml = r#"<net>
        <edge id="e">
            <lane id="e_0" index="0" width="3.2" shape="0.00,0.00 0.00,0.00"/>
            <lane id="e_1" index="1" width="3.2" shape="0.00,3.20 nonsense"/>
            <lane id="e_2" index="2" width="3.2" shape="0.00,6.40 50.00,6.40"/>
        </edge>
    </net>"#;
    let net = Network::parse(xml, &ParseOptions::default(), &mut Timer::throwaway()).unwrap();
    assert_eq!(net.lanes().count(), 1);
    assert_eq!(net.diagnostics.len(), 2);
    assert!(net.diagnostics.iter().all(|d| d.is_geometry()));
}

fn structural_error(xml: &str) -> String {
    let err = Network::parse(xml, &ParseOptions::default(), &mut Timer::throwaway())
        .err()
        .unwrap();
    match err.downcast_ref::<ParseError>() {
        Some(ParseError::Structural(msg)) => msg.clone(),
        _ => panic!("expected a structural error, got {}", err),
    }
}

#[test]
fn structural_failures() {
    assert!(structural_error("<net><edge id=\"e\">").contains("invalid XML"));
    assert!(structural_error("<additional/>").contains("not <net>"));
    assert!(structural_error(
        r#"<net><lane id="x_0" width="3" shape="0,0 1,0"/></net>"#
    )
    .contains("isn't inside"));
    assert!(structural_error(
        r#"<net><edge id="e" from="nowhere"/></net>"#
    )
    .contains("no such junction"));
    assert!(structural_error(r#"<net><edge id="e"/><edge id="e"/></net>"#).contains("duplicate"));
    assert!(structural_error(
        r#"<net><edge id="e"><lane id="f_0" width="3" shape="0,0 1,0"/></edge></net>"#
    )
    .contains("doesn't belong"));
    assert!(structural_error(
        r#"<net><edge id="e"/><connection from="e" to="missing" fromLane="0" toLane="0"/></net>"#
    )
    .contains("doesn't exist"));
}
