use std::collections::BTreeMap;

use geom::{Polygon, Pt2D};

use crate::{Edge, EdgeID, JunctionID, LaneID};

/// Guesses a junction's outline when the file doesn't give one: the convex hull of the corners
/// of every lane touching the junction, plus the junction's own point. SUMO computes the real
/// shape differently, so concave junctions come out too big. Returns None if there aren't enough
/// distinct points for an area.
pub(crate) fn infer_shape(
    id: &JunctionID,
    pt: Pt2D,
    incoming_lanes: &[LaneID],
    internal_lanes: &[LaneID],
    edges: &BTreeMap<EdgeID, Edge>,
) -> Option<Polygon> {
    let mut pts = vec![pt];

    for edge in edges.values() {
        if edge.to.as_ref() == Some(id) {
            for lane in &edge.lanes {
                pts.extend(lane.end_corners());
            }
        }
        if edge.from.as_ref() == Some(id) {
            for lane in &edge.lanes {
                pts.extend(lane.start_corners());
            }
        }
    }

    // Lanes can be listed without the edge declaring from/to
    let lookup = |lane_id: &LaneID| {
        let (edge, index) = lane_id.edge_and_index()?;
        edges.get(&edge)?.get_lane(index)
    };
    for lane in incoming_lanes.iter().filter_map(lookup) {
        pts.extend(lane.end_corners());
    }
    for lane in internal_lanes.iter().filter_map(lookup) {
        pts.extend(lane.start_corners());
        pts.extend(lane.end_corners());
        pts.extend(lane.center_line.points().iter().cloned());
    }

    match Polygon::convex_hull(&pts) {
        Ok(p) => Some(p),
        Err(err) => {
            debug!("Can't infer a shape for {}: {}", id, err);
            None
        }
    }
}
