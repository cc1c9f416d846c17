use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};

use geom::{Bounds, Distance, PolyLine, Polygon, Pt2D, Ring, Speed};
use netutil::{prettyprint_usize, slurp_file, Timer};

use super::junction::infer_shape;
use crate::{
    Allowance, Connection, Edge, EdgeFunction, EdgeID, Junction, JunctionID, Lane, LaneID,
    Location, Network, ParseError, ParseOptions,
};

impl Network {
    /// Reads a .net.xml file.
    pub fn load(path: &str, opts: &ParseOptions, timer: &mut Timer) -> Result<Network> {
        timer.start(format!("read {}", path));
        let bytes = slurp_file(path)?;
        let raw_string = std::str::from_utf8(&bytes).with_context(|| format!("reading {}", path))?;
        timer.stop(format!("read {}", path));
        Network::parse(raw_string, opts, timer)
    }

    /// Parses the contents of a .net.xml file. A malformed hierarchy fails with
    /// `ParseError::Structural`; lanes with bad geometry are skipped and listed in
    /// `diagnostics`.
    pub fn parse(xml: &str, opts: &ParseOptions, timer: &mut Timer) -> Result<Network> {
        timer.start("parse network");
        let result = parse_network(xml, opts, timer);
        timer.stop("parse network");
        result
    }
}

fn structural<S: Into<String>>(msg: S) -> anyhow::Error {
    ParseError::Structural(msg.into()).into()
}

fn parse_network(xml: &str, opts: &ParseOptions, timer: &mut Timer) -> Result<Network> {
    let tree = roxmltree::Document::parse(xml)
        .map_err(|err| structural(format!("invalid XML: {}", err)))?;
    let root = tree.root_element();
    if root.tag_name().name() != "net" {
        return Err(structural(format!(
            "root element is <{}>, not <net>",
            root.tag_name().name()
        )));
    }

    let mut location = Location::default();
    let mut edge_nodes = Vec::new();
    let mut junction_nodes = Vec::new();
    let mut connection_nodes = Vec::new();
    for obj in root.children() {
        if !obj.is_element() {
            continue;
        }
        match obj.tag_name().name() {
            "location" => {
                location = parse_location(obj, timer);
            }
            "edge" => {
                edge_nodes.push(obj);
            }
            "junction" => {
                junction_nodes.push(obj);
            }
            "connection" => {
                connection_nodes.push(obj);
            }
            "lane" => {
                return Err(structural(format!(
                    "<lane> {} isn't inside an <edge>",
                    obj.attribute("id").unwrap_or("without an id")
                )));
            }
            // type, tlLogic, roundabout, request, ...
            _ => {}
        }
    }

    let mut junction_ids = BTreeSet::new();
    for obj in &junction_nodes {
        let id = obj
            .attribute("id")
            .ok_or_else(|| structural("<junction> without an id"))?;
        if !junction_ids.insert(JunctionID(id.to_string())) {
            return Err(structural(format!("duplicate junction {}", id)));
        }
    }

    let mut diagnostics = Vec::new();
    let mut edges: BTreeMap<EdgeID, Edge> = BTreeMap::new();
    timer.start_iter("parse edges", edge_nodes.len());
    for obj in edge_nodes {
        timer.next();
        let edge = parse_edge(obj, opts, &junction_ids, &mut diagnostics)?;
        if edges.contains_key(&edge.id) {
            return Err(structural(format!("duplicate edge {}", edge.id.0)));
        }
        edges.insert(edge.id.clone(), edge);
    }

    let mut junctions = BTreeMap::new();
    for obj in junction_nodes {
        if let Some(junction) = parse_junction(obj, &edges, &mut diagnostics) {
            junctions.insert(junction.id.clone(), junction);
        }
    }

    let mut connections = Vec::new();
    for obj in connection_nodes {
        let conn = parse_connection(obj, &edges)?;
        if !opts.keep_internal && (edges[&conn.from].is_internal() || edges[&conn.to].is_internal())
        {
            continue;
        }
        connections.push(conn);
    }

    if !opts.keep_internal {
        edges.retain(|_, e| !e.is_internal());
    }

    for diag in &diagnostics {
        timer.warn(diag.to_string());
    }
    timer.note(format!(
        "{} edges, {} junctions, {} connections, {} skipped",
        prettyprint_usize(edges.len()),
        prettyprint_usize(junctions.len()),
        prettyprint_usize(connections.len()),
        prettyprint_usize(diagnostics.len())
    ));

    Ok(Network {
        location,
        edges,
        junctions,
        connections,
        diagnostics,
    })
}

fn parse_location(obj: roxmltree::Node, timer: &mut Timer) -> Location {
    let mut location = Location::default();
    if let Some(raw) = obj.attribute("netOffset") {
        match parse_pt(raw) {
            Ok(pt) => {
                location.net_offset = pt;
            }
            Err(err) => timer.warn(format!("ignoring netOffset {}: {}", raw, err)),
        }
    }
    for (key, field) in [
        ("convBoundary", &mut location.converted_boundary),
        ("origBoundary", &mut location.orig_boundary),
    ] {
        if let Some(raw) = obj.attribute(key) {
            match parse_bounds(raw) {
                Ok(b) => {
                    *field = Some(b);
                }
                Err(err) => timer.warn(format!("ignoring {} {}: {}", key, raw, err)),
            }
        }
    }
    if let Some(raw) = obj.attribute("projParameter") {
        location.projection = raw.to_string();
    }
    location
}

fn parse_edge(
    obj: roxmltree::Node,
    opts: &ParseOptions,
    junction_ids: &BTreeSet<JunctionID>,
    diagnostics: &mut Vec<ParseError>,
) -> Result<Edge> {
    let id = EdgeID(
        obj.attribute("id")
            .ok_or_else(|| structural("<edge> without an id"))?
            .to_string(),
    );
    let function = match obj.attribute("function") {
        None | Some("normal") => EdgeFunction::Normal,
        Some("internal") => EdgeFunction::Internal,
        Some("connector") => EdgeFunction::Connector,
        Some("crossing") => EdgeFunction::Crossing,
        Some("walkingarea") => EdgeFunction::WalkingArea,
        Some(x) => {
            warn!("{} has unknown function {}, treating as normal", id, x);
            EdgeFunction::Normal
        }
    };

    let endpoint = |key: &str| -> Result<Option<JunctionID>> {
        match obj.attribute(key) {
            Some(raw) => {
                let j = JunctionID(raw.to_string());
                if !junction_ids.contains(&j) {
                    return Err(structural(format!(
                        "edge {} has {}={}, but there's no such junction",
                        id.0, key, raw
                    )));
                }
                Ok(Some(j))
            }
            None => Ok(None),
        }
    };
    let from = endpoint("from")?;
    let to = endpoint("to")?;

    let priority = match obj.attribute("priority") {
        Some(raw) => match raw.parse::<isize>() {
            Ok(x) => Some(x),
            Err(_) => {
                warn!("{} has a bad priority {}", id, raw);
                None
            }
        },
        None => None,
    };

    let mut lanes = Vec::new();
    for child in obj
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "lane")
    {
        let lane_id = LaneID(
            child
                .attribute("id")
                .ok_or_else(|| structural(format!("<lane> without an id in edge {}", id.0)))?
                .to_string(),
        );
        let id_index = match lane_id.edge_and_index() {
            Some((edge, idx)) if edge == id => idx,
            _ => {
                return Err(structural(format!(
                    "lane {} doesn't belong to edge {}",
                    lane_id.0, id.0
                )));
            }
        };
        let index = match child.attribute("index").map(|x| x.parse::<usize>()) {
            Some(Ok(idx)) => idx,
            Some(Err(_)) | None => {
                if child.attribute("index").is_some() {
                    warn!("{} has a bad index, using the one from its ID", lane_id);
                }
                id_index
            }
        };
        if lanes.iter().any(|l: &Lane| l.id == lane_id) {
            return Err(structural(format!("duplicate lane {}", lane_id.0)));
        }

        match parse_lane(child, &id, lane_id, index, opts) {
            Ok(lane) => lanes.push(lane),
            Err(diag) => diagnostics.push(diag),
        }
    }
    lanes.sort_by_key(|l| l.index);

    Ok(Edge {
        function,
        from,
        to,
        edge_type: obj.attribute("type").map(|x| x.to_string()),
        name: obj.attribute("name").map(|x| x.to_string()),
        priority,
        lanes,
        id,
    })
}

fn parse_lane(
    obj: roxmltree::Node,
    edge: &EdgeID,
    id: LaneID,
    index: usize,
    opts: &ParseOptions,
) -> Result<Lane, ParseError> {
    let fail = |reason: String| ParseError::geometry(id.0.clone(), reason);

    let raw_shape = obj
        .attribute("shape")
        .ok_or_else(|| fail("missing shape".to_string()))?;
    let pts = parse_shape(raw_shape).map_err(|err| fail(format!("bad shape: {}", err)))?;
    let center_line =
        PolyLine::deduping_new(pts).map_err(|err| fail(format!("bad shape: {}", err)))?;

    let width = match obj.attribute("width") {
        Some(raw) => {
            let w = parse_f64(raw).map_err(|err| fail(format!("bad width: {}", err)))?;
            if w <= 0.0 {
                return Err(fail(format!("width {} isn't positive", raw)));
            }
            Distance::meters(w)
        }
        None => opts
            .default_lane_width
            .ok_or_else(|| fail("missing width".to_string()))?,
    };

    let shape = center_line
        .make_polygons(width)
        .map_err(|err| fail(format!("can't build polygon: {}", err)))?;

    let speed = match obj.attribute("speed") {
        Some(raw) => Speed::meters_per_second(
            parse_f64(raw).map_err(|err| fail(format!("bad speed: {}", err)))?,
        ),
        // SUMO's default for edges without a type
        None => Speed::meters_per_second(13.89),
    };
    let length = match obj.attribute("length").map(parse_f64) {
        Some(Ok(x)) => Distance::meters(x),
        _ => center_line.length(),
    };
    let end_offset = match obj.attribute("endOffset").map(parse_f64) {
        Some(Ok(x)) => Distance::meters(x),
        _ => Distance::ZERO,
    };

    Ok(Lane {
        edge: edge.clone(),
        index,
        speed,
        length,
        width,
        allow: Allowance::parse(obj.attribute("allow"), obj.attribute("disallow")),
        center_line,
        shape,
        end_offset,
        acceleration: matches!(obj.attribute("acceleration"), Some("1") | Some("true")),
        id,
    })
}

fn parse_junction(
    obj: roxmltree::Node,
    edges: &BTreeMap<EdgeID, Edge>,
    diagnostics: &mut Vec<ParseError>,
) -> Option<Junction> {
    // Presence was already checked
    let id = JunctionID(obj.attribute("id")?.to_string());
    let junction_type = obj.attribute("type").unwrap_or("unknown").to_string();
    // Internal junctions are just waiting positions inside a real junction
    if junction_type == "internal" {
        return None;
    }

    let lane_list = |key: &str| -> Vec<LaneID> {
        obj.attribute(key)
            .map(|raw| {
                raw.split_whitespace()
                    .map(|x| LaneID(x.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    };
    let incoming_lanes = lane_list("incLanes");
    let internal_lanes = lane_list("intLanes");

    let declared_shape = obj
        .attribute("shape")
        .and_then(|raw| parse_shape(raw).ok())
        .and_then(|pts| Ring::deduping_new(pts).ok())
        .and_then(|ring| Polygon::from_ring(ring).ok());

    let pt = match (
        obj.attribute("x").map(parse_f64),
        obj.attribute("y").map(parse_f64),
    ) {
        (Some(Ok(x)), Some(Ok(y))) => Pt2D::new(x, y),
        _ => match declared_shape {
            Some(ref p) => p.center(),
            None => {
                diagnostics.push(ParseError::geometry(
                    id.0,
                    "no valid x/y and no shape to fall back on",
                ));
                return None;
            }
        },
    };

    let (shape, shape_inferred) = match declared_shape {
        Some(p) => (Some(p), false),
        None => {
            let inferred = infer_shape(&id, pt, &incoming_lanes, &internal_lanes, edges);
            let found = inferred.is_some();
            (inferred, found)
        }
    };

    Some(Junction {
        id,
        junction_type,
        pt,
        incoming_lanes,
        internal_lanes,
        shape,
        shape_inferred,
    })
}

fn parse_connection(obj: roxmltree::Node, edges: &BTreeMap<EdgeID, Edge>) -> Result<Connection> {
    let edge = |key: &str| -> Result<EdgeID> {
        let raw = obj
            .attribute(key)
            .ok_or_else(|| structural(format!("<connection> without {}", key)))?;
        let id = EdgeID(raw.to_string());
        if !edges.contains_key(&id) {
            return Err(structural(format!(
                "connection references edge {}, which doesn't exist",
                raw
            )));
        }
        Ok(id)
    };
    let lane_index = |key: &str| -> Result<usize> {
        let raw = obj
            .attribute(key)
            .ok_or_else(|| structural(format!("<connection> without {}", key)))?;
        raw.parse::<usize>()
            .map_err(|_| structural(format!("connection has a bad {} {}", key, raw)))
    };

    Ok(Connection {
        from: edge("from")?,
        to: edge("to")?,
        from_lane: lane_index("fromLane")?,
        to_lane: lane_index("toLane")?,
        via: obj.attribute("via").map(|x| LaneID(x.to_string())),
        dir: obj.attribute("dir").map(|x| x.to_string()),
        state: obj.attribute("state").map(|x| x.to_string()),
    })
}

/// A finite number
pub(crate) fn parse_f64(raw: &str) -> Result<f64> {
    let x = raw
        .trim()
        .parse::<f64>()
        .with_context(|| format!("{} isn't a number", raw))?;
    if !x.is_finite() {
        bail!("{} isn't finite", raw);
    }
    Ok(x)
}

fn parse_pt(raw: &str) -> Result<Pt2D> {
    let parts: Vec<&str> = raw.split(',').collect();
    // A third z component is allowed and ignored
    if parts.len() != 2 && parts.len() != 3 {
        bail!("{} isn't x,y", raw);
    }
    Ok(Pt2D::new(parse_f64(parts[0])?, parse_f64(parts[1])?))
}

/// SUMO shapes are space-separated "x,y" or "x,y,z" points.
pub(crate) fn parse_shape(raw: &str) -> Result<Vec<Pt2D>> {
    let mut pts = Vec::new();
    for pair in raw.split_whitespace() {
        pts.push(parse_pt(pair)?);
    }
    if pts.is_empty() {
        bail!("empty shape");
    }
    Ok(pts)
}

fn parse_bounds(raw: &str) -> Result<Bounds> {
    let parts = raw
        .split(',')
        .map(parse_f64)
        .collect::<Result<Vec<f64>>>()?;
    if parts.len() != 4 {
        bail!("{} isn't xmin,ymin,xmax,ymax", raw);
    }
    Ok(Bounds::from_corners(parts[0], parts[1], parts[2], parts[3]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes() {
        assert_eq!(
            parse_shape("0.00,1.50 10,1.5,3.0").unwrap(),
            vec![Pt2D::new(0.0, 1.5), Pt2D::new(10.0, 1.5)]
        );
        assert!(parse_shape("").is_err());
        assert!(parse_shape("1,2 3").is_err());
        assert!(parse_shape("1,2 NaN,4").is_err());
        assert!(parse_shape("1,2 inf,4").is_err());
    }
}
