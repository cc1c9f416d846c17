//! Exports networks and additional objects as a [Wavefront
//! OBJ](https://en.wikipedia.org/wiki/Wavefront_.obj_file) mesh.
//!
//! Axes: X points east, Y points forward (north), Z points up. Every flat shape becomes a
//! triangulated patch at some elevation, optionally extruded upwards into a prism. Output only
//! depends on the input; the same network always produces the same bytes.

use std::collections::BTreeMap;
use std::fmt::Write;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use geom::{Distance, Polygon, Tessellation};

use crate::render::{lane_markings, stop_geometry, stop_line, MarkingStyle, StopStyle};
use crate::{Additionals, Network, PolyShape};

/// How one category of shapes turns into patches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchOptions {
    pub include: bool,
    /// Elevation of the base
    pub z: f64,
    /// If positive, the patch becomes a prism this tall, with walls along every ring.
    pub extrude_height: f64,
    pub include_bottom_face: bool,
}

impl Default for PatchOptions {
    fn default() -> PatchOptions {
        PatchOptions {
            include: true,
            z: 0.0,
            extrude_height: 0.0,
            include_bottom_face: false,
        }
    }
}

impl PatchOptions {
    fn at(z: f64) -> PatchOptions {
        PatchOptions {
            z,
            ..Default::default()
        }
    }
}

/// A flat ground patch under the whole network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainOptions {
    /// How far the terrain reaches past the lanes and junctions
    pub buffer: Distance,
    pub z: f64,
}

impl Default for TerrainOptions {
    fn default() -> TerrainOptions {
        TerrainOptions {
            buffer: Distance::meters(10.0),
            z: -0.01,
        }
    }
}

/// Renames materials. Keys are the default names, like `"pedestrian"` or `"white_markings"`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialMap(pub BTreeMap<String, String>);

impl MaterialMap {
    pub fn get(&self, default: &str) -> String {
        self.0
            .get(default)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjOptions {
    pub lanes: PatchOptions,
    pub junctions: PatchOptions,
    pub lane_markings: PatchOptions,
    pub stop_lines: PatchOptions,
    pub polygons: PatchOptions,
    pub stop_areas: PatchOptions,
    pub stop_markings: PatchOptions,
    pub terrain: Option<TerrainOptions>,
    pub materials: MaterialMap,

    pub style: MarkingStyle,
    pub stop_style: StopStyle,
    pub stripe_width_scale: f64,
    /// If a polygon has this param, its value is the material name.
    pub poly_material_param: Option<String>,
    /// If a polygon has this param and it's a number, it overrides the extrusion height.
    pub poly_height_param: Option<String>,
}

impl Default for ObjOptions {
    fn default() -> ObjOptions {
        ObjOptions {
            lanes: PatchOptions::at(0.0),
            junctions: PatchOptions::at(0.0),
            lane_markings: PatchOptions::at(0.001),
            stop_lines: PatchOptions::at(0.001),
            polygons: PatchOptions::at(0.0),
            stop_areas: PatchOptions::at(0.002),
            stop_markings: PatchOptions::at(0.003),
            terrain: None,
            materials: MaterialMap::default(),

            style: MarkingStyle::Usa,
            stop_style: StopStyle::Sumo,
            stripe_width_scale: 1.0,
            poly_material_param: None,
            poly_height_param: None,
        }
    }
}

impl ObjOptions {
    pub fn load(path: &str) -> Result<ObjOptions> {
        let opts: ObjOptions = netutil::read_json(path)?;
        opts.validate()?;
        Ok(opts)
    }

    /// Writes every field, so the file also documents the defaults.
    pub fn save(&self, path: &str) -> Result<()> {
        netutil::write_json(path, self)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, patch) in [
            ("lanes", &self.lanes),
            ("junctions", &self.junctions),
            ("lane_markings", &self.lane_markings),
            ("stop_lines", &self.stop_lines),
            ("polygons", &self.polygons),
            ("stop_areas", &self.stop_areas),
            ("stop_markings", &self.stop_markings),
        ] {
            if !patch.z.is_finite() {
                bail!("{}: z must be finite, not {}", name, patch.z);
            }
            if !patch.extrude_height.is_finite() || patch.extrude_height < 0.0 {
                bail!(
                    "{}: extrude_height must be non-negative, not {}",
                    name,
                    patch.extrude_height
                );
            }
        }
        if let Some(ref terrain) = self.terrain {
            if !terrain.z.is_finite() {
                bail!("terrain: z must be finite, not {}", terrain.z);
            }
            if terrain.buffer < Distance::ZERO {
                bail!("terrain: buffer can't be negative, not {}", terrain.buffer);
            }
        }
        if !self.stripe_width_scale.is_finite() || self.stripe_width_scale <= 0.0 {
            bail!(
                "stripe_width_scale must be positive, not {}",
                self.stripe_width_scale
            );
        }
        Ok(())
    }
}

/// One named mesh with a single material.
#[derive(Clone, Debug, PartialEq)]
pub struct Object3D {
    pub name: String,
    pub material: String,
    pub vertices: Vec<[f64; 3]>,
    /// Indices into `vertices`, counter-clockwise when seen from outside.
    pub faces: Vec<Vec<usize>>,
}

impl Object3D {
    pub fn new<S1: Into<String>, S2: Into<String>>(name: S1, material: S2) -> Object3D {
        Object3D {
            name: name.into(),
            material: material.into(),
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Adds the polygon as a patch. The top face is always included; walls and the bottom face
    /// depend on `opts`.
    pub fn add_polygon(&mut self, polygon: &Polygon, opts: &PatchOptions) {
        let tess = Tessellation::from(polygon);
        let base = self.vertices.len();
        let top_z = opts.z + opts.extrude_height;
        let extruded = opts.extrude_height > 0.0;

        let (points, indices) = tess.consume();
        for pt in &points {
            self.vertices.push([pt.x(), pt.y(), top_z]);
        }
        for tri in indices.chunks_exact(3) {
            self.faces
                .push(tri.iter().map(|idx| base + *idx as usize).collect());
        }

        if !extruded && !opts.include_bottom_face {
            return;
        }
        let bottom = if extruded {
            let bottom = self.vertices.len();
            for pt in &points {
                self.vertices.push([pt.x(), pt.y(), opts.z]);
            }
            bottom
        } else {
            base
        };

        if extruded {
            // Rings appear in the same order as the tessellated points, minus the closing point.
            // The exterior goes counter-clockwise and holes clockwise, so (b_i, b_j, t_j, t_i)
            // always faces away from the solid.
            let mut offset = 0;
            for ring in polygon.rings() {
                let len = ring.points().len() - 1;
                for i in 0..len {
                    let j = (i + 1) % len;
                    self.faces.push(vec![
                        bottom + offset + i,
                        bottom + offset + j,
                        base + offset + j,
                        base + offset + i,
                    ]);
                }
                offset += len;
            }
        }

        if opts.include_bottom_face {
            for tri in indices.chunks_exact(3) {
                self.faces.push(
                    tri.iter()
                        .rev()
                        .map(|idx| bottom + *idx as usize)
                        .collect(),
                );
            }
        }
    }
}

/// Starts every file, so importers can be told the orientation.
pub const AXES_HEADER: &str = "# X east, Y north (forward), Z up\n";

/// Writes objects as OBJ text, after the axis comment. Empty objects are left out.
pub fn to_obj_text(objects: &[Object3D]) -> String {
    let mut out = AXES_HEADER.to_string();
    let mut offset = 1;
    for obj in objects {
        if obj.is_empty() {
            continue;
        }
        // Writing to a String can't fail
        let _ = writeln!(out, "o {}", obj.name);
        let _ = writeln!(out, "usemtl {}", obj.material);
        for [x, y, z] in &obj.vertices {
            let _ = writeln!(out, "v {:.4} {:.4} {:.4}", x, y, z);
        }
        for face in &obj.faces {
            let idx: Vec<String> = face.iter().map(|i| (i + offset).to_string()).collect();
            let _ = writeln!(out, "f {}", idx.join(" "));
        }
        offset += obj.vertices.len();
    }
    out
}

/// The network as a mesh: lanes, junctions, lane markings, stop lines and optionally terrain.
pub fn export(net: &Network, opts: &ObjOptions) -> Result<String> {
    opts.validate()?;
    Ok(to_obj_text(&network_objects(net, opts)))
}

/// Polygons and stops as a mesh.
pub fn export_additionals(additionals: &Additionals, opts: &ObjOptions) -> Result<String> {
    opts.validate()?;
    Ok(to_obj_text(&additionals_objects(additionals, opts)))
}

/// Lane objects are grouped by material, so the output has one object per material and category
/// rather than one per lane.
pub fn network_objects(net: &Network, opts: &ObjOptions) -> Vec<Object3D> {
    let mut lanes: BTreeMap<String, Object3D> = BTreeMap::new();
    let mut markings: BTreeMap<String, Object3D> = BTreeMap::new();
    let mut stop_lines = Object3D::new("stop_lines", opts.materials.get("stop_line"));
    let mut junctions = Object3D::new("junctions", opts.materials.get("junction"));

    for edge in net.edges.values() {
        for lane in &edge.lanes {
            if opts.lanes.include {
                let material = opts.materials.get(lane.kind().name());
                lanes
                    .entry(material.clone())
                    .or_insert_with(|| Object3D::new(format!("lanes_{}", material), material))
                    .add_polygon(&lane.shape, &opts.lanes);
            }

            if opts.lane_markings.include {
                for marking in lane_markings(edge, lane, opts.style, opts.stripe_width_scale) {
                    let material = opts.materials.get(marking.color.material());
                    let obj = markings
                        .entry(material.clone())
                        .or_insert_with(|| Object3D::new(format!("markings_{}", material), material));
                    for p in &marking.polygons {
                        obj.add_polygon(p, &opts.lane_markings);
                    }
                }
            }

            if opts.stop_lines.include {
                if let Some(p) = stop_line(net, edge, lane, opts.stripe_width_scale) {
                    stop_lines.add_polygon(&p, &opts.stop_lines);
                }
            }
        }
    }

    if opts.junctions.include {
        for j in net.junctions.values() {
            if let Some(ref p) = j.shape {
                junctions.add_polygon(p, &opts.junctions);
            }
        }
    }

    let mut objects = Vec::new();
    if let Some(ref terrain) = opts.terrain {
        objects.push(terrain_object(net, terrain, opts.materials.get("terrain")));
    }
    objects.push(junctions);
    objects.extend(lanes.into_values());
    objects.extend(markings.into_values());
    objects.push(stop_lines);
    objects
}

/// The union of every lane and junction, grown by the buffer.
fn terrain_object(net: &Network, terrain: &TerrainOptions, material: String) -> Object3D {
    let mut footprints: Vec<Polygon> = net.lanes().map(|l| l.shape.clone()).collect();
    footprints.extend(net.junctions.values().filter_map(|j| j.shape.clone()));

    let mut pieces = Vec::new();
    for p in Polygon::union_all(footprints) {
        pieces.extend(p.dilate(terrain.buffer));
    }
    let patch = PatchOptions::at(terrain.z);
    let mut obj = Object3D::new("terrain", material);
    for p in Polygon::union_all(pieces) {
        obj.add_polygon(&p, &patch);
    }
    obj
}

/// One object per polygon, named after it, then the stop areas and markings.
pub fn additionals_objects(additionals: &Additionals, opts: &ObjOptions) -> Vec<Object3D> {
    let mut objects = Vec::new();

    if opts.polygons.include {
        for poly in additionals.polys.values() {
            let polygon = match poly.shape {
                PolyShape::Filled(ref p) => p.clone(),
                PolyShape::Outline(ref pl) => match pl.make_polygons(poly.line_width) {
                    Ok(p) => p,
                    Err(err) => {
                        debug!("Skipping outline of poly {}: {}", poly.id, err);
                        continue;
                    }
                },
            };
            let material = opts
                .poly_material_param
                .as_ref()
                .and_then(|key| poly.params.get(key))
                .cloned()
                .unwrap_or_else(|| opts.materials.get(&format!("{}_poly", poly.poly_type)));
            let mut patch = opts.polygons.clone();
            if let Some(height) = opts
                .poly_height_param
                .as_ref()
                .and_then(|key| poly.params.get(key))
                .and_then(|value| value.parse::<f64>().ok())
                .filter(|h| h.is_finite() && *h >= 0.0)
            {
                patch.extrude_height = height;
            }

            let mut obj = Object3D::new(poly.id.clone(), material);
            obj.add_polygon(&polygon, &patch);
            objects.push(obj);
        }
    }

    let mut areas = Object3D::new("busstop_area", opts.materials.get("busstop_area"));
    let mut stop_markings = Object3D::new(
        "busstop_markings",
        opts.materials.get(opts.stop_style.marking_paint().material()),
    );
    for stop in additionals.stops.values() {
        let geometry = stop_geometry(stop, opts.stop_style);
        if opts.stop_areas.include {
            if let Some(ref area) = geometry.area {
                areas.add_polygon(area, &opts.stop_areas);
            }
        }
        if opts.stop_markings.include {
            for p in &geometry.markings {
                stop_markings.add_polygon(p, &opts.stop_markings);
            }
        }
    }
    objects.push(areas);
    objects.push(stop_markings);
    objects
}

#[cfg(test)]
mod tests {
    use geom::{Pt2D, Ring};

    use super::*;

    fn square() -> Polygon {
        Ring::new(vec![
            Pt2D::new(0.0, 0.0),
            Pt2D::new(2.0, 0.0),
            Pt2D::new(2.0, 2.0),
            Pt2D::new(0.0, 2.0),
            Pt2D::new(0.0, 0.0),
        ])
        .unwrap()
        .into_polygon()
        .unwrap()
    }

    #[test]
    fn flat_patch() {
        let mut obj = Object3D::new("sq", "m");
        obj.add_polygon(&square(), &PatchOptions::at(0.5));
        assert_eq!(obj.vertices.len(), 4);
        assert_eq!(obj.faces.len(), 2);
        assert!(obj.vertices.iter().all(|v| v[2] == 0.5));
    }

    #[test]
    fn extruded_prism() {
        let mut obj = Object3D::new("sq", "m");
        obj.add_polygon(
            &square(),
            &PatchOptions {
                include: true,
                z: 0.0,
                extrude_height: 3.0,
                include_bottom_face: true,
            },
        );
        assert_eq!(obj.vertices.len(), 8);
        // 2 on top, 4 walls, 2 on the bottom
        assert_eq!(obj.faces.len(), 8);
        assert_eq!(obj.faces.iter().filter(|f| f.len() == 4).count(), 4);
    }

    #[test]
    fn text_indices_are_global() {
        let mut a = Object3D::new("a", "m1");
        a.add_polygon(&square(), &PatchOptions::default());
        let b = a.clone();
        let empty = Object3D::new("nothing", "m3");
        let text = to_obj_text(&[a, empty, b]);

        assert!(text.starts_with(AXES_HEADER));
        assert!(!text.contains("o nothing"));
        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 8);
        let max_index = text
            .lines()
            .filter(|l| l.starts_with("f "))
            .flat_map(|l| l[2..].split(' ').map(|i| i.parse::<usize>().unwrap()))
            .max()
            .unwrap();
        assert_eq!(max_index, 8);
    }

    #[test]
    fn material_overrides() {
        let mut map = MaterialMap::default();
        map.0.insert("junction".to_string(), "asphalt".to_string());
        assert_eq!(map.get("junction"), "asphalt");
        assert_eq!(map.get("terrain"), "terrain");
    }
}
