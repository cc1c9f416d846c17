mod common;

use geom::{Distance, Polygon};
use netutil::Timer;
use sumo_netvis::obj::{self, MaterialMap, Object3D, ObjOptions, PatchOptions, TerrainOptions};
use sumo_netvis::{Additionals, StopStyle};

use common::{approx_eq, load_net};

fn materials(text: &str) -> Vec<&str> {
    text.lines()
        .filter_map(|l| l.strip_prefix("usemtl "))
        .collect()
}

fn triangle_area(obj: &Object3D) -> f64 {
    let mut total = 0.0;
    for face in &obj.faces {
        let [a, b, c] = [
            obj.vertices[face[0]],
            obj.vertices[face[1]],
            obj.vertices[face[2]],
        ];
        total += ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])) / 2.0;
    }
    total
}

#[test]
fn deterministic() {
    let opts = ObjOptions {
        terrain: Some(TerrainOptions::default()),
        ..Default::default()
    };
    let text1 = obj::export(&load_net(), &opts).unwrap();
    let text2 = obj::export(&load_net(), &opts).unwrap();
    assert!(!text1.is_empty());
    assert_eq!(text1, text2);
}

#[test]
fn network_mesh() {
    let net = load_net();
    let text = obj::export(&net, &ObjOptions::default()).unwrap();

    // Orientation comes first, before any object
    assert_eq!(text.lines().next(), Some("# X east, Y north (forward), Z up"));
    assert_eq!(text.lines().filter(|l| l.starts_with('#')).count(), 1);
    assert_eq!(
        materials(&text),
        vec![
            "junction",
            "other",
            "white_markings",
            "yellow_markings",
            "stop_line"
        ]
    );
    let text = obj::export(
        &net,
        &ObjOptions {
            lane_markings: PatchOptions {
                include: false,
                ..Default::default()
            },
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(materials(&text), vec!["junction", "other", "stop_line"]);

    // Flat patches in the XY plane, at each category's elevation
    for line in text.lines().filter(|l| l.starts_with("v ")) {
        let z: f64 = line.split(' ').nth(3).unwrap().parse().unwrap();
        assert!(z == 0.0 || z == 0.001);
    }

    // Every face index points at a vertex
    let num_vertices = text.lines().filter(|l| l.starts_with("v ")).count();
    for line in text.lines().filter(|l| l.starts_with("f ")) {
        for idx in line[2..].split(' ') {
            let idx: usize = idx.parse().unwrap();
            assert!(idx >= 1 && idx <= num_vertices);
        }
    }
}

#[test]
fn lane_area_preserved() {
    let net = load_net();
    let objects = obj::network_objects(&net, &ObjOptions::default());
    let lanes = objects.iter().find(|o| o.material == "other").unwrap();
    let expected: f64 = net.lanes().map(|l| l.shape.area()).sum();
    assert!(approx_eq(triangle_area(lanes), expected, 0.01));
}

#[test]
fn material_overrides() {
    let mut map = MaterialMap::default();
    map.0.insert("other".to_string(), "asphalt".to_string());
    map.0.insert("junction".to_string(), "cobblestone".to_string());
    let opts = ObjOptions {
        materials: map,
        ..Default::default()
    };
    let text = obj::export(&load_net(), &opts).unwrap();
    let found = materials(&text);
    assert!(found.contains(&"asphalt"));
    assert!(found.contains(&"cobblestone"));
    assert!(!found.contains(&"other"));
}

#[test]
fn terrain_covers_the_dilated_network() {
    let net = load_net();
    let buffer = Distance::meters(2.0);
    let opts = ObjOptions {
        terrain: Some(TerrainOptions { buffer, z: -0.5 }),
        ..Default::default()
    };
    let objects = obj::network_objects(&net, &opts);
    let terrain = objects.iter().find(|o| o.name == "terrain").unwrap();
    assert_eq!(terrain.material, "terrain");
    assert!(terrain.vertices.iter().all(|v| v[2] == -0.5));

    let mut footprints: Vec<Polygon> = net.lanes().map(|l| l.shape.clone()).collect();
    footprints.extend(net.junctions.values().filter_map(|j| j.shape.clone()));
    let mut pieces = Vec::new();
    for p in Polygon::union_all(footprints) {
        pieces.extend(p.dilate(buffer));
    }
    let expected: f64 = Polygon::union_all(pieces).iter().map(|p| p.area()).sum();
    assert!(approx_eq(triangle_area(terrain), expected, 0.01));

    // The network is one 212m x 7m strip. Growing it by 2m adds a band around the sides and
    // rounded corners.
    let strip = 212.0 * 7.0 + 2.0 * 2.0 * (212.0 + 7.0) + std::f64::consts::PI * 4.0;
    assert!(approx_eq(expected, strip, strip * 0.01));
}

#[test]
fn extruded_polygons() {
    let net = load_net();
    let xml = r#"<additional>
        <poly id="house" type="building" fill="1" shape="0,10 10,10 10,20 0,20">
            <param key="levels_height" value="6"/>
            <param key="mat" value="brick"/>
        </poly>
        <poly id="park" type="park" fill="1" shape="20,10 30,10 30,20 20,20"/>
        <poly id="fence" type="fence" lineWidth="0.2" shape="0,30 10,30"/>
        <busStop id="bs" lane="in_0" startPos="40" endPos="60"/>
    </additional>"#;
    let add = Additionals::parse(xml, Some(&net), &mut Timer::throwaway()).unwrap();
    let opts = ObjOptions {
        poly_material_param: Some("mat".to_string()),
        poly_height_param: Some("levels_height".to_string()),
        stop_style: StopStyle::Usa,
        ..Default::default()
    };
    let objects = obj::additionals_objects(&add, &opts);

    let house = objects.iter().find(|o| o.name == "house").unwrap();
    assert_eq!(house.material, "brick");
    // The top face and four walls, with no bottom face by default
    assert_eq!(house.vertices.len(), 8);
    assert_eq!(house.faces.iter().filter(|f| f.len() == 4).count(), 4);
    assert!(house.vertices.iter().any(|v| v[2] == 6.0));

    let park = objects.iter().find(|o| o.name == "park").unwrap();
    assert_eq!(park.material, "park_poly");
    assert!(park.faces.iter().all(|f| f.len() == 3));

    let fence = objects.iter().find(|o| o.name == "fence").unwrap();
    assert_eq!(fence.material, "fence_poly");
    assert!(approx_eq(triangle_area(fence), 2.0, 1e-3));

    let area = objects.iter().find(|o| o.name == "busstop_area").unwrap();
    assert_eq!(area.material, "busstop_area");
    assert!(area.vertices.iter().all(|v| v[2] == 0.002));
    assert!(approx_eq(triangle_area(area), 70.0, 0.01));

    let markings = objects.iter().find(|o| o.name == "busstop_markings").unwrap();
    assert_eq!(markings.material, "white_markings");
    assert!(markings.vertices.iter().all(|v| v[2] == 0.003));

    let text = obj::export_additionals(&add, &opts).unwrap();
    assert_eq!(
        materials(&text),
        vec!["fence_poly", "brick", "park_poly", "busstop_area", "white_markings"]
    );
}

#[test]
fn bad_options_rejected() {
    let mut opts = ObjOptions::default();
    opts.lanes.extrude_height = -1.0;
    assert!(obj::export(&load_net(), &opts).is_err());

    let opts = ObjOptions {
        terrain: Some(TerrainOptions {
            buffer: Distance::meters(-1.0),
            z: 0.0,
        }),
        ..Default::default()
    };
    assert!(opts.validate().is_err());
}

#[test]
fn options_saved_and_loaded() {
    let mut opts = ObjOptions {
        terrain: Some(TerrainOptions {
            buffer: Distance::meters(3.0),
            z: -0.2,
        }),
        poly_height_param: Some("height".to_string()),
        ..Default::default()
    };
    opts.materials
        .0
        .insert("other".to_string(), "asphalt".to_string());
    opts.polygons.extrude_height = 2.5;

    let path = std::env::temp_dir().join("sumo_netvis_obj_options/opts.json");
    let path = path.to_str().unwrap();
    opts.save(path).unwrap();
    let loaded = ObjOptions::load(path).unwrap();
    assert_eq!(loaded, opts);
    assert_eq!(
        obj::export(&load_net(), &loaded).unwrap(),
        obj::export(&load_net(), &opts).unwrap()
    );
}

#[test]
fn options_from_json() {
    let opts: ObjOptions = serde_json::from_str(
        r#"{
            "terrain": { "buffer": 5.0 },
            "materials": { "junction": "asphalt" },
            "stop_areas": { "extrude_height": 0.15 }
        }"#,
    )
    .unwrap();
    let terrain = opts.terrain.unwrap();
    assert_eq!(terrain.buffer, Distance::meters(5.0));
    assert_eq!(terrain.z, -0.01);
    assert_eq!(opts.materials.get("junction"), "asphalt");
    assert_eq!(opts.stop_areas.extrude_height, 0.15);
}
