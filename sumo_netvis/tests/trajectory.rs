use std::collections::BTreeMap;

use geom::{Duration, Speed, Time};
use sumo_netvis::{
    AngleUnit, Category, Color, ColorMap, LaneID, Lookup, ParseError, RenderOptions, Sample,
    Trajectories, Trajectory,
};

const FCD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<fcd-export xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <timestep time="0.00">
        <vehicle id="car" x="0.00" y="0.00" angle="90.00" type="DEFAULT_VEHTYPE" speed="10.00" pos="5.10" lane="in_0" slope="0.00"/>
        <person id="ped" x="50.00" y="5.00" angle="0.00" speed="1.20" pos="0.00" edge="in" slope="0.00"/>
    </timestep>
    <timestep time="1.00">
        <vehicle id="car" x="10.00" y="0.00" angle="90.00" type="DEFAULT_VEHTYPE" speed="12.00" pos="15.10" lane="in_0" slope="0.00"/>
        <vehicle id="broken" x="3.00" y="3.00" angle="90.00"/>
        <person id="ped" x="50.00" y="6.20" angle="0.00" speed="1.20" pos="1.20" edge="in" slope="0.00"/>
    </timestep>
    <timestep time="2.00">
        <vehicle id="car" x="22.00" y="0.00" angle="80.00" type="DEFAULT_VEHTYPE" speed="14.00" pos="27.10" lane="in_1" slope="0.00"/>
    </timestep>
</fcd-export>
"#;

fn load() -> Trajectories {
    Trajectories::parse_fcd(FCD).unwrap()
}

#[test]
fn parse() {
    let trajectories = load();
    assert_eq!(trajectories.len(), 2);
    assert_eq!(trajectories.start, Some(Time::seconds(0.0)));
    assert_eq!(trajectories.end, Some(Time::seconds(2.0)));
    assert_eq!(trajectories.timestep, Some(Duration::seconds(1.0)));

    let car = trajectories.get("car").unwrap();
    assert_eq!(car.len(), 3);
    assert_eq!(car.samples()[1].speed, Speed::meters_per_second(12.0));
    assert_eq!(car.samples()[2].lane, Some(LaneID("in_1".to_string())));
    let ped = trajectories.get("ped").unwrap();
    assert_eq!(ped.len(), 2);
    assert_eq!(ped.end_time(), Some(Time::seconds(1.0)));

    // The vehicle without a speed is skipped, not fatal
    assert!(trajectories.get("broken").is_none());
    assert_eq!(trajectories.diagnostics.len(), 1);
    assert_eq!(trajectories.diagnostics[0].id(), Some("broken"));
}

#[test]
fn lookup() {
    let trajectories = load();
    let car = trajectories.get("car").unwrap();

    let mid = car.at(Time::seconds(0.5), Lookup::Interpolate).unwrap();
    assert_eq!(mid.pos.x(), 5.0);
    assert_eq!(mid.speed, Speed::meters_per_second(11.0));
    assert_eq!(mid.lane, Some(LaneID("in_0".to_string())));

    let turning = car.at(Time::seconds(1.5), Lookup::Interpolate).unwrap();
    assert!((turning.angle - 85.0).abs() < 1e-3);

    let nearest = car.at(Time::seconds(1.4), Lookup::Nearest).unwrap();
    assert_eq!(nearest.time, Time::seconds(1.0));
    // Ties go to the earlier sample
    let tie = car.at(Time::seconds(0.5), Lookup::Nearest).unwrap();
    assert_eq!(tie.time, Time::seconds(0.0));

    let exact = car.at(Time::seconds(2.0), Lookup::Interpolate).unwrap();
    assert_eq!(exact.pos.x(), 22.0);

    assert!(car.at(Time::seconds(-1.0), Lookup::Nearest).is_none());
    assert!(car.at(Time::seconds(2.5), Lookup::Interpolate).is_none());
}

#[test]
fn angle_wraps_around_north() {
    let mut t = Trajectory::new("spinner");
    for (time, angle) in [(0.0, 350.0), (1.0, 10.0)] {
        t.push(Sample {
            time: Time::seconds(time),
            pos: geom::Pt2D::new(time, 0.0),
            angle,
            speed: Speed::ZERO,
            lane: None,
            slope: None,
        })
        .unwrap();
    }
    let mid = t.at(Time::seconds(0.5), Lookup::Interpolate).unwrap();
    // The short way around, through north
    assert!(mid.angle < 1e-3 || mid.angle > 360.0 - 1e-3);
}

#[test]
fn samples_must_move_forward_in_time() {
    let mut t = Trajectory::new("x");
    let sample = |time: f64| Sample {
        time: Time::seconds(time),
        pos: geom::Pt2D::new(0.0, 0.0),
        angle: 0.0,
        speed: Speed::ZERO,
        lane: None,
        slope: None,
    };
    t.push(sample(1.0)).unwrap();
    assert!(t.push(sample(1.0)).is_err());
    assert!(t.push(sample(0.5)).is_err());
    assert_eq!(t.len(), 1);
    assert_eq!(t.colors().len(), 1);
}

#[test]
fn timesteps_out_of_order() {
    let xml = r#"<fcd-export>
        <timestep time="0">
            <vehicle id="a" x="0" y="0" angle="90" speed="1"/>
        </timestep>
        <timestep time="2">
            <vehicle id="a" x="2" y="0" angle="90" speed="1"/>
        </timestep>
        <timestep time="1">
            <vehicle id="a" x="1" y="0" angle="90" speed="1"/>
            <vehicle id="b" x="5" y="5" angle="0" speed="3"/>
        </timestep>
        <timestep time="2">
            <vehicle id="b" x="5" y="8" angle="0" speed="3"/>
        </timestep>
    </fcd-export>"#;
    let trajectories = Trajectories::parse_fcd(xml).unwrap();

    // Only the sample going back in time for "a" is dropped
    let a = trajectories.get("a").unwrap();
    let times: Vec<Time> = a.samples().iter().map(|s| s.time).collect();
    assert_eq!(times, vec![Time::seconds(0.0), Time::seconds(2.0)]);
    let b = trajectories.get("b").unwrap();
    assert_eq!(b.len(), 2);
    assert_eq!(b.start_time(), Some(Time::seconds(1.0)));

    assert_eq!(trajectories.diagnostics.len(), 1);
    assert_eq!(trajectories.diagnostics[0].id(), Some("a"));
    assert!(trajectories.diagnostics[0].is_geometry());

    assert_eq!(trajectories.start, Some(Time::seconds(0.0)));
    assert_eq!(trajectories.end, Some(Time::seconds(2.0)));
    assert_eq!(trajectories.timestep, Some(Duration::seconds(2.0)));
}

#[test]
fn time_steps() {
    let trajectories = load();
    let mut steps = trajectories.time_steps(None).unwrap();
    assert_eq!(steps.num_steps(), 3);
    let copy = steps.clone();

    let times: Vec<Time> = steps.by_ref().collect();
    assert_eq!(
        times,
        vec![Time::seconds(0.0), Time::seconds(1.0), Time::seconds(2.0)]
    );
    assert_eq!(steps.next(), None);

    // Starting over gives the same sequence
    steps.restart();
    assert_eq!(steps.collect::<Vec<_>>(), times);
    assert_eq!(copy.collect::<Vec<_>>(), times);

    let fine = trajectories
        .time_steps(Some(Duration::seconds(0.25)))
        .unwrap();
    assert_eq!(fine.count(), 9);

    assert!(trajectories.time_steps(Some(Duration::ZERO)).is_err());
    assert!(Trajectories::new().time_steps(None).is_err());
}

#[test]
fn color_assignment_is_idempotent() {
    let mut trajectories = load();
    let car = trajectories.get_mut("car").unwrap();

    car.assign_colors_speed(None, None, None);
    let first = car.colors().clone();
    car.assign_colors_speed(None, None, None);
    assert_eq!(&first, car.colors());
    // The fastest sample is at the top of the map
    assert_eq!(first[2], ColorMap::Viridis.eval(1.0));

    car.assign_colors_angle(None, AngleUnit::Degrees);
    let by_angle = car.colors().clone();
    car.assign_colors_angle(None, AngleUnit::Degrees);
    assert_eq!(&by_angle, car.colors());
    assert_eq!(by_angle[0], by_angle[1]);

    car.assign_colors_lane(None, None);
    let by_lane = car.colors().clone();
    assert_eq!(by_lane[0], ColorMap::Tableau10.categorical(0));
    assert_eq!(by_lane[0], by_lane[1]);
    assert_eq!(by_lane[2], ColorMap::Tableau10.categorical(1));

    let mut overrides = BTreeMap::new();
    overrides.insert(LaneID("in_1".to_string()), Color::RED);
    car.assign_colors_lane(None, Some(&overrides));
    assert_eq!(car.colors()[2], Color::RED);

    car.assign_colors_constant(Color::BLUE);
    assert!(car.colors().iter().all(|c| *c == Color::BLUE));
}

#[test]
fn render() {
    let trajectories = load();
    let opts = RenderOptions::default();

    let draw = trajectories.render(Time::seconds(0.0), Time::seconds(2.0), &opts);
    // Two segments for the car, one for the pedestrian
    assert_eq!(draw.get(Category::Trajectories).len(), 3);
    let view = draw.view.unwrap();
    assert!(view.min_x < 0.0);
    assert!(view.max_x > 50.0);

    let draw = trajectories.render(Time::seconds(1.0), Time::seconds(2.0), &opts);
    assert_eq!(draw.get(Category::Trajectories).len(), 1);

    let car = trajectories.get("car").unwrap();
    let later = car.slice(Time::seconds(1.0), Time::seconds(2.0));
    assert_eq!(later.len(), 2);
    assert_eq!(later.colors().len(), 2);
}

#[test]
fn structural_failures() {
    for xml in [
        "<net/>",
        r#"<fcd-export><vehicle id="a" x="0" y="0" angle="0" speed="0"/></fcd-export>"#,
        r#"<fcd-export><timestep/></fcd-export>"#,
    ] {
        let err = Trajectories::parse_fcd(xml).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ParseError>(),
            Some(ParseError::Structural(_))
        ));
    }
}
