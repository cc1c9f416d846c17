use geom::Time;
use netutil::Timer;
use sumo_netvis::{EdgeBasedMeasures, EdgeID, MeasureValue, ParseError};

const MEAN_DATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<meandata xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <interval begin="60.00" end="120.00" id="edgeData">
        <edge id="in" sampledSeconds="90.00" traveltime="8.10" density="4.20" occupancy="2.10" waitingTime="0.00" speed="12.30" departed="0" arrived="0" entered="3" left="3" laneChangedFrom="1" laneChangedTo="1"/>
        <edge id="out" sampledSeconds="45.00" speed="13.00" entered="2" left="2"/>
    </interval>
    <interval begin="0.00" end="60.00" id="edgeData">
        <edge id="in" sampledSeconds="30.00" speed="11.00" entered="1" left="0" speedRelative="0.79"/>
    </interval>
</meandata>
"#;

#[test]
fn lookup_by_time() {
    let measures = EdgeBasedMeasures::parse(MEAN_DATA, &mut Timer::throwaway()).unwrap();

    // In time order, no matter the order in the file
    let intervals: Vec<(f64, f64)> = measures
        .intervals()
        .map(|i| (i.begin.inner_seconds(), i.end.inner_seconds()))
        .collect();
    assert_eq!(intervals, vec![(0.0, 60.0), (60.0, 120.0)]);

    let (interval, edges) = measures.at(Time::seconds(60.0)).unwrap();
    assert_eq!(interval.begin, Time::seconds(60.0));
    assert_eq!(edges.len(), 2);
    let inbound = &edges[&EdgeID("in".to_string())];
    assert_eq!(inbound["speed"], MeasureValue::Float(12.3));
    assert_eq!(inbound["entered"], MeasureValue::Int(3));
    assert_eq!(inbound["laneChangedTo"], MeasureValue::Int(1));

    let early = measures
        .get(Time::seconds(59.9), &EdgeID("in".to_string()), "speedRelative")
        .unwrap();
    assert_eq!(early, &MeasureValue::Text("0.79".to_string()));
    assert_eq!(early.as_f64(), None);

    assert!(measures.at(Time::seconds(120.0)).is_none());
    assert!(measures.at(Time::seconds(-1.0)).is_none());
}

#[test]
fn table() {
    let measures = EdgeBasedMeasures::parse(MEAN_DATA, &mut Timer::throwaway()).unwrap();
    let table = measures.to_table();

    // One row per interval and edge
    assert_eq!(table.rows.len(), 3);
    // Every measure seen anywhere
    assert_eq!(table.columns.len(), 13);
    assert!(table.rows.iter().all(|r| r.values.len() == 13));

    let speed = table.column("speed").unwrap();
    let relative = table.column("speedRelative").unwrap();
    let first = &table.rows[0];
    assert_eq!(first.edge, EdgeID("in".to_string()));
    assert_eq!(first.values[speed], Some(MeasureValue::Float(11.0)));
    // Only the first interval has this one
    assert!(table.rows[1].values[relative].is_none());

    let csv = table.to_csv_string().unwrap();
    let mut lines = csv.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("begin,end,edge,"));
    assert_eq!(header.split(',').count(), 16);
    assert_eq!(lines.count(), 3);
}

#[test]
fn merge_files() {
    let mut measures = EdgeBasedMeasures::parse(MEAN_DATA, &mut Timer::throwaway()).unwrap();
    measures
        .extend_from(
            r#"<meandata>
                <interval begin="0" end="60">
                    <edge id="in" speed="9.5"/>
                    <edge id="side" speed="5"/>
                </interval>
            </meandata>"#,
            &mut Timer::throwaway(),
        )
        .unwrap();

    assert_eq!(measures.intervals().count(), 2);
    let (_, edges) = measures.at(Time::seconds(0.0)).unwrap();
    assert_eq!(edges.len(), 2);
    let inbound = &edges[&EdgeID("in".to_string())];
    // The later file wins, but measures it doesn't mention are kept
    assert_eq!(inbound["speed"], MeasureValue::Float(9.5));
    assert_eq!(inbound["entered"], MeasureValue::Int(1));
}

#[test]
fn bad_values_kept_as_text() {
    let mut timer = Timer::throwaway();
    let measures = EdgeBasedMeasures::parse(
        r#"<meandata><interval begin="0" end="60"><edge id="a" entered="lots"/></interval></meandata>"#,
        &mut timer,
    )
    .unwrap();
    assert_eq!(
        measures.get(Time::seconds(1.0), &EdgeID("a".to_string()), "entered"),
        Some(&MeasureValue::Text("lots".to_string()))
    );
    assert_eq!(timer.warnings().len(), 1);
}

#[test]
fn structural_failures() {
    for xml in [
        "<net/>",
        r#"<meandata><interval end="60"/></meandata>"#,
        r#"<meandata><interval begin="60" end="0"/></meandata>"#,
        r#"<meandata><interval begin="0" end="60"><edge speed="1"/></interval></meandata>"#,
        "<meandata>",
    ] {
        let err = EdgeBasedMeasures::parse(xml, &mut Timer::throwaway())
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<ParseError>(),
            Some(ParseError::Structural(_))
        ));
    }
}
