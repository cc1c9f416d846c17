//! Edge-based [mean data](https://sumo.dlr.de/docs/Simulation/Output/Lane-_or_Edge-based_Traffic_Measures.html)
//! output: per-interval, per-edge traffic measures.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::{Context, Result};

use geom::Time;
use netutil::{slurp_file, Timer};

use crate::net::parse_f64;
use crate::{EdgeID, ParseError};

const FLOAT_MEASURES: [&str; 6] = [
    "sampledSeconds",
    "traveltime",
    "density",
    "occupancy",
    "waitingTime",
    "speed",
];
const INT_MEASURES: [&str; 6] = [
    "departed",
    "arrived",
    "entered",
    "left",
    "laneChangedFrom",
    "laneChangedTo",
];

#[derive(Clone, Debug, PartialEq)]
pub enum MeasureValue {
    Float(f64),
    Int(i64),
    /// Anything without a known type, or a known measure that failed to parse
    Text(String),
}

impl MeasureValue {
    fn parse(key: &str, value: &str) -> Result<MeasureValue> {
        if FLOAT_MEASURES.contains(&key) {
            Ok(MeasureValue::Float(parse_f64(value)?))
        } else if INT_MEASURES.contains(&key) {
            Ok(MeasureValue::Int(value.parse::<i64>()?))
        } else {
            Ok(MeasureValue::Text(value.to_string()))
        }
    }

    /// Numeric measures as a float. Text isn't parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MeasureValue::Float(x) => Some(*x),
            MeasureValue::Int(x) => Some(*x as f64),
            MeasureValue::Text(_) => None,
        }
    }
}

impl fmt::Display for MeasureValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MeasureValue::Float(x) => write!(f, "{}", x),
            MeasureValue::Int(x) => write!(f, "{}", x),
            MeasureValue::Text(x) => write!(f, "{}", x),
        }
    }
}

/// `[begin, end)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Interval {
    pub begin: Time,
    pub end: Time,
}

impl Interval {
    pub fn contains(&self, time: Time) -> bool {
        self.begin <= time && time < self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.begin.inner_seconds(),
            self.end.inner_seconds()
        )
    }
}

/// Every measure for one edge during one interval, keyed by attribute name.
pub type Measures = BTreeMap<String, MeasureValue>;

#[derive(Clone, Debug, Default)]
pub struct EdgeBasedMeasures {
    data: BTreeMap<Interval, BTreeMap<EdgeID, Measures>>,
}

impl EdgeBasedMeasures {
    /// Reads and merges several files. When files share an interval and edge, later values win.
    pub fn load(paths: &[&str], timer: &mut Timer) -> Result<EdgeBasedMeasures> {
        let mut measures = EdgeBasedMeasures::default();
        for path in paths {
            timer.start(format!("read {}", path));
            let bytes = slurp_file(path)?;
            let raw_string =
                std::str::from_utf8(&bytes).with_context(|| format!("reading {}", path))?;
            let result = measures.extend_from(raw_string, timer);
            timer.stop(format!("read {}", path));
            result.with_context(|| format!("parsing {}", path))?;
        }
        Ok(measures)
    }

    pub fn parse(xml: &str, timer: &mut Timer) -> Result<EdgeBasedMeasures> {
        let mut measures = EdgeBasedMeasures::default();
        measures.extend_from(xml, timer)?;
        Ok(measures)
    }

    /// Adds the contents of another `<meandata>` document. Values of known measures that don't
    /// parse are kept as text, with a warning.
    pub fn extend_from(&mut self, xml: &str, timer: &mut Timer) -> Result<()> {
        let tree = roxmltree::Document::parse(xml)
            .map_err(|err| structural(format!("invalid XML: {}", err)))?;
        let root = tree.root_element();
        if root.tag_name().name() != "meandata" {
            return Err(structural(format!(
                "root element is <{}>, not <meandata>",
                root.tag_name().name()
            )));
        }

        for node in root.children() {
            if !node.is_element() || node.tag_name().name() != "interval" {
                continue;
            }
            let interval = Interval {
                begin: Time::seconds(required_f64(node, "begin")?),
                end: Time::seconds(required_f64(node, "end")?),
            };
            if interval.end < interval.begin {
                return Err(structural(format!(
                    "interval ends before it begins: {}",
                    interval
                )));
            }
            let edges = self.data.entry(interval).or_insert_with(BTreeMap::new);

            for edge in node.children() {
                if !edge.is_element() || edge.tag_name().name() != "edge" {
                    continue;
                }
                let id = match edge.attribute("id") {
                    Some(id) => EdgeID(id.to_string()),
                    None => {
                        return Err(structural(format!("<edge> in {} without an id", interval)));
                    }
                };
                let measures = edges.entry(id.clone()).or_insert_with(BTreeMap::new);
                for attr in edge.attributes() {
                    let key = attr.name();
                    if key == "id" {
                        continue;
                    }
                    let value = match MeasureValue::parse(key, attr.value()) {
                        Ok(v) => v,
                        Err(err) => {
                            timer.warn(format!(
                                "{} in {}: {} = {} isn't a number ({}), keeping it as text",
                                id, interval, key, attr.value(), err
                            ));
                            MeasureValue::Text(attr.value().to_string())
                        }
                    };
                    measures.insert(key.to_string(), value);
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The interval containing `time`, with its data. If intervals overlap, the earliest wins.
    pub fn at(&self, time: Time) -> Option<(Interval, &BTreeMap<EdgeID, Measures>)> {
        self.data
            .iter()
            .find(|(interval, _)| interval.contains(time))
            .map(|(interval, edges)| (*interval, edges))
    }

    pub fn get(&self, time: Time, edge: &EdgeID, measure: &str) -> Option<&MeasureValue> {
        self.at(time)?.1.get(edge)?.get(measure)
    }

    /// In time order
    pub fn intervals(&self) -> impl Iterator<Item = Interval> + '_ {
        self.data.keys().cloned()
    }

    /// One row per interval and edge, one column per measure seen anywhere.
    pub fn to_table(&self) -> MeasureTable {
        let columns: BTreeSet<&String> = self
            .data
            .values()
            .flat_map(|edges| edges.values())
            .flat_map(|measures| measures.keys())
            .collect();
        let columns: Vec<String> = columns.into_iter().cloned().collect();

        let mut rows = Vec::new();
        for (interval, edges) in &self.data {
            for (edge, measures) in edges {
                rows.push(MeasureRow {
                    interval: *interval,
                    edge: edge.clone(),
                    values: columns.iter().map(|c| measures.get(c).cloned()).collect(),
                });
            }
        }
        MeasureTable { columns, rows }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeasureRow {
    pub interval: Interval,
    pub edge: EdgeID,
    /// Lines up with `MeasureTable::columns`. Missing measures are None.
    pub values: Vec<Option<MeasureValue>>,
}

/// Mean data flattened for spreadsheets and dataframes.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasureTable {
    pub columns: Vec<String>,
    pub rows: Vec<MeasureRow>,
}

impl MeasureTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Columns are `begin`, `end`, `edge`, then the measures. Missing values are empty.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut out = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut out);
            let mut header = vec!["begin".to_string(), "end".to_string(), "edge".to_string()];
            header.extend(self.columns.iter().cloned());
            writer.write_record(&header)?;
            for row in &self.rows {
                let mut record = vec![
                    row.interval.begin.inner_seconds().to_string(),
                    row.interval.end.inner_seconds().to_string(),
                    row.edge.0.clone(),
                ];
                record.extend(row.values.iter().map(|v| match v {
                    Some(v) => v.to_string(),
                    None => String::new(),
                }));
                writer.write_record(&record)?;
            }
            writer.flush()?;
        }
        Ok(String::from_utf8(out)?)
    }

    pub fn write_csv(&self, path: &str) -> Result<()> {
        let contents = self.to_csv_string()?;
        fs_err::write(path, contents)?;
        Ok(())
    }
}

fn structural<S: Into<String>>(msg: S) -> anyhow::Error {
    ParseError::Structural(msg.into()).into()
}

fn required_f64(node: roxmltree::Node, key: &str) -> Result<f64> {
    let value = node
        .attribute(key)
        .ok_or_else(|| structural(format!("<interval> is missing {}", key)))?;
    parse_f64(value).map_err(|err| structural(format!("<interval> {}: {}", key, err)))
}
