//! Vehicle trajectories from SUMO's
//! [floating car data](https://sumo.dlr.de/docs/Simulation/Output/FCDOutput.html) output.

use std::collections::BTreeMap;
use std::io::BufRead;

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use geom::{Angle, Bounds, Duration, PolyLine, Pt2D, Speed, Time};
use netutil::{prettyprint_usize, Timer};

use crate::net::parse_f64;
use crate::render::{Category, Drawing, RenderOptions, Shape, SourceID};
use crate::{Color, ColorMap, LaneID, ParseError};

/// Report progress this often while reading big files
const PROGRESS_BYTES: usize = 10 * 1024 * 1024;

/// One observation of an entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub time: Time,
    pub pos: Pt2D,
    /// In degrees, the way SUMO reports headings: 0 is north, growing clockwise.
    pub angle: f64,
    pub speed: Speed,
    pub lane: Option<LaneID>,
    pub slope: Option<f64>,
}

/// How to look up a time between two samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// The closest sample. Ties go to the earlier one.
    Nearest,
    /// Linear interpolation of position and speed. The angle turns the short way around; the
    /// lane comes from the earlier sample.
    Interpolate,
}

/// Numeric sample attributes that can drive a color map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attribute {
    Speed,
    Angle,
    Time,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AngleUnit {
    Degrees,
    Radians,
    Gradians,
}

impl AngleUnit {
    fn full_turn(self) -> f64 {
        match self {
            AngleUnit::Degrees => 360.0,
            AngleUnit::Radians => 2.0 * std::f64::consts::PI,
            AngleUnit::Gradians => 400.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Trajectory {
    pub id: String,
    samples: Vec<Sample>,
    // One per sample
    colors: Vec<Color>,
}

impl Trajectory {
    pub fn new<S: Into<String>>(id: S) -> Trajectory {
        Trajectory {
            id: id.into(),
            samples: Vec::new(),
            colors: Vec::new(),
        }
    }

    /// Samples must arrive in strictly increasing time order. New samples are black.
    pub fn push(&mut self, sample: Sample) -> Result<()> {
        if let Some(last) = self.samples.last() {
            if sample.time <= last.time {
                bail!(
                    "{} has a sample at {} after one at {}",
                    self.id,
                    sample.time,
                    last.time
                );
            }
        }
        self.samples.push(sample);
        self.colors.push(Color::BLACK);
        Ok(())
    }

    pub fn samples(&self) -> &Vec<Sample> {
        &self.samples
    }

    pub fn colors(&self) -> &Vec<Color> {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn start_time(&self) -> Option<Time> {
        self.samples.first().map(|s| s.time)
    }

    pub fn end_time(&self) -> Option<Time> {
        self.samples.last().map(|s| s.time)
    }

    pub fn get_bounds(&self) -> Bounds {
        let mut b = Bounds::new();
        for s in &self.samples {
            b.update(s.pos);
        }
        b
    }

    /// None outside of the first and last sample.
    pub fn at(&self, time: Time, lookup: Lookup) -> Option<Sample> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;
        if time < first.time || time > last.time {
            return None;
        }
        // The first sample at or after the time
        let idx = self.samples.partition_point(|s| s.time < time);
        let after = &self.samples[idx];
        if after.time == time || idx == 0 {
            return Some(after.clone());
        }
        let before = &self.samples[idx - 1];

        match lookup {
            Lookup::Nearest => {
                if time - before.time <= after.time - time {
                    Some(before.clone())
                } else {
                    Some(after.clone())
                }
            }
            Lookup::Interpolate => {
                let pct = time.percent_between(before.time, after.time);
                let from = Angle::from_navigational_degrees(before.angle);
                let to = Angle::from_navigational_degrees(after.angle);
                let angle = from
                    .rotate_degs(from.shortest_rotation_towards(to) * pct)
                    .to_navigational_degrees();
                Some(Sample {
                    time,
                    pos: before.pos.lerp(after.pos, pct),
                    angle,
                    speed: before.speed + (after.speed - before.speed) * pct,
                    lane: before.lane.clone(),
                    slope: match (before.slope, after.slope) {
                        (Some(a), Some(b)) => Some(a + (b - a) * pct),
                        _ => before.slope,
                    },
                })
            }
        }
    }

    /// The samples in `[start, end]`, with their colors.
    pub fn slice(&self, start: Time, end: Time) -> Trajectory {
        let mut result = Trajectory::new(self.id.clone());
        for (s, c) in self.samples.iter().zip(self.colors.iter()) {
            if s.time >= start && s.time <= end {
                result.samples.push(s.clone());
                result.colors.push(*c);
            }
        }
        result
    }

    pub fn assign_colors_constant(&mut self, color: Color) {
        self.colors = vec![color; self.samples.len()];
    }

    /// Colors each sample by where an attribute falls between `min` and `max`. Either bound
    /// defaults to the smallest or largest value in this trajectory.
    pub fn assign_colors_by(
        &mut self,
        attribute: Attribute,
        cmap: &ColorMap,
        min: Option<f64>,
        max: Option<f64>,
    ) {
        let values: Vec<f64> = self
            .samples
            .iter()
            .map(|s| match attribute {
                Attribute::Speed => s.speed.inner_meters_per_second(),
                Attribute::Angle => s.angle,
                Attribute::Time => s.time.inner_seconds(),
            })
            .collect();
        let min = min.unwrap_or_else(|| values.iter().cloned().fold(f64::INFINITY, f64::min));
        let max = max.unwrap_or_else(|| values.iter().cloned().fold(f64::NEG_INFINITY, f64::max));
        let range = max - min;
        self.colors = values
            .into_iter()
            .map(|x| {
                if range > 0.0 {
                    cmap.eval((x - min) / range)
                } else {
                    cmap.eval(0.0)
                }
            })
            .collect();
    }

    /// Viridis by default. The range defaults to 0 up to the fastest sample.
    pub fn assign_colors_speed(
        &mut self,
        cmap: Option<ColorMap>,
        min: Option<Speed>,
        max: Option<Speed>,
    ) {
        let min = min.unwrap_or(Speed::ZERO);
        self.assign_colors_by(
            Attribute::Speed,
            &cmap.unwrap_or(ColorMap::Viridis),
            Some(min.inner_meters_per_second()),
            max.map(|s| s.inner_meters_per_second()),
        );
    }

    /// Colors by heading around a full turn, so north and just west of north look alike. Uses a
    /// cyclic map by default. `unit` says how to read the sample angles.
    pub fn assign_colors_angle(&mut self, cmap: Option<ColorMap>, unit: AngleUnit) {
        let cmap = cmap.unwrap_or(ColorMap::Sinebow);
        let full = unit.full_turn();
        self.colors = self
            .samples
            .iter()
            .map(|s| cmap.eval(s.angle.rem_euclid(full) / full))
            .collect();
    }

    /// A distinct color per lane, in order of first appearance. `overrides` pins some lanes to a
    /// color. Samples without a lane share one category.
    pub fn assign_colors_lane(
        &mut self,
        cmap: Option<ColorMap>,
        overrides: Option<&BTreeMap<LaneID, Color>>,
    ) {
        let cmap = cmap.unwrap_or(ColorMap::Tableau10);
        let mut categories: Vec<Option<&LaneID>> = Vec::new();
        let mut colors = Vec::with_capacity(self.samples.len());
        for s in &self.samples {
            if let (Some(lane), Some(overrides)) = (s.lane.as_ref(), overrides) {
                if let Some(c) = overrides.get(lane) {
                    colors.push(*c);
                    continue;
                }
            }
            let key = s.lane.as_ref();
            let idx = match categories.iter().position(|x| *x == key) {
                Some(idx) => idx,
                None => {
                    categories.push(key);
                    categories.len() - 1
                }
            };
            colors.push(cmap.categorical(idx));
        }
        self.colors = colors;
    }

    /// One line per pair of consecutive samples that both fall in `[start, end]`, colored like the
    /// first sample. Positions are drawn as-is; `apply_offset` doesn't apply.
    pub fn render(&self, start: Time, end: Time, opts: &RenderOptions) -> Drawing {
        let mut draw = Drawing::new();
        for (idx, pair) in self.samples.windows(2).enumerate() {
            if pair[0].time < start || pair[1].time > end {
                continue;
            }
            let pl = match PolyLine::new(vec![pair[0].pos, pair[1].pos]) {
                Ok(pl) => pl,
                // Didn't move
                Err(_) => continue,
            };
            let shape = Shape::Line {
                pl,
                width: opts.trajectory_width,
            };
            if !opts.in_view(&shape.get_bounds()) {
                continue;
            }
            draw.push_styled(
                opts,
                Category::Trajectories,
                SourceID::Trajectory(self.id.clone()),
                shape,
                self.colors[idx],
            );
        }
        let extents = padded(draw.get_bounds());
        draw.finish_view(opts, extents);
        draw
    }
}

// 5% of the larger side on each side, so lines at the edge aren't cut off
fn padded(b: Bounds) -> Bounds {
    if b.is_empty() {
        return b;
    }
    b.pad(0.05 * b.width().max(b.height()))
}

/// Every trajectory from one FCD file, keyed by entity ID.
#[derive(Clone, Debug, Default)]
pub struct Trajectories {
    pub trajectories: BTreeMap<String, Trajectory>,
    /// The first and last timestep in the file
    pub start: Option<Time>,
    pub end: Option<Time>,
    /// The gap between the first two timesteps
    pub timestep: Option<Duration>,
    /// Samples skipped while reading, and why.
    pub diagnostics: Vec<ParseError>,
}

impl Trajectories {
    pub fn new() -> Trajectories {
        Trajectories::default()
    }

    /// Streams through a possibly huge fcd-output file.
    pub fn load_fcd(path: &str, timer: &mut Timer) -> Result<Trajectories> {
        timer.start(format!("read {}", path));
        let file = fs_err::File::open(path)?;
        let reader = Reader::from_reader(std::io::BufReader::new(file));
        let result = read_fcd(reader, timer).with_context(|| format!("reading {}", path));
        timer.stop(format!("read {}", path));
        result
    }

    pub fn parse_fcd(xml: &str) -> Result<Trajectories> {
        read_fcd(Reader::from_str(xml), &mut Timer::throwaway())
    }

    pub fn get(&self, id: &str) -> Option<&Trajectory> {
        self.trajectories.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Trajectory> {
        self.trajectories.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trajectory> {
        self.trajectories.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Trajectory> {
        self.trajectories.values_mut()
    }

    /// Replaces any trajectory with the same ID, and widens the time range to cover it.
    pub fn insert(&mut self, trajectory: Trajectory) {
        if let (Some(t1), Some(t2)) = (trajectory.start_time(), trajectory.end_time()) {
            self.start = Some(self.start.map_or(t1, |t| t.min(t1)));
            self.end = Some(self.end.map_or(t2, |t| t.max(t2)));
        }
        self.trajectories.insert(trajectory.id.clone(), trajectory);
    }

    /// Every trajectory's segments in `[start, end]`, in ID order.
    pub fn render(&self, start: Time, end: Time, opts: &RenderOptions) -> Drawing {
        let mut draw = Drawing::new();
        for t in self.trajectories.values() {
            draw.append(t.render(start, end, opts));
        }
        draw
    }

    /// Times from `start` to `end` inclusive, `step` apart. Without a step, the file's own
    /// timestep is used. Fails if there's no data or the step isn't positive.
    pub fn time_steps(&self, step: Option<Duration>) -> Result<TimeSteps> {
        let (start, end) = match (self.start, self.end) {
            (Some(start), Some(end)) => (start, end),
            _ => bail!("no samples, so no time range"),
        };
        let step = match step.or(self.timestep) {
            Some(step) => step,
            None => bail!("only one timestep; pass a step explicitly"),
        };
        if step <= Duration::ZERO {
            bail!("time step {} isn't positive", step);
        }
        Ok(TimeSteps {
            start,
            end,
            step,
            next: 0,
        })
    }
}

/// A lazy walk through a time range. Clone it to walk again from the same point, or `restart`.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSteps {
    start: Time,
    end: Time,
    step: Duration,
    next: usize,
}

impl TimeSteps {
    pub fn restart(&mut self) {
        self.next = 0;
    }

    /// How many times the walk produces in total.
    pub fn num_steps(&self) -> usize {
        ((self.end - self.start) / self.step + 1e-6).floor() as usize + 1
    }
}

impl Iterator for TimeSteps {
    type Item = Time;

    fn next(&mut self) -> Option<Time> {
        if self.next >= self.num_steps() {
            return None;
        }
        // Multiply instead of accumulating, so rounding doesn't drift
        let t = self.start + self.step * (self.next as f64);
        self.next += 1;
        Some(t)
    }
}

fn structural<S: Into<String>>(msg: S) -> anyhow::Error {
    ParseError::Structural(msg.into()).into()
}

fn read_fcd<R: BufRead>(mut reader: Reader<R>, timer: &mut Timer) -> Result<Trajectories> {
    reader.trim_text(true);

    let mut result = Trajectories::new();
    let mut seen_root = false;
    let mut current_time: Option<Time> = None;
    let mut num_samples = 0;
    let mut last_progress_byte = 0;
    let mut buf = Vec::new();
    loop {
        if reader.buffer_position() - last_progress_byte >= PROGRESS_BYTES {
            last_progress_byte = reader.buffer_position();
            debug!("Processed {} MB", last_progress_byte / (1024 * 1024));
        }

        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if !seen_root {
                    if name != "fcd-export" {
                        return Err(structural(format!(
                            "root element is <{}>, not <fcd-export>",
                            name
                        )));
                    }
                    seen_root = true;
                } else if name == "timestep" {
                    let attrs = attributes(&e)?;
                    let time = attrs
                        .get("time")
                        .ok_or_else(|| structural("<timestep> without a time"))
                        .and_then(|raw| {
                            parse_f64(raw).map_err(|err| structural(format!("bad time: {}", err)))
                        })
                        .map(Time::seconds)?;
                    // A timestep going back in time isn't fatal. Each sample in it is checked
                    // against its own trajectory by Trajectory::push.
                    match result.end {
                        Some(prev) if time <= prev => {
                            timer.warn(format!("timestep {} comes after {}", time, prev));
                        }
                        Some(prev) => {
                            if result.timestep.is_none() {
                                result.timestep = Some(time - prev);
                            }
                            result.end = Some(time);
                        }
                        None => {
                            result.end = Some(time);
                        }
                    }
                    result.start = Some(result.start.map_or(time, |t| t.min(time)));
                    current_time = Some(time);
                } else if name == "vehicle" || name == "person" {
                    let time = current_time
                        .ok_or_else(|| structural(format!("<{}> outside a <timestep>", name)))?;
                    let attrs = attributes(&e)?;
                    let id = match attrs.get("id") {
                        Some(id) => id.clone(),
                        None => return Err(structural(format!("<{}> without an id", name))),
                    };
                    let pushed = parse_sample(&attrs, time).and_then(|sample| {
                        result
                            .trajectories
                            .entry(id.clone())
                            .or_insert_with(|| Trajectory::new(id.clone()))
                            .push(sample)
                    });
                    match pushed {
                        Ok(()) => {
                            num_samples += 1;
                        }
                        Err(err) => {
                            result
                                .diagnostics
                                .push(ParseError::geometry(id, err.to_string()));
                        }
                    }
                }
            }
            Event::End(e) => {
                if e.name().as_ref() == b"timestep" {
                    current_time = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(structural("no <fcd-export> element"));
    }
    for diag in &result.diagnostics {
        timer.warn(diag.to_string());
    }
    timer.note(format!(
        "{} trajectories, {} samples, {} skipped",
        prettyprint_usize(result.trajectories.len()),
        prettyprint_usize(num_samples),
        prettyprint_usize(result.diagnostics.len())
    ));
    Ok(result)
}

fn attributes(e: &BytesStart) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        map.insert(key, attr.unescape_value()?.to_string());
    }
    Ok(map)
}

fn parse_sample(attrs: &BTreeMap<String, String>, time: Time) -> Result<Sample> {
    let number = |key: &str| -> Result<f64> {
        match attrs.get(key) {
            Some(raw) => parse_f64(raw).with_context(|| format!("bad {}", key)),
            None => bail!("missing {}", key),
        }
    };
    Ok(Sample {
        time,
        pos: Pt2D::new(number("x")?, number("y")?),
        angle: number("angle")?,
        speed: Speed::meters_per_second(number("speed")?),
        lane: attrs.get("lane").map(|x| LaneID(x.clone())),
        slope: attrs.get("slope").and_then(|x| parse_f64(x).ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_count_survives_rounding() {
        let steps = TimeSteps {
            start: Time::seconds(0.0),
            end: Time::seconds(1.0),
            step: Duration::seconds(0.1),
            next: 0,
        };
        assert_eq!(steps.num_steps(), 11);
        assert_eq!(steps.last(), Some(Time::seconds(1.0)));
    }

    #[test]
    fn padding() {
        let b = padded(Bounds::from_corners(0.0, 0.0, 100.0, 10.0));
        assert_eq!(b.min_x, -5.0);
        assert_eq!(b.max_y, 15.0);
    }
}
