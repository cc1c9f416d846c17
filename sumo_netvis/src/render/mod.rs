//! Turns the models into colored, z-ordered 2D primitives. Plotting them is up to the caller.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use geom::{Bounds, Circle, Distance, PolyLine, Polygon};

use crate::{Color, ColorScheme, JunctionID, LaneID};

pub(crate) use self::markings::{lane_markings, stop_line, MarkingColor};
pub(crate) use self::stops::stop_geometry;

mod additionals;
mod markings;
mod net;
mod stops;

/// Things that can be drawn in one shot.
pub trait Render {
    fn render(&self, opts: &RenderOptions, cs: &ColorScheme) -> Drawing;
}

/// How lane markings look.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkingStyle {
    /// Yellow center lines, 3m dashes with 9m gaps
    Usa,
    /// White lines everywhere, 6m dashes with 12m gaps
    Eur,
}

impl MarkingStyle {
    /// (dash length, gap length) between lanes going the same way
    pub fn dashes(self) -> (Distance, Distance) {
        match self {
            MarkingStyle::Usa => (Distance::meters(3.0), Distance::meters(9.0)),
            MarkingStyle::Eur => (Distance::meters(6.0), Distance::meters(12.0)),
        }
    }
}

/// How bus stops and their relatives are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopStyle {
    /// A green band along the curb, like sumo-gui
    Sumo,
    /// A white zig-zag line
    Ger,
    /// A yellow dashed box inside the lane
    Uk,
    /// The lane slice filled in, with a white outline
    Usa,
}

/// Per-category drawing settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryStyle {
    pub visible: bool,
    /// Multiplies the alpha of every color in the category. In [0, 1].
    pub opacity: f32,
    /// Overrides the color scheme for everything in the category.
    pub color: Option<Color>,
    pub zorder: f64,
}

impl Default for CategoryStyle {
    fn default() -> CategoryStyle {
        CategoryStyle {
            visible: true,
            opacity: 1.0,
            color: None,
            zorder: 0.0,
        }
    }
}

impl CategoryStyle {
    fn at(zorder: f64) -> CategoryStyle {
        CategoryStyle {
            zorder,
            ..Default::default()
        }
    }

    fn color(&self, default: Color) -> Color {
        let c = self.color.unwrap_or(default);
        c.alpha(c.a * self.opacity)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub style: MarkingStyle,
    pub stop_style: StopStyle,
    /// Scales every stripe: lane markings are 0.1m times this, stop lines 0.5m.
    pub stripe_width_scale: f64,
    /// Only draw things whose bounding box touches `view`.
    pub clip_to_limits: bool,
    /// Set `Drawing::view` to the extents of what was drawn. Ignored when clipping.
    pub zoom_to_extents: bool,
    pub plot_stop_lines: bool,
    /// Shift everything back into the original projected coordinates, undoing `netOffset`.
    pub apply_offset: bool,
    pub view: Option<Bounds>,
    pub poi_radius: Distance,
    pub trajectory_width: Distance,

    pub lanes: CategoryStyle,
    pub lane_markings: CategoryStyle,
    pub junctions: CategoryStyle,
    pub stop_lines: CategoryStyle,
    /// The z-order here is added to each polygon's own layer.
    pub polygons: CategoryStyle,
    /// The z-order here is added to each POI's own layer.
    pub pois: CategoryStyle,
    pub stop_areas: CategoryStyle,
    pub stop_markings: CategoryStyle,
    pub trajectories: CategoryStyle,
}

impl Default for RenderOptions {
    fn default() -> RenderOptions {
        RenderOptions {
            style: MarkingStyle::Usa,
            stop_style: StopStyle::Sumo,
            stripe_width_scale: 1.0,
            clip_to_limits: false,
            zoom_to_extents: true,
            plot_stop_lines: false,
            apply_offset: false,
            view: None,
            poi_radius: Distance::meters(1.0),
            trajectory_width: Distance::meters(0.5),

            junctions: CategoryStyle::at(-110.0),
            lanes: CategoryStyle::at(-100.0),
            stop_areas: CategoryStyle::at(-96.0),
            stop_markings: CategoryStyle::at(-94.0),
            lane_markings: CategoryStyle::at(-90.0),
            stop_lines: CategoryStyle::at(-90.0),
            polygons: CategoryStyle::default(),
            pois: CategoryStyle::default(),
            trajectories: CategoryStyle::default(),
        }
    }
}

impl RenderOptions {
    /// Reads options from JSON. Missing fields keep their defaults.
    pub fn load(path: &str) -> Result<RenderOptions> {
        let opts: RenderOptions = netutil::read_json(path)?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        netutil::write_json(path, self)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.stripe_width_scale.is_finite() || self.stripe_width_scale <= 0.0 {
            bail!(
                "stripe_width_scale must be positive, not {}",
                self.stripe_width_scale
            );
        }
        if self.clip_to_limits && self.view.is_none() {
            bail!("clip_to_limits needs a view");
        }
        if let Some(ref view) = self.view {
            if view.is_empty() {
                bail!("the view is empty");
            }
        }
        if self.poi_radius <= Distance::ZERO || self.trajectory_width <= Distance::ZERO {
            bail!("poi_radius and trajectory_width must be positive");
        }
        for (name, style) in [
            ("lanes", &self.lanes),
            ("lane_markings", &self.lane_markings),
            ("junctions", &self.junctions),
            ("stop_lines", &self.stop_lines),
            ("polygons", &self.polygons),
            ("pois", &self.pois),
            ("stop_areas", &self.stop_areas),
            ("stop_markings", &self.stop_markings),
            ("trajectories", &self.trajectories),
        ] {
            if !(0.0..=1.0).contains(&style.opacity) {
                bail!("{} has opacity {}, which isn't in [0, 1]", name, style.opacity);
            }
        }
        Ok(())
    }

    pub(crate) fn style(&self, category: Category) -> &CategoryStyle {
        match category {
            Category::Lanes => &self.lanes,
            Category::LaneMarkings => &self.lane_markings,
            Category::Junctions => &self.junctions,
            Category::StopLines => &self.stop_lines,
            Category::Polygons => &self.polygons,
            Category::Pois => &self.pois,
            Category::StopAreas => &self.stop_areas,
            Category::StopMarkings => &self.stop_markings,
            Category::Trajectories => &self.trajectories,
        }
    }

    /// Should something with these bounds, in output coordinates, be drawn at all?
    pub(crate) fn in_view(&self, bounds: &Bounds) -> bool {
        match (self.clip_to_limits, &self.view) {
            (true, Some(view)) => view.intersects(bounds),
            _ => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Lanes,
    LaneMarkings,
    Junctions,
    StopLines,
    Polygons,
    Pois,
    StopAreas,
    StopMarkings,
    Trajectories,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Lanes,
        Category::LaneMarkings,
        Category::Junctions,
        Category::StopLines,
        Category::Polygons,
        Category::Pois,
        Category::StopAreas,
        Category::StopMarkings,
        Category::Trajectories,
    ];
}

/// Unique within one `Drawing`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrimitiveID(pub usize);

/// The model object a primitive was drawn for.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceID {
    Lane(LaneID),
    Junction(JunctionID),
    Poly(String),
    Poi(String),
    Stop(String),
    Trajectory(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Polygon(Polygon),
    /// A line with a width in map units, not screen pixels
    Line { pl: PolyLine, width: Distance },
    Circle(Circle),
}

impl Shape {
    pub fn get_bounds(&self) -> Bounds {
        match self {
            Shape::Polygon(p) => p.get_bounds(),
            Shape::Line { pl, width } => pl.get_bounds().pad(width.inner_meters() / 2.0),
            Shape::Circle(c) => c.get_bounds(),
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Shape {
        match self {
            Shape::Polygon(p) => Shape::Polygon(p.translate(dx, dy)),
            Shape::Line { pl, width } => Shape::Line {
                pl: pl.translate(dx, dy),
                width: *width,
            },
            Shape::Circle(c) => Shape::Circle(c.translate(dx, dy)),
        }
    }

    /// Fills the shape in, for backends that only draw polygons.
    pub fn to_polygon(&self) -> Result<Polygon> {
        match self {
            Shape::Polygon(p) => Ok(p.clone()),
            Shape::Line { pl, width } => pl.make_polygons(*width),
            Shape::Circle(c) => c.to_polygon(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Primitive {
    pub id: PrimitiveID,
    pub source: SourceID,
    pub shape: Shape,
    pub color: Color,
    /// Higher is drawn on top
    pub zorder: f64,
}

/// Everything one render call produced, grouped by category.
#[derive(Clone, Debug, Default)]
pub struct Drawing {
    pub lanes: Vec<Primitive>,
    pub lane_markings: Vec<Primitive>,
    pub junctions: Vec<Primitive>,
    pub stop_lines: Vec<Primitive>,
    pub polygons: Vec<Primitive>,
    pub pois: Vec<Primitive>,
    pub stop_areas: Vec<Primitive>,
    pub stop_markings: Vec<Primitive>,
    pub trajectories: Vec<Primitive>,
    /// What the caller should zoom to, if anything.
    pub view: Option<Bounds>,

    sources: BTreeMap<PrimitiveID, SourceID>,
    next_id: usize,
}

impl Drawing {
    pub fn new() -> Drawing {
        Drawing::default()
    }

    pub fn get(&self, category: Category) -> &Vec<Primitive> {
        match category {
            Category::Lanes => &self.lanes,
            Category::LaneMarkings => &self.lane_markings,
            Category::Junctions => &self.junctions,
            Category::StopLines => &self.stop_lines,
            Category::Polygons => &self.polygons,
            Category::Pois => &self.pois,
            Category::StopAreas => &self.stop_areas,
            Category::StopMarkings => &self.stop_markings,
            Category::Trajectories => &self.trajectories,
        }
    }

    fn get_mut(&mut self, category: Category) -> &mut Vec<Primitive> {
        match category {
            Category::Lanes => &mut self.lanes,
            Category::LaneMarkings => &mut self.lane_markings,
            Category::Junctions => &mut self.junctions,
            Category::StopLines => &mut self.stop_lines,
            Category::Polygons => &mut self.polygons,
            Category::Pois => &mut self.pois,
            Category::StopAreas => &mut self.stop_areas,
            Category::StopMarkings => &mut self.stop_markings,
            Category::Trajectories => &mut self.trajectories,
        }
    }

    /// Adds a primitive with the color and z-order already decided.
    pub fn push(
        &mut self,
        category: Category,
        source: SourceID,
        shape: Shape,
        color: Color,
        zorder: f64,
    ) -> PrimitiveID {
        let id = PrimitiveID(self.next_id);
        self.next_id += 1;
        self.sources.insert(id, source.clone());
        self.get_mut(category).push(Primitive {
            id,
            source,
            shape,
            color,
            zorder,
        });
        id
    }

    /// Adds a primitive styled by the category, unless the category is hidden.
    pub(crate) fn push_styled(
        &mut self,
        opts: &RenderOptions,
        category: Category,
        source: SourceID,
        shape: Shape,
        default_color: Color,
    ) {
        let style = opts.style(category);
        if !style.visible {
            return;
        }
        self.push(
            category,
            source,
            shape,
            style.color(default_color),
            style.zorder,
        );
    }

    /// Every primitive, in category order.
    pub fn all(&self) -> impl Iterator<Item = &Primitive> {
        Category::ALL.into_iter().flat_map(move |c| self.get(c).iter())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn source_of(&self, id: PrimitiveID) -> Option<&SourceID> {
        self.sources.get(&id)
    }

    /// All primitives drawn for one model object.
    pub fn primitives_of(&self, source: &SourceID) -> Vec<PrimitiveID> {
        self.sources
            .iter()
            .filter(|(_, s)| *s == source)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Moves everything from another drawing into this one. The other drawing's primitives get
    /// new IDs. The views are merged.
    pub fn append(&mut self, mut other: Drawing) {
        for category in Category::ALL {
            for p in std::mem::take(other.get_mut(category)) {
                self.push(category, p.source, p.shape, p.color, p.zorder);
            }
        }
        self.view = match (self.view, other.view) {
            (Some(mut a), Some(b)) => {
                a.union(b);
                Some(a)
            }
            (a, b) => a.or(b),
        };
    }

    /// The bounds of every primitive.
    pub fn get_bounds(&self) -> Bounds {
        let mut b = Bounds::new();
        for p in self.all() {
            b.union(p.shape.get_bounds());
        }
        b
    }

    pub(crate) fn translate(&mut self, dx: f64, dy: f64) {
        for category in Category::ALL {
            for p in self.get_mut(category) {
                p.shape = p.shape.translate(dx, dy);
            }
        }
        self.view = self.view.map(|b| b.translate(dx, dy));
    }

    /// Sets the view once everything is pushed and translated. `extents` must already be in
    /// output coordinates.
    pub(crate) fn finish_view(&mut self, opts: &RenderOptions, extents: Bounds) {
        if opts.clip_to_limits {
            self.view = opts.view;
        } else if opts.zoom_to_extents && !extents.is_empty() {
            self.view = Some(extents);
        }
    }
}
