use geom::Circle;

use crate::render::{stop_geometry, Category, Drawing, Render, RenderOptions, Shape, SourceID};
use crate::{Additionals, ColorScheme, PolyShape};

// sumo-gui draws layers at or below 0 under the road network, and the rest above it.
fn layer_zorder(layer: f64) -> f64 {
    if layer <= 0.0 {
        layer - 110.0
    } else {
        layer - 90.0
    }
}

impl Render for Additionals {
    fn render(&self, opts: &RenderOptions, cs: &ColorScheme) -> Drawing {
        let (dx, dy) = if opts.apply_offset {
            (-self.net_offset.x(), -self.net_offset.y())
        } else {
            (0.0, 0.0)
        };
        let mut draw = Drawing::new();

        if opts.polygons.visible {
            for poly in self.polys.values() {
                let shape = match poly.shape {
                    PolyShape::Filled(ref p) => Shape::Polygon(p.clone()),
                    PolyShape::Outline(ref pl) => Shape::Line {
                        pl: pl.clone(),
                        width: poly.line_width,
                    },
                };
                if !opts.in_view(&shape.get_bounds().translate(dx, dy)) {
                    continue;
                }
                draw.push(
                    Category::Polygons,
                    SourceID::Poly(poly.id.clone()),
                    shape,
                    opts.polygons.color(poly.color.unwrap_or(cs.default_poly)),
                    layer_zorder(poly.layer) + opts.polygons.zorder,
                );
            }
        }

        if opts.pois.visible {
            for poi in self.pois.values() {
                // Lat/lon POIs have nowhere to go
                let pos = match poi.pos {
                    Some(pt) => pt,
                    None => continue,
                };
                let shape = Shape::Circle(Circle::new(pos, opts.poi_radius));
                if !opts.in_view(&shape.get_bounds().translate(dx, dy)) {
                    continue;
                }
                draw.push(
                    Category::Pois,
                    SourceID::Poi(poi.id.clone()),
                    shape,
                    opts.pois.color(poi.color.unwrap_or(cs.default_poi)),
                    layer_zorder(poi.layer) + opts.pois.zorder,
                );
            }
        }

        let style = opts.stop_style;
        for stop in self.stops.values() {
            let geometry = stop_geometry(stop, style);
            let source = SourceID::Stop(stop.id.clone());
            if let Some(area) = geometry.area {
                if opts.stop_areas.visible && opts.in_view(&area.get_bounds().translate(dx, dy)) {
                    draw.push(
                        Category::StopAreas,
                        source.clone(),
                        Shape::Polygon(area),
                        opts.stop_areas.color(style.area_color(cs)),
                        opts.stop_areas.zorder + style.area_zorder_offset(),
                    );
                }
            }
            for marking in geometry.markings {
                if opts.in_view(&marking.get_bounds().translate(dx, dy)) {
                    draw.push_styled(
                        opts,
                        Category::StopMarkings,
                        source.clone(),
                        Shape::Polygon(marking),
                        style.marking_color(cs),
                    );
                }
            }
        }

        draw.translate(dx, dy);
        let extents = draw.get_bounds();
        draw.finish_view(opts, extents);
        draw
    }
}
