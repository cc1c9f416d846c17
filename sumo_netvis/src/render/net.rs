use crate::render::{
    lane_markings, stop_line, Category, Drawing, Render, RenderOptions, Shape, SourceID,
};
use crate::{ColorScheme, Network};

impl Render for Network {
    fn render(&self, opts: &RenderOptions, cs: &ColorScheme) -> Drawing {
        let (dx, dy) = if opts.apply_offset {
            (-self.location.net_offset.x(), -self.location.net_offset.y())
        } else {
            (0.0, 0.0)
        };
        let mut draw = Drawing::new();

        for j in self.junctions.values() {
            let shape = match j.shape {
                Some(ref p) => p,
                None => continue,
            };
            if !opts.in_view(&shape.get_bounds().translate(dx, dy)) {
                continue;
            }
            draw.push_styled(
                opts,
                Category::Junctions,
                SourceID::Junction(j.id.clone()),
                Shape::Polygon(shape.clone()),
                cs.junction,
            );
        }

        for edge in self.edges.values() {
            for lane in &edge.lanes {
                if !opts.in_view(&lane.get_bounds().translate(dx, dy)) {
                    continue;
                }
                let source = SourceID::Lane(lane.id.clone());
                draw.push_styled(
                    opts,
                    Category::Lanes,
                    source.clone(),
                    Shape::Polygon(lane.shape.clone()),
                    cs.lane(lane.kind()),
                );

                for marking in lane_markings(edge, lane, opts.style, opts.stripe_width_scale) {
                    let color = marking.color.color(cs);
                    for p in marking.polygons {
                        draw.push_styled(
                            opts,
                            Category::LaneMarkings,
                            source.clone(),
                            Shape::Polygon(p),
                            color,
                        );
                    }
                }

                if opts.plot_stop_lines {
                    if let Some(p) = stop_line(self, edge, lane, opts.stripe_width_scale) {
                        draw.push_styled(
                            opts,
                            Category::StopLines,
                            source,
                            Shape::Polygon(p),
                            cs.stop_line,
                        );
                    }
                }
            }
        }

        draw.translate(dx, dy);
        draw.finish_view(opts, self.extents().translate(dx, dy));
        draw
    }
}
