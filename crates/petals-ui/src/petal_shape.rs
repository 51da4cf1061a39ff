//! Petal geometry and the egui-backed petal surface.
//!
//! The outline is four cubic segments in a 100x120 view box, which maps onto
//! a `size` x `1.2 * size` box centered on the sprite position. Rotation is
//! about that center.

use egui::epaint::{CubicBezierShape, Mesh};
use egui::{emath::Rot2, Color32, Painter, Pos2, Shape, Stroke, Vec2};
use petals_platform::{PetalSprite, PetalSurface, Result};

const VIEW_BOX: Vec2 = Vec2::new(100.0, 120.0);
const FLATTEN_TOLERANCE: f32 = 0.05;

type Segment = [[f32; 2]; 4];

const OUTLINE: [Segment; 4] = [
    [[50.0, 10.0], [65.0, 15.0], [85.0, 35.0], [90.0, 65.0]],
    [[90.0, 65.0], [95.0, 95.0], [75.0, 110.0], [50.0, 110.0]],
    [[50.0, 110.0], [25.0, 110.0], [5.0, 95.0], [10.0, 65.0]],
    [[10.0, 65.0], [15.0, 35.0], [35.0, 15.0], [50.0, 10.0]],
];

const VELVET: [Segment; 4] = [
    [[50.0, 15.0], [65.0, 20.0], [80.0, 40.0], [85.0, 65.0]],
    [[85.0, 65.0], [90.0, 90.0], [70.0, 105.0], [50.0, 105.0]],
    [[50.0, 105.0], [30.0, 105.0], [10.0, 90.0], [15.0, 65.0]],
    [[15.0, 65.0], [20.0, 40.0], [35.0, 20.0], [50.0, 15.0]],
];

const VEIN: Segment = [[50.0, 15.0], [55.0, 45.0], [55.0, 75.0], [50.0, 105.0]];

/// Radial highlight focus, (50%, 40%) of the view box.
const VELVET_FOCUS: [f32; 2] = [50.0, 48.0];

const VEIN_ALPHA: f32 = 0x80 as f32 / 255.0;
const VELVET_ALPHA: f32 = 0x30 as f32 / 255.0;
const VEIN_WIDTH: f32 = 0.8;

/// Maps view-box coordinates onto the screen for one sprite.
#[derive(Debug, Clone, Copy)]
pub struct PetalTransform {
    center: Pos2,
    scale: f32,
    rotation: Rot2,
}

impl PetalTransform {
    pub fn new(sprite: &PetalSprite) -> Self {
        Self {
            center: Pos2::new(sprite.center.x, sprite.center.y),
            scale: sprite.size / VIEW_BOX.x,
            rotation: Rot2::from_angle(sprite.rotation_degrees.to_radians()),
        }
    }

    pub fn apply(&self, [x, y]: [f32; 2]) -> Pos2 {
        let local = (Vec2::new(x, y) - VIEW_BOX * 0.5) * self.scale;
        self.center + self.rotation * local
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

fn flatten_path(transform: &PetalTransform, segments: &[Segment]) -> Vec<Pos2> {
    let mut points: Vec<Pos2> = Vec::new();
    for segment in segments {
        let bezier = CubicBezierShape::from_points_stroke(
            segment.map(|p| transform.apply(p)),
            false,
            Color32::TRANSPARENT,
            Stroke::NONE,
        );
        let flattened = bezier.flatten(Some(FLATTEN_TOLERANCE));
        // Consecutive segments share their joint.
        let skip = usize::from(!points.is_empty());
        points.extend(flattened.into_iter().skip(skip));
    }
    // Closed paths end where they start.
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

pub fn petal_outline(sprite: &PetalSprite) -> Vec<Pos2> {
    flatten_path(&PetalTransform::new(sprite), &OUTLINE)
}

fn tint(rgb: [u8; 3], alpha: f32) -> Color32 {
    let [r, g, b] = rgb;
    Color32::from_rgba_unmultiplied(r, g, b, (alpha.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// Fan mesh fading from the focus point out to the highlight rim.
fn velvet_mesh(transform: &PetalTransform, sprite: &PetalSprite) -> Mesh {
    let rim = flatten_path(transform, &VELVET);
    let mut mesh = Mesh::default();
    mesh.colored_vertex(
        transform.apply(VELVET_FOCUS),
        tint(sprite.color, VELVET_ALPHA * sprite.opacity),
    );
    let clear = tint(sprite.color, 0.0);
    for point in &rim {
        mesh.colored_vertex(*point, clear);
    }
    let count = rim.len() as u32;
    for i in 0..count {
        mesh.add_triangle(0, 1 + i, 1 + (i + 1) % count);
    }
    mesh
}

pub fn petal_shapes(sprite: &PetalSprite) -> Vec<Shape> {
    let transform = PetalTransform::new(sprite);
    let outline = flatten_path(&transform, &OUTLINE);
    let vein: Vec<Pos2> = flatten_path(&transform, &[VEIN]);
    vec![
        Shape::convex_polygon(outline, tint(sprite.color, sprite.opacity), Stroke::NONE),
        Shape::line(
            vein,
            Stroke::new(
                VEIN_WIDTH * transform.scale(),
                tint(sprite.color, VEIN_ALPHA * sprite.opacity),
            ),
        ),
        Shape::mesh(velvet_mesh(&transform, sprite)),
    ]
}

/// Draws petals onto an egui layer painter. The layer has no widgets, so it
/// never takes pointer input away from the page.
pub struct PainterSurface<'a> {
    painter: &'a Painter,
    drawn: usize,
}

impl<'a> PainterSurface<'a> {
    pub fn new(painter: &'a Painter) -> Self {
        Self { painter, drawn: 0 }
    }

    pub fn drawn(&self) -> usize {
        self.drawn
    }
}

impl PetalSurface for PainterSurface<'_> {
    fn draw_petal(&mut self, sprite: &PetalSprite) -> Result<()> {
        if !sprite.center.is_finite() || !sprite.size.is_finite() {
            return Err(format!("non-finite petal sprite {:?}", sprite.key).into());
        }
        self.painter.extend(petal_shapes(sprite));
        self.drawn += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprite(size: f32, rotation_degrees: f32) -> PetalSprite {
        PetalSprite {
            key: 1,
            center: glam::Vec2::new(200.0, 100.0),
            size,
            rotation_degrees,
            color: [0xD9, 0x46, 0xEF],
            opacity: 1.0,
        }
    }

    fn bounds(points: &[Pos2]) -> (Pos2, Pos2) {
        points.iter().fold(
            (Pos2::new(f32::MAX, f32::MAX), Pos2::new(f32::MIN, f32::MIN)),
            |(min, max), p| (min.min(*p), max.max(*p)),
        )
    }

    #[test]
    fn outline_spans_size_vertically() {
        // The drawn shape covers y 10..110 of the 120 tall view box.
        let outline = petal_outline(&sprite(15.0, 0.0));
        let (min, max) = bounds(&outline);
        assert!(((max.y - min.y) - 15.0).abs() < 0.05, "{min:?} {max:?}");
        assert!(max.x - min.x < 15.0);
    }

    #[test]
    fn outline_is_centered_horizontally() {
        let outline = petal_outline(&sprite(18.0, 0.0));
        let (min, max) = bounds(&outline);
        assert!((((min.x + max.x) * 0.5) - 200.0).abs() < 0.1);
    }

    #[test]
    fn half_turn_flips_the_tip() {
        let upright = petal_outline(&sprite(12.0, 0.0));
        let flipped = petal_outline(&sprite(12.0, 180.0));
        // The tip sits above center upright and below it after a half turn.
        assert!(upright[0].y < 100.0);
        assert!(flipped[0].y > 100.0);
    }

    #[test]
    fn transparent_sprite_draws_transparent_fill() {
        let mut faded = sprite(12.0, 0.0);
        faded.opacity = 0.0;
        match &petal_shapes(&faded)[0] {
            Shape::Path(path) => assert_eq!(path.fill.a(), 0),
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn velvet_mesh_is_a_closed_fan() {
        let s = sprite(12.0, 30.0);
        let mesh = velvet_mesh(&PetalTransform::new(&s), &s);
        let rim = mesh.vertices.len() - 1;
        assert_eq!(mesh.indices.len(), rim * 3);
        assert!(mesh.is_valid());
    }
}
