//! Recorded command lists that can be replayed into any [`DrawSink`].

use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::bounds::{Aabb, Rect};
use crate::color::Color;
use crate::material::Material;
use crate::producer::{DrawSink, GeometryProducer};

#[derive(Clone)]
struct RecordedDraw {
    producer: Arc<dyn GeometryProducer>,
    transform: Mat4,
    mask: Color,
    material: Material,
    translucent: bool,
}

/// A sub-scene recorded once and submitted as a unit.
///
/// Nothing is filtered or biased at record time; the sink that receives the
/// replay applies its own rules, so a fully transparent recorded mask is
/// dropped on replay like any other.
///
/// The batch also tracks the union of every recorded producer's bounds
/// under its recorded transform, which [`DrawBatch::draw_rect_into`] uses to
/// fit the whole batch into a rectangle.
#[derive(Clone, Default)]
pub struct DrawBatch {
    draws: Vec<RecordedDraw>,
    bounds: Aabb,
}

impl DrawBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        producer: Arc<dyn GeometryProducer>,
        transform: Mat4,
        mask: Color,
        material: &Material,
        translucent: bool,
    ) {
        self.bounds = self.bounds.union(&producer.bounds().transformed(&transform));
        self.draws.push(RecordedDraw {
            producer,
            transform,
            mask,
            material: material.clone(),
            translucent,
        });
    }

    /// Submit every recorded command to `sink` in recording order, under
    /// `parent` and tinted by `mask`.
    pub fn draw_into<S: DrawSink + ?Sized>(&self, sink: &mut S, parent: &Mat4, mask: Color) {
        for draw in &self.draws {
            sink.add_command(
                draw.producer.clone(),
                *parent * draw.transform,
                draw.mask * mask,
                &draw.material,
                draw.translucent,
            );
        }
    }

    /// Fit the batch's x/y bounds into `rect` and replay it there.
    ///
    /// Each axis is scaled independently and the bounds centre lands on the
    /// rect centre; z is untouched. An axis with no extent is only moved. An
    /// empty batch submits nothing.
    pub fn draw_rect_into<S: DrawSink + ?Sized>(&self, sink: &mut S, rect: Rect, mask: Color) {
        if self.bounds.is_empty() {
            return;
        }
        let size = self.bounds.size();
        let fit = |target: f32, extent: f32| if extent > 0.0 { target / extent } else { 1.0 };
        let scale = Vec3::new(fit(rect.width, size.x), fit(rect.height, size.y), 1.0);
        let centre = self.bounds.center();

        let matrix = Mat4::from_translation(rect.center().extend(0.0))
            * Mat4::from_scale(scale)
            * Mat4::from_translation(Vec3::new(-centre.x, -centre.y, 0.0));
        self.draw_into(sink, &matrix, mask);
    }

    /// Union of every recorded draw's transformed bounds.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn clear(&mut self) {
        self.draws.clear();
        self.bounds = Aabb::EMPTY;
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }
}

impl std::fmt::Debug for DrawBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawBatch")
            .field("draws", &self.draws.len())
            .field("bounds", &self.bounds)
            .finish()
    }
}

impl DrawSink for DrawBatch {
    fn add_command(
        &mut self,
        producer: Arc<dyn GeometryProducer>,
        transform: Mat4,
        mask: Color,
        material: &Material,
        translucent: bool,
    ) {
        self.add(producer, transform, mask, material, translucent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::Sprite;
    use crate::testing::{NullProducer, test_material};
    use glam::Vec2;

    #[test]
    fn replay_composes_transform_and_mask() {
        let material = test_material();
        let mut batch = DrawBatch::new();
        batch.add(
            Arc::new(NullProducer),
            Mat4::from_translation(Vec3::X),
            Color::WHITE.with_alpha(0.5),
            &material,
            false,
        );
        batch.add(Arc::new(NullProducer), Mat4::IDENTITY, Color::WHITE, &material, true);

        let mut target = DrawBatch::new();
        let parent = Mat4::from_scale(Vec3::splat(2.0));
        batch.draw_into(&mut target, &parent, Color::RED);

        assert_eq!(target.len(), 2);
        assert_eq!(target.draws[0].transform.w_axis.truncate(), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(target.draws[0].mask, Color::RED * Color::WHITE.with_alpha(0.5));
        assert!(target.draws[1].translucent);
        assert_eq!(target.draws[1].material, material);
    }

    #[test]
    fn clear_empties() {
        let mut batch = DrawBatch::new();
        batch.add(
            Arc::new(Sprite::new(Vec2::ONE)),
            Mat4::IDENTITY,
            Color::WHITE,
            &test_material(),
            false,
        );
        assert!(!batch.is_empty());
        assert!(!batch.bounds().is_empty());
        batch.clear();
        assert!(batch.is_empty());
        assert!(batch.bounds().is_empty());
    }

    #[test]
    fn bounds_union_transformed_producers() {
        let material = test_material();
        let mut batch = DrawBatch::new();
        batch.add(
            Arc::new(Sprite::new(Vec2::splat(2.0))),
            Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)),
            Color::WHITE,
            &material,
            false,
        );
        batch.add(
            Arc::new(Sprite::new(Vec2::ONE)),
            Mat4::from_scale(Vec3::splat(4.0)),
            Color::WHITE,
            &material,
            false,
        );
        // No extent, so no effect on the union
        batch.add(Arc::new(NullProducer), Mat4::from_translation(Vec3::splat(100.0)), Color::WHITE, &material, false);

        assert_eq!(
            batch.bounds(),
            Aabb::new(Vec3::new(-2.0, -2.0, 0.0), Vec3::new(11.0, 2.0, 0.0))
        );
    }

    #[test]
    fn rect_draw_fits_bounds_into_the_rect() {
        let material = test_material();
        let mut batch = DrawBatch::new();
        batch.add(
            Arc::new(Sprite::new(Vec2::splat(2.0))),
            Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)),
            Color::WHITE,
            &material,
            false,
        );
        batch.add(
            Arc::new(Sprite::new(Vec2::splat(2.0))),
            Mat4::from_translation(Vec3::new(12.0, 0.0, 0.0)),
            Color::WHITE.with_alpha(0.5),
            &material,
            true,
        );
        // x spans 9..13, y spans -1..1
        let mut target = DrawBatch::new();
        batch.draw_rect_into(&mut target, Rect::new(0.0, 0.0, 8.0, 4.0), Color::RED);

        assert_eq!(target.len(), 2);
        let first = Mat4::from_translation(Vec3::new(2.0, 2.0, 0.0)) * Mat4::from_scale(Vec3::new(2.0, 2.0, 1.0));
        assert!(target.draws[0].transform.abs_diff_eq(first, 1e-5));
        let second = Mat4::from_translation(Vec3::new(6.0, 2.0, 0.0)) * Mat4::from_scale(Vec3::new(2.0, 2.0, 1.0));
        assert!(target.draws[1].transform.abs_diff_eq(second, 1e-5));
        assert_eq!(target.draws[1].mask, Color::WHITE.with_alpha(0.5) * Color::RED);

        let fitted = target.bounds();
        assert!(fitted.min.abs_diff_eq(Vec3::ZERO, 1e-5));
        assert!(fitted.max.abs_diff_eq(Vec3::new(8.0, 4.0, 0.0), 1e-5));
    }

    #[test]
    fn rect_draw_of_an_empty_batch_submits_nothing() {
        let mut batch = DrawBatch::new();
        batch.add(Arc::new(NullProducer), Mat4::IDENTITY, Color::WHITE, &test_material(), false);
        let mut target = DrawBatch::new();
        batch.draw_rect_into(&mut target, Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE);
        assert!(target.is_empty());
    }
}
