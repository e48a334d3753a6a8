use crate::app::{Camera2D, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Scale that fits `view_width_world` units across the viewport.
pub fn pixels_per_world(viewport: Viewport, view_width_world: f32) -> f32 {
    if view_width_world.is_finite() && view_width_world > 0.0 {
        viewport.width as f32 / view_width_world
    } else {
        1.0
    }
}

pub(crate) fn world_to_screen_f(
    world: Vec2,
    camera: &Camera2D,
    viewport: Viewport,
    pixels_per_world: f32,
) -> Vec2 {
    Vec2::new(
        (world.x - camera.position.x) * pixels_per_world + viewport.width as f32 * 0.5,
        viewport.height as f32 * 0.5 - (world.y - camera.position.y) * pixels_per_world,
    )
}

pub fn world_to_screen(
    world: Vec2,
    camera: &Camera2D,
    viewport: Viewport,
    pixels_per_world: f32,
) -> (i32, i32) {
    let screen = world_to_screen_f(world, camera, viewport, pixels_per_world);
    (screen.x.round() as i32, screen.y.round() as i32)
}
