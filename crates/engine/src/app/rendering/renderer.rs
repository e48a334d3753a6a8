use std::collections::HashSet;
use std::sync::Arc;

use glam::{Mat2, Vec3};
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::app::assets::{Texture, TextureId, TextureStore};
use crate::app::{Camera2D, Vec2};

use super::draw_list::{DrawCommand, DrawList};
use super::transform::{pixels_per_world, world_to_screen_f};
use super::Viewport;

const MIN_BASIS_DETERMINANT: f32 = 1.0e-6;

/// Software rasteriser: replays a [`DrawList`] into a `pixels` frame through
/// an orthographic camera `view_width_world` units wide.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    view_width_world: f32,
    clear_color: [u8; 4],
    warned_missing_textures: HashSet<TextureId>,
}

impl Renderer {
    pub fn new(
        window: Arc<Window>,
        view_width_world: f32,
        clear_color: [u8; 4],
    ) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
            view_width_world,
            clear_color,
            warned_missing_textures: HashSet::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn render(
        &mut self,
        draws: &DrawList,
        camera: &Camera2D,
        textures: &TextureStore,
    ) -> Result<(), Error> {
        let viewport = self.viewport;
        let ppw = pixels_per_world(viewport, self.view_width_world);
        let frame = self.pixels.frame_mut();
        clear_frame(frame, self.clear_color);

        for command in draws.commands() {
            let Some(texture) = textures.get(command.texture) else {
                if self.warned_missing_textures.insert(command.texture) {
                    warn!(texture = command.texture.0, "renderer_texture_missing");
                }
                continue;
            };
            draw_command(frame, viewport, camera, ppw, command, texture);
        }

        self.pixels.render()
    }
}

fn clear_frame(frame: &mut [u8], color: [u8; 4]) {
    for pixel in frame.chunks_exact_mut(4) {
        pixel.copy_from_slice(&color);
    }
}

/// Maps every pixel centre inside the transformed quad back to quad-local
/// coordinates and samples the texture there. Mirrored or rotated models fall
/// out of the inverse mapping.
pub(crate) fn draw_command(
    frame: &mut [u8],
    viewport: Viewport,
    camera: &Camera2D,
    ppw: f32,
    command: &DrawCommand,
    texture: &Texture,
) {
    if viewport.width == 0 || viewport.height == 0 || texture.width() == 0 {
        return;
    }

    let model = command.model;
    let origin = world_to_screen_f(
        model.transform_point3(Vec3::ZERO).truncate(),
        camera,
        viewport,
        ppw,
    );
    let axis_x = Vec2::new(model.x_axis.x, -model.x_axis.y) * ppw;
    let axis_y = Vec2::new(model.y_axis.x, -model.y_axis.y) * ppw;
    let basis = Mat2::from_cols(axis_x, axis_y);
    if basis.determinant().abs() < MIN_BASIS_DETERMINANT {
        return;
    }
    let to_local = basis.inverse();

    let half_extent = (axis_x.abs() + axis_y.abs()) * 0.5;
    let min = (origin - half_extent).floor().max(Vec2::ZERO);
    let max = (origin + half_extent)
        .ceil()
        .min(Vec2::new(viewport.width as f32, viewport.height as f32));
    if min.x >= max.x || min.y >= max.y {
        return;
    }

    let frame_width = viewport.width as usize;
    let (tex_w, tex_h) = (texture.width() as f32, texture.height() as f32);
    let uv = command.uv;

    for py in min.y as u32..max.y as u32 {
        for px in min.x as u32..max.x as u32 {
            let local = to_local * (Vec2::new(px as f32 + 0.5, py as f32 + 0.5) - origin);
            if local.x.abs() > 0.5 || local.y.abs() > 0.5 {
                continue;
            }
            let u = uv.u + (local.x + 0.5) * uv.width;
            let v = uv.v + (0.5 - local.y) * uv.height;
            let texel = texture.texel((u * tex_w) as u32, (v * tex_h) as u32);
            if texel[3] == 0 {
                continue;
            }
            let offset = (py as usize * frame_width + px as usize) * 4;
            if let Some(dst) = frame.get_mut(offset..offset + 4) {
                blend_pixel(dst, texel);
            }
        }
    }
}

fn blend_pixel(dst: &mut [u8], src: [u8; 4]) {
    if src[3] == u8::MAX {
        dst.copy_from_slice(&src);
        return;
    }
    let alpha = u32::from(src[3]);
    for channel in 0..3 {
        let blended =
            u32::from(src[channel]) * alpha + u32::from(dst[channel]) * (255 - alpha);
        dst[channel] = (blended / 255) as u8;
    }
    dst[3] = u8::MAX;
}

#[cfg(test)]
mod tests {
    use glam::Mat4;

    use super::*;
    use crate::app::rendering::{AtlasFrame, RenderTarget, UvRect};

    const VIEWPORT: Viewport = Viewport {
        width: 8,
        height: 8,
    };

    fn pixel(frame: &[u8], x: usize, y: usize) -> [u8; 4] {
        let offset = (y * VIEWPORT.width as usize + x) * 4;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    /// Two texels wide: left red, right blue.
    fn split_texture() -> Texture {
        Texture::from_rgba(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 255]).expect("texture")
    }

    fn command(model: Mat4, uv: UvRect) -> DrawCommand {
        DrawCommand {
            model,
            texture: TextureId(0),
            uv,
        }
    }

    /// One world unit per pixel through `camera`.
    fn draw_at_unit_scale(
        frame: &mut [u8],
        camera: &Camera2D,
        command: &DrawCommand,
        texture: &Texture,
    ) {
        draw_command(frame, VIEWPORT, camera, 1.0, command, texture);
    }

    #[test]
    fn unit_quad_covers_one_world_unit() {
        let mut frame = vec![0u8; 8 * 8 * 4];
        let texture = Texture::from_rgba(1, 1, vec![9, 9, 9, 255]).expect("texture");
        draw_command(
            &mut frame,
            VIEWPORT,
            &Camera2D::default(),
            2.0,
            &command(Mat4::IDENTITY, UvRect::FULL),
            &texture,
        );

        assert_eq!(pixel(&frame, 3, 3), [9, 9, 9, 255]);
        assert_eq!(pixel(&frame, 4, 4), [9, 9, 9, 255]);
        assert_eq!(pixel(&frame, 2, 3), [0, 0, 0, 0]);
        assert_eq!(pixel(&frame, 5, 4), [0, 0, 0, 0]);
    }

    #[test]
    fn negative_x_scale_mirrors_texture() {
        let texture = split_texture();
        let mut plain = vec![0u8; 8 * 8 * 4];
        let mut mirrored = vec![0u8; 8 * 8 * 4];
        let scale = Mat4::from_scale(Vec3::new(4.0, 4.0, 1.0));
        let flip = Mat4::from_scale(Vec3::new(-4.0, 4.0, 1.0));

        let plain_quad = command(scale, UvRect::FULL);
        draw_at_unit_scale(&mut plain, &Camera2D::default(), &plain_quad, &texture);
        let mirrored_quad = command(flip, UvRect::FULL);
        draw_at_unit_scale(&mut mirrored, &Camera2D::default(), &mirrored_quad, &texture);

        assert_eq!(pixel(&plain, 2, 4), [255, 0, 0, 255]);
        assert_eq!(pixel(&mirrored, 2, 4), [0, 0, 255, 255]);
        assert_eq!(pixel(&mirrored, 5, 4), [255, 0, 0, 255]);
    }

    #[test]
    fn atlas_frame_samples_only_its_cell() {
        let texture = split_texture();
        let mut frame = vec![0u8; 8 * 8 * 4];
        let mut draws = DrawList::default();
        draws.set_model_matrix(Mat4::from_scale(Vec3::new(8.0, 8.0, 1.0)));
        draws.draw_atlas_frame(
            TextureId(0),
            AtlasFrame {
                index: 1,
                cols: 2,
                rows: 1,
            },
        );

        draw_at_unit_scale(&mut frame, &Camera2D::default(), &draws.commands()[0], &texture);

        assert_eq!(pixel(&frame, 0, 0), [0, 0, 255, 255]);
        assert_eq!(pixel(&frame, 7, 7), [0, 0, 255, 255]);
    }

    #[test]
    fn camera_moves_quad_off_screen() {
        let texture = split_texture();
        let mut frame = vec![0u8; 8 * 8 * 4];
        let camera = Camera2D {
            position: Vec2::new(100.0, 0.0),
        };
        let quad = command(Mat4::IDENTITY, UvRect::FULL);
        draw_at_unit_scale(&mut frame, &camera, &quad, &texture);
        assert!(frame.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn translucent_texels_blend_over_background() {
        let mut dst = [100, 100, 100, 255];
        blend_pixel(&mut dst, [200, 0, 0, 128]);
        assert_eq!(dst, [150, 49, 49, 255]);
    }

    #[test]
    fn degenerate_model_is_skipped() {
        let texture = split_texture();
        let mut frame = vec![0u8; 8 * 8 * 4];
        let flat = Mat4::from_scale(Vec3::new(0.0, 4.0, 1.0));
        let flat_quad = command(flat, UvRect::FULL);
        draw_at_unit_scale(&mut frame, &Camera2D::default(), &flat_quad, &texture);
        assert!(frame.iter().all(|byte| *byte == 0));
    }
}
