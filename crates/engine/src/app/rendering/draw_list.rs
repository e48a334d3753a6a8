use glam::{Mat4, Vec3};

use crate::app::assets::TextureId;
use crate::app::Vec2;

/// Font sheets are 16x16 grids indexed by byte value.
pub const FONT_ATLAS_GRID: u32 = 16;

/// A cell of a texture atlas, counted row-major from the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasFrame {
    pub index: u32,
    pub cols: u32,
    pub rows: u32,
}

/// Normalised texture rectangle; `v` grows downward through the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub u: f32,
    pub v: f32,
    pub width: f32,
    pub height: f32,
}

impl UvRect {
    pub const FULL: UvRect = UvRect {
        u: 0.0,
        v: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub fn from_frame(frame: AtlasFrame) -> Self {
        let cols = frame.cols.max(1);
        let rows = frame.rows.max(1);
        Self {
            u: (frame.index % cols) as f32 / cols as f32,
            v: (frame.index / cols) as f32 / rows as f32,
            width: 1.0 / cols as f32,
            height: 1.0 / rows as f32,
        }
    }
}

/// Render collaborator: every draw uses the last model matrix set and maps a
/// unit quad centred on the origin.
pub trait RenderTarget {
    fn set_model_matrix(&mut self, model: Mat4);
    fn draw_quad(&mut self, texture: TextureId);
    fn draw_atlas_frame(&mut self, texture: TextureId, frame: AtlasFrame);

    /// One glyph quad per byte, advancing `size + spacing` along x from
    /// `position` (centre of the first glyph).
    fn draw_text(&mut self, font: TextureId, text: &str, size: f32, spacing: f32, position: Vec2) {
        let scale = Mat4::from_scale(Vec3::new(size, size, 1.0));
        for (index, byte) in text.bytes().enumerate() {
            let offset = (size + spacing) * index as f32;
            let origin = Vec3::new(position.x + offset, position.y, 0.0);
            self.set_model_matrix(Mat4::from_translation(origin) * scale);
            self.draw_atlas_frame(
                font,
                AtlasFrame {
                    index: u32::from(byte),
                    cols: FONT_ATLAS_GRID,
                    rows: FONT_ATLAS_GRID,
                },
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    pub model: Mat4,
    pub texture: TextureId,
    pub uv: UvRect,
}

/// Records draws in submission order; the renderer replays it each frame.
#[derive(Debug, Clone)]
pub struct DrawList {
    model: Mat4,
    commands: Vec<DrawCommand>,
}

impl Default for DrawList {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            commands: Vec::new(),
        }
    }
}

impl DrawList {
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.model = Mat4::IDENTITY;
        self.commands.clear();
    }

    fn push(&mut self, texture: TextureId, uv: UvRect) {
        self.commands.push(DrawCommand {
            model: self.model,
            texture,
            uv,
        });
    }
}

impl RenderTarget for DrawList {
    fn set_model_matrix(&mut self, model: Mat4) {
        self.model = model;
    }

    fn draw_quad(&mut self, texture: TextureId) {
        self.push(texture, UvRect::FULL);
    }

    fn draw_atlas_frame(&mut self, texture: TextureId, frame: AtlasFrame) {
        self.push(texture, UvRect::from_frame(frame));
    }
}
