mod draw_list;
mod renderer;
mod transform;

pub use draw_list::{AtlasFrame, DrawCommand, DrawList, RenderTarget, UvRect, FONT_ATLAS_GRID};
pub use renderer::Renderer;
pub use transform::{pixels_per_world, world_to_screen, Viewport};
