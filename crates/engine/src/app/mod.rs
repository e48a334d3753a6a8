mod assets;
mod audio;
mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;
mod tilemap;

pub use assets::{
    AssetError, Assets, AudioClip, Music, SoundEffect, Texture, TextureId, TextureStore,
};
#[cfg(feature = "device-audio")]
pub use audio::{AudioOutputError, DeviceAudio};
pub use audio::{AudioSink, LoggingAudio};
pub use input::InputAction;
pub use loop_runner::{run_app, AppError, FixedStepClock, LoopConfig, StepPlan};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{
    pixels_per_world, world_to_screen, AtlasFrame, DrawCommand, DrawList, RenderTarget, Renderer,
    UvRect, Viewport, FONT_ATLAS_GRID,
};
pub use scene::{
    Camera2D, InputSnapshot, Scene, SceneCommand, SceneContext, SceneInitError, SceneKey,
    SceneMachine, SceneSwitchError, Vec2,
};
pub use tilemap::{Penetration, TileAtlas, Tilemap, TilemapDef, TilemapError};
