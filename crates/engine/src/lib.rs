use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
mod asset_keys;
pub mod content;

pub use app::{
    pixels_per_world, run_app, world_to_screen, AppError, AssetError, Assets, AtlasFrame,
    AudioClip, AudioSink, Camera2D, DrawCommand, DrawList, FixedStepClock, InputAction,
    InputSnapshot, LoggingAudio, LoopConfig, LoopMetricsSnapshot, Music, Penetration,
    RenderTarget, Renderer, Scene, SceneCommand, SceneContext, SceneInitError, SceneKey,
    SceneMachine, SceneSwitchError, SoundEffect, StepPlan, Texture, TextureId, TextureStore,
    TileAtlas, Tilemap, TilemapDef, TilemapError, UvRect, Vec2, Viewport, FONT_ATLAS_GRID,
};
#[cfg(feature = "device-audio")]
pub use app::{AudioOutputError, DeviceAudio};
pub use asset_keys::AssetKeyError;
pub use content::{load_json_def, parse_json_def, ContentError};

pub const ROOT_ENV_VAR: &str = "PLATFORMER_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub textures_dir: PathBuf,
    pub audio_dir: PathBuf,
    pub levels_dir: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: PathBuf) -> Self {
        let assets_dir = root.join("assets");
        Self {
            textures_dir: assets_dir.join("textures"),
            audio_dir: assets_dir.join("audio"),
            levels_dir: assets_dir.join("levels"),
            assets_dir,
            root,
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "PLATFORMER_ROOT is set but does not point to a directory containing assets/: {path}"
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not find an assets/ directory by walking upward from {start_dir}\n\
Set {env_var} to the project root, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/platformer\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    resolve_root().map(AppPaths::from_root)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(Path::new(&value));
            if has_assets_dir(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
            find_root_upward(&exe_dir).ok_or_else(|| StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn find_root_upward(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| has_assets_dir(candidate))
        .map(normalize_path)
}

fn has_assets_dir(path: &Path) -> bool {
    path.join("assets").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn root_requires_assets_dir() {
        let dir = TempDir::new().expect("tempdir");
        assert!(!has_assets_dir(dir.path()));
        fs::create_dir(dir.path().join("assets")).expect("assets");
        assert!(has_assets_dir(dir.path()));
    }

    #[test]
    fn root_is_found_from_nested_directory() {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir(dir.path().join("assets")).expect("assets");
        let nested = dir.path().join("target").join("debug");
        fs::create_dir_all(&nested).expect("nested");

        let root = find_root_upward(&nested).expect("root");
        assert_eq!(root, normalize_path(dir.path()));
    }

    #[test]
    fn app_paths_layout_hangs_off_assets() {
        let paths = AppPaths::from_root(PathBuf::from("/game"));
        assert_eq!(paths.textures_dir, PathBuf::from("/game/assets/textures"));
        assert_eq!(paths.audio_dir, PathBuf::from("/game/assets/audio"));
        assert_eq!(paths.levels_dir, PathBuf::from("/game/assets/levels"));
    }
}
