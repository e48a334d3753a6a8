use engine::{resolve_app_paths, AppPaths, LoopConfig, Scene};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use super::lander::{LanderScene, LANDER_TPS};
use super::platformer;
use super::session::{AppStatus, GameSession};

const MODE_ENV_VAR: &str = "PLATFORMER_MODE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GameMode {
    Platformer,
    Lander,
}

impl GameMode {
    pub(crate) fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("platformer") => Self::Platformer,
            Some("lander") => Self::Lander,
            Some(other) => {
                warn!(
                    var = MODE_ENV_VAR,
                    value = other,
                    fallback = "platformer",
                    "unknown_game_mode"
                );
                Self::Platformer
            }
        }
    }

    fn as_token(self) -> &'static str {
        match self {
            Self::Platformer => "platformer",
            Self::Lander => "lander",
        }
    }
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) paths: AppPaths,
    pub(crate) session: GameSession,
    pub(crate) scenes: Vec<Box<dyn Scene<GameSession>>>,
}

/// Returns `None` after logging when start-up content cannot be resolved.
pub(crate) fn build_app() -> Option<AppWiring> {
    init_tracing();
    info!("=== Platformer Startup ===");

    let mode = GameMode::parse(std::env::var(MODE_ENV_VAR).ok().as_deref());
    let paths = match resolve_app_paths() {
        Ok(paths) => paths,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return None;
        }
    };
    info!(
        mode = mode.as_token(),
        root = %paths.root.display(),
        "app_paths_resolved"
    );

    let wiring = match mode {
        GameMode::Platformer => {
            let loaded = match platformer::load_levels(&paths.levels_dir) {
                Ok(loaded) => loaded,
                Err(err) => {
                    error!(error = %err, "level_catalog_failed");
                    return None;
                }
            };
            info!(levels = loaded.levels.len(), "level_catalog_loaded");
            AppWiring {
                config: LoopConfig::default(),
                paths,
                session: GameSession::new(AppStatus::Running),
                scenes: platformer::build_scenes(loaded),
            }
        }
        GameMode::Lander => AppWiring {
            config: LoopConfig {
                window_title: "Bird Lander".to_string(),
                target_tps: LANDER_TPS,
                clear_color: [49, 140, 205, 255],
                ..LoopConfig::default()
            },
            paths,
            session: GameSession::new(AppStatus::Paused),
            scenes: vec![Box::new(LanderScene::default())],
        },
    };
    Some(wiring)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
