use std::path::Path;

use engine::{load_json_def, ContentError, TilemapDef, Vec2};
use serde::Deserialize;

use super::ai::{AiKind, AiState};
use super::collision::SideContact;

pub(crate) const CATALOG_FILE: &str = "catalog.json";
pub(crate) const DEFAULT_GRAVITY: Vec2 = Vec2 { x: 0.0, y: -6.0 };

/// Play order of the level files plus assets shared by every level.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LevelCatalog {
    pub(crate) font: String,
    pub(crate) levels: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum LevelRole {
    /// No player; Enter advances.
    Title,
    #[default]
    Play,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SpriteSheetDef {
    pub(crate) texture: String,
    pub(crate) cols: u32,
    pub(crate) rows: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ActorDef {
    pub(crate) position: Vec2,
    /// Where the actor is put back after the player loses a life.
    #[serde(default)]
    pub(crate) respawn: Option<Vec2>,
    pub(crate) speed: f32,
    pub(crate) jump_power: f32,
    pub(crate) size: f32,
    pub(crate) sprite_index: u32,
}

impl ActorDef {
    pub(crate) fn respawn_position(&self) -> Vec2 {
        self.respawn.unwrap_or(self.position)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct EnemyDef {
    pub(crate) actor: ActorDef,
    pub(crate) ai: AiKind,
    #[serde(default)]
    pub(crate) state: AiState,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct MusicDef {
    pub(crate) key: String,
    pub(crate) volume: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CaptionDef {
    pub(crate) text: String,
    pub(crate) position: Vec2,
    pub(crate) size: f32,
    pub(crate) spacing: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LevelDef {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) role: LevelRole,
    pub(crate) map: TilemapDef,
    pub(crate) sprites: SpriteSheetDef,
    #[serde(default = "default_gravity")]
    pub(crate) gravity: Vec2,
    #[serde(default)]
    pub(crate) player: Option<ActorDef>,
    #[serde(default)]
    pub(crate) enemies: Vec<EnemyDef>,
    /// Reaching this x advances to the next level.
    #[serde(default)]
    pub(crate) exit_x: Option<f32>,
    #[serde(default)]
    pub(crate) music: Option<MusicDef>,
    #[serde(default)]
    pub(crate) jump_sfx: Option<String>,
    #[serde(default)]
    pub(crate) side_contact: SideContact,
    #[serde(default)]
    pub(crate) captions: Vec<CaptionDef>,
}

fn default_gravity() -> Vec2 {
    DEFAULT_GRAVITY
}

pub(crate) struct LoadedLevels {
    pub(crate) font: String,
    pub(crate) levels: Vec<LevelDef>,
}

/// Reads the catalog and every level it lists, in play order.
pub(crate) fn load_levels(levels_dir: &Path) -> Result<LoadedLevels, ContentError> {
    let catalog: LevelCatalog = load_json_def(&levels_dir.join(CATALOG_FILE))?;
    let levels = catalog
        .levels
        .iter()
        .map(|name| load_json_def::<LevelDef>(&levels_dir.join(format!("{name}.json"))))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LoadedLevels {
        font: catalog.font,
        levels,
    })
}
