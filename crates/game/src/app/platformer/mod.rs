mod ai;
mod collision;
mod entity;
mod level;
mod scene;

use engine::{Scene, SceneKey};

use super::session::GameSession;

pub(crate) use entity::{Animation, Entity, Flight, Sprite};
pub(crate) use level::{load_levels, LoadedLevels};
use scene::PlatformerScene;

/// One scene per level in catalog order; each links to the one after it and
/// the last one ends the game.
pub(crate) fn build_scenes(loaded: LoadedLevels) -> Vec<Box<dyn Scene<GameSession>>> {
    let LoadedLevels { font, levels } = loaded;
    let level_count = levels.len();
    levels
        .into_iter()
        .enumerate()
        .map(|(index, def)| {
            let next = (index + 1 < level_count).then_some(SceneKey(index + 1));
            Box::new(PlatformerScene::new(def, font.clone(), next)) as Box<dyn Scene<GameSession>>
        })
        .collect()
}
