use engine::{
    AssetError, AudioSink, Camera2D, InputAction, InputSnapshot, Music, RenderTarget, Scene,
    SceneCommand, SceneContext, SceneInitError, SceneKey, SoundEffect, TextureId, Tilemap, Vec2,
};
use tracing::{info, warn};

use super::collision::SideContact;
use super::entity::{Animation, Entity, Sprite, StepContext};
use super::level::{ActorDef, EnemyDef, LevelDef, LevelRole};
use crate::app::session::{AppStatus, GameSession};

/// Players below this height are out of the level.
pub(crate) const FALL_LIMIT_Y: f32 = -10.0;
pub(crate) const CAMERA_LEFT_EDGE: f32 = 5.0;
pub(crate) const CAMERA_Y: f32 = -3.75;
const HUD_SIZE: f32 = 0.3;
const LIVES_SPACING: f32 = 0.0005;
const OUTCOME_SPACING: f32 = 0.03;
const LIVES_OFFSET: Vec2 = Vec2 { x: -4.0, y: -0.5 };
const OUTCOME_Y: f32 = -1.5;

struct LevelState {
    map: Tilemap,
    player: Option<Entity>,
    enemies: Vec<Entity>,
    font: TextureId,
    music: Option<Music>,
    jump_sfx: Option<SoundEffect>,
    advance_requested: bool,
}

/// One level file; rebuilt from its definition on every entry.
pub(crate) struct PlatformerScene {
    def: LevelDef,
    font_key: String,
    next: Option<SceneKey>,
    state: Option<LevelState>,
}

impl PlatformerScene {
    pub(crate) fn new(def: LevelDef, font_key: String, next: Option<SceneKey>) -> Self {
        Self {
            def,
            font_key,
            next,
            state: None,
        }
    }

    pub(crate) fn player(&self) -> Option<&Entity> {
        self.state.as_ref().and_then(|level| level.player.as_ref())
    }

    pub(crate) fn enemies(&self) -> &[Entity] {
        self.state
            .as_ref()
            .map(|level| level.enemies.as_slice())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn player_mut(&mut self) -> Option<&mut Entity> {
        self.state.as_mut().and_then(|level| level.player.as_mut())
    }

    #[cfg(test)]
    pub(crate) fn enemies_mut(&mut self) -> &mut [Entity] {
        self.state
            .as_mut()
            .map(|level| level.enemies.as_mut_slice())
            .unwrap_or_default()
    }

    fn followed_x(&self) -> Option<f32> {
        self.player()
            .map(|player| player.position.x)
            .filter(|x| *x > CAMERA_LEFT_EDGE)
    }

    fn should_advance(&mut self) -> bool {
        let Some(level) = self.state.as_mut() else {
            return false;
        };
        match self.def.role {
            LevelRole::Title => std::mem::take(&mut level.advance_requested),
            LevelRole::Play => {
                let cleared = !level.enemies.is_empty()
                    && level.enemies.iter().all(|enemy| !enemy.is_active());
                let exited = match (self.def.exit_x, level.player.as_ref()) {
                    (Some(exit_x), Some(player)) => {
                        player.is_active() && player.position.x >= exit_x
                    }
                    _ => false,
                };
                cleared || exited
            }
        }
    }
}

fn character_sprite(def: &LevelDef, texture: TextureId) -> Sprite {
    Sprite::Atlas {
        texture,
        cols: def.sprites.cols,
        rows: def.sprites.rows,
    }
}

fn spawn_player(def: &ActorDef, sprite: Sprite, gravity: Vec2, map: &Tilemap) -> Entity {
    let mut player = Entity::player(def.position, def.size, sprite)
        .with_motion(def.speed, def.jump_power, gravity)
        .with_animation(Animation::walk_cycle(def.sprite_index));
    settle(&mut player, map);
    player
}

fn spawn_enemy(def: &EnemyDef, sprite: Sprite, gravity: Vec2, map: &Tilemap) -> Entity {
    let actor = &def.actor;
    let mut enemy = Entity::enemy(actor.position, actor.size, sprite, def.ai, def.state)
        .with_motion(actor.speed, actor.jump_power, gravity)
        .with_animation(Animation::walk_cycle(actor.sprite_index));
    settle(&mut enemy, map);
    enemy
}

fn settle(entity: &mut Entity, map: &Tilemap) {
    let step = StepContext {
        map,
        delta_time: 0.0,
        player_position: None,
        side_contact: SideContact::default(),
    };
    entity.update(&step, &mut []);
}

fn load_optional<T>(kind: &'static str, key: &str, loaded: Result<T, AssetError>) -> Option<T> {
    match loaded {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(kind, key, error = %err, "audio_unavailable");
            None
        }
    }
}

/// Intent is rebuilt from held keys every step; jumps need ground contact
/// from the previous step.
pub(crate) fn control_player(
    player: &mut Entity,
    input: &InputSnapshot,
    jump_sfx: Option<&SoundEffect>,
    audio: &mut dyn AudioSink,
) {
    player.movement = Vec2::ZERO;
    if input.is_down(InputAction::MoveLeft) {
        player.move_left();
    } else if input.is_down(InputAction::MoveRight) {
        player.move_right();
    }
    if player.movement.length() > 1.0 {
        player.movement = player.movement.normalize();
    }
    if input.was_pressed(InputAction::MoveUp) && player.flags.bottom {
        player.jump();
        if let Some(effect) = jump_sfx {
            audio.play_sfx(effect);
        }
    }
}

impl Scene<GameSession> for PlatformerScene {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn initialise(
        &mut self,
        ctx: &mut SceneContext<'_, GameSession>,
    ) -> Result<(), SceneInitError> {
        let atlas = ctx.assets.load_texture(&self.def.map.atlas)?;
        let map = Tilemap::from_def(&self.def.map, atlas)?;
        let characters = ctx.assets.load_texture(&self.def.sprites.texture)?;
        let sprite = character_sprite(&self.def, characters);
        let font = ctx.assets.load_texture(&self.font_key)?;

        let player = self
            .def
            .player
            .as_ref()
            .map(|def| spawn_player(def, sprite, self.def.gravity, &map));
        let enemies = self
            .def
            .enemies
            .iter()
            .map(|def| spawn_enemy(def, sprite, self.def.gravity, &map))
            .collect::<Vec<_>>();

        let music = self.def.music.as_ref().and_then(|def| {
            let music = load_optional("music", &def.key, ctx.assets.load_music(&def.key))?;
            ctx.audio.play_music(&music, def.volume);
            Some(music)
        });
        let jump_sfx = self
            .def
            .jump_sfx
            .as_deref()
            .and_then(|key| load_optional("sfx", key, ctx.assets.load_sfx(key)));

        info!(
            level = self.def.name.as_str(),
            enemies = enemies.len(),
            has_player = player.is_some(),
            "level_loaded"
        );
        self.state = Some(LevelState {
            map,
            player,
            enemies,
            font,
            music,
            jump_sfx,
            advance_requested: false,
        });
        Ok(())
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        ctx: &mut SceneContext<'_, GameSession>,
    ) {
        if input.was_pressed(InputAction::Primary) {
            ctx.shared.toggle_pause();
        }
        let Some(level) = self.state.as_mut() else {
            return;
        };
        if self.def.role == LevelRole::Title && input.was_pressed(InputAction::Confirm) {
            level.advance_requested = true;
        }
        if !ctx.shared.is_running() {
            return;
        }

        let LevelState {
            map,
            player,
            enemies,
            jump_sfx,
            ..
        } = level;
        let map: &Tilemap = map;
        let step = StepContext {
            map,
            delta_time: fixed_dt_seconds,
            player_position: None,
            side_contact: self.def.side_contact,
        };

        if let Some(player) = player.as_mut() {
            control_player(player, input, jump_sfx.as_ref(), ctx.audio);
            player.update(&step, enemies);

            if !player.is_active() && ctx.shared.lives() > 0 {
                if let Some(spawn) = self.def.player.as_ref() {
                    player.reset(map, spawn.respawn_position());
                }
                for (enemy, def) in enemies.iter_mut().zip(&self.def.enemies) {
                    enemy.set_ai_state(def.state);
                    enemy.reset(map, def.actor.respawn_position());
                }
                ctx.shared.lose_life();
            }
        }

        let enemy_step = StepContext {
            player_position: player.as_ref().map(|player| player.position),
            ..step
        };
        for enemy in enemies.iter_mut().filter(|enemy| enemy.is_active()) {
            enemy.update(&enemy_step, &mut []);
        }

        if let Some(player) = player.as_mut() {
            if player.is_active() && player.position.y < FALL_LIMIT_Y {
                info!(x = player.position.x, y = player.position.y, "player_fell");
                player.kill_off();
            }
        }
    }

    fn end_frame(&mut self, ctx: &mut SceneContext<'_, GameSession>) -> SceneCommand {
        if self.def.role == LevelRole::Play && ctx.shared.lives() == 0 {
            ctx.shared.finish(false);
        }
        if !ctx.shared.is_running() || !self.should_advance() {
            return SceneCommand::None;
        }
        match self.next {
            Some(next) => {
                info!(level = self.def.name.as_str(), next = next.0, "level_complete");
                SceneCommand::SwitchTo(next)
            }
            None => {
                info!(level = self.def.name.as_str(), "final_level_complete");
                ctx.shared.finish(true);
                SceneCommand::None
            }
        }
    }

    fn camera(&self, _shared: &GameSession) -> Camera2D {
        let x = self.followed_x().unwrap_or(CAMERA_LEFT_EDGE);
        Camera2D::centered_on(Vec2::new(x, CAMERA_Y))
    }

    fn render(&self, shared: &GameSession, target: &mut dyn RenderTarget) {
        let Some(level) = self.state.as_ref() else {
            return;
        };
        level.map.render(target);
        if let Some(player) = level.player.as_ref() {
            player.render(target);
        }
        for enemy in self.enemies() {
            enemy.render(target);
        }
        for caption in &self.def.captions {
            target.draw_text(
                level.font,
                &caption.text,
                caption.size,
                caption.spacing,
                caption.position,
            );
        }

        if self.def.role == LevelRole::Play {
            let camera = self.camera(shared);
            target.draw_text(
                level.font,
                &format!("Lives: {}", shared.lives()),
                HUD_SIZE,
                LIVES_SPACING,
                camera.position.x * Vec2::X + LIVES_OFFSET,
            );
        }

        let outcome = match shared.status() {
            AppStatus::Won => "You won! :)",
            AppStatus::Lost => "You lost! :(",
            AppStatus::Running | AppStatus::Paused => return,
        };
        let anchor_x = self.followed_x().unwrap_or(CAMERA_LEFT_EDGE - 1.0);
        target.draw_text(
            level.font,
            outcome,
            HUD_SIZE,
            OUTCOME_SPACING,
            Vec2::new(anchor_x - 1.0, OUTCOME_Y),
        );
    }

    fn teardown(&mut self, ctx: &mut SceneContext<'_, GameSession>) {
        let Some(level) = self.state.take() else {
            return;
        };
        if level.music.is_some() {
            ctx.audio.stop_music();
        }
        info!(level = self.def.name.as_str(), "level_unloaded");
    }
}
