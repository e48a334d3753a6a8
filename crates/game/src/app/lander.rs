use engine::{
    Camera2D, InputAction, InputSnapshot, RenderTarget, Scene, SceneCommand, SceneContext,
    SceneInitError, TextureId, Vec2,
};
use tracing::info;

use super::platformer::{Animation, Entity, Flight, Sprite};
use super::session::{AppStatus, GameSession};

pub(crate) const LANDER_TPS: u32 = 30;
const GRAVITY: Vec2 = Vec2 { x: 0.0, y: -0.3 };
const THRUST: f32 = 0.4;
/// Degrees per step while a tilt key is held.
const TILT_SPEED: f32 = 0.8;
const FLAP_FRAMES: u32 = 6;
const FLAP_FRAMES_PER_SECOND: f32 = 6.0;
const BIRD_START: Vec2 = Vec2 { x: -2.5, y: 0.0 };
const BIRD_SCALE: f32 = 0.5;
const PLATFORM_POSITION: Vec2 = Vec2 { x: 3.0, y: -1.0 };
const PLATFORM_SCALE: Vec2 = Vec2 { x: 1.0, y: 0.25 };
const HALF_VIEW: Vec2 = Vec2 { x: 5.0, y: 3.75 };
const CAPTION_SIZE: f32 = 0.3;
const CAPTION_SPACING: f32 = 0.03;

const BIRD_TEXTURE: &str = "bird_spritesheet";
const PLATFORM_TEXTURE: &str = "platform_tile";
const FONT_TEXTURE: &str = "font1";

struct LanderState {
    bird: Entity,
    platform: Entity,
    font: TextureId,
}

#[derive(Default)]
pub(crate) struct LanderScene {
    state: Option<LanderState>,
}

pub(crate) fn spawn_bird(texture: TextureId) -> Entity {
    Entity::player(
        BIRD_START,
        BIRD_SCALE,
        Sprite::Atlas {
            texture,
            cols: FLAP_FRAMES,
            rows: 1,
        },
    )
    .with_animation(Animation::new(
        (0..FLAP_FRAMES).collect(),
        FLAP_FRAMES_PER_SECOND,
    ))
    .with_flight(Flight {
        angle_degrees: 0.0,
        tilt_speed: TILT_SPEED,
        thrust: THRUST,
        gravity: GRAVITY,
        flapping: false,
    })
}

pub(crate) fn spawn_platform(texture: TextureId) -> Entity {
    Entity::platform(PLATFORM_POSITION, PLATFORM_SCALE, Sprite::Quad(texture))
}

/// Space held while paused starts the run; while running it flaps and the
/// arrows tilt.
pub(crate) fn steer_bird(bird: &mut Entity, input: &InputSnapshot, session: &mut GameSession) {
    match session.status() {
        AppStatus::Paused => {
            if input.is_down(InputAction::Primary) {
                session.resume();
            }
        }
        AppStatus::Running => {
            bird.set_flapping(input.is_down(InputAction::Primary));
            if input.is_down(InputAction::MoveLeft) {
                bird.tilt(1.0);
            } else if input.is_down(InputAction::MoveRight) {
                bird.tilt(-1.0);
            }
        }
        AppStatus::Won | AppStatus::Lost => {}
    }
}

/// Border and landing checks run on the pre-step position, then the bird
/// integrates.
pub(crate) fn step_bird(
    bird: &mut Entity,
    platform: &Entity,
    delta_time: f32,
    session: &mut GameSession,
) {
    if bird.flap() {
        bird.animation.advance(delta_time);
    }

    let border_room = HALF_VIEW - bird.position.abs() - bird.size / 2.0;
    if border_room.x <= 0.0 || border_room.y <= 0.0 {
        bird.stop();
        info!(x = bird.position.x, y = bird.position.y, "bird_hit_border");
        session.finish(false);
    }

    let gap = (bird.position - platform.position).abs() - (bird.size + platform.size) / 2.0;
    if gap.x < 0.0 && gap.y < 0.0 {
        bird.stop();
        let landed = bird.position.y >= platform.position.y;
        info!(
            x = bird.position.x,
            y = bird.position.y,
            landed,
            "bird_touched_platform"
        );
        session.finish(landed);
    }

    bird.update_flight(delta_time);
}

impl Scene<GameSession> for LanderScene {
    fn name(&self) -> &str {
        "lander"
    }

    fn initialise(
        &mut self,
        ctx: &mut SceneContext<'_, GameSession>,
    ) -> Result<(), SceneInitError> {
        let bird = spawn_bird(ctx.assets.load_texture(BIRD_TEXTURE)?);
        let platform = spawn_platform(ctx.assets.load_texture(PLATFORM_TEXTURE)?);
        let font = ctx.assets.load_texture(FONT_TEXTURE)?;
        self.state = Some(LanderState {
            bird,
            platform,
            font,
        });
        Ok(())
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        ctx: &mut SceneContext<'_, GameSession>,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        steer_bird(&mut state.bird, input, ctx.shared);
        if ctx.shared.is_running() {
            step_bird(&mut state.bird, &state.platform, fixed_dt_seconds, ctx.shared);
        }
    }

    fn end_frame(&mut self, _ctx: &mut SceneContext<'_, GameSession>) -> SceneCommand {
        SceneCommand::None
    }

    fn camera(&self, _shared: &GameSession) -> Camera2D {
        Camera2D::default()
    }

    fn render(&self, shared: &GameSession, target: &mut dyn RenderTarget) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        state.bird.render(target);
        state.platform.render(target);

        let captions: &[(&str, Vec2)] = match shared.status() {
            AppStatus::Paused => &[
                ("Don't touch the Border!", Vec2::new(-3.5, 2.0)),
                ("Hit Space to Start!", Vec2::new(-3.35, 1.6)),
            ],
            AppStatus::Won => &[("You won!", Vec2::new(-1.75, 2.0))],
            AppStatus::Lost => &[("You lost :(", Vec2::new(-2.5, 2.0))],
            AppStatus::Running => &[],
        };
        for (text, position) in captions {
            target.draw_text(state.font, text, CAPTION_SIZE, CAPTION_SPACING, *position);
        }
    }

    fn teardown(&mut self, _ctx: &mut SceneContext<'_, GameSession>) {
        self.state = None;
    }
}
