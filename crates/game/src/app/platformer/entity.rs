use engine::{AtlasFrame, RenderTarget, TextureId, Tilemap, Vec2};
use glam::{Mat4, Vec3};

use super::ai::{self, AiKind, AiState};
use super::collision::{self, SideContact};

/// Horizontal collision extent as a fraction of the drawn width.
pub(crate) const HITBOX_RATIO: f32 = 0.8;
/// Where deactivated entities are parked until the scene is torn down.
pub(crate) const PARKED_POSITION: Vec2 = Vec2 { x: 0.0, y: -10.0 };
const WALK_FRAMES_PER_SECOND: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntityKind {
    Player,
    Enemy { ai: AiKind, state: AiState },
    Platform,
}

/// Per-step contact results; cleared at the start of every update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CollisionFlags {
    pub(crate) top: bool,
    pub(crate) bottom: bool,
    pub(crate) left: bool,
    pub(crate) right: bool,
    pub(crate) gap_left: bool,
    pub(crate) gap_right: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sprite {
    Quad(TextureId),
    Atlas {
        texture: TextureId,
        cols: u32,
        rows: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Animation {
    frames: Vec<u32>,
    index: usize,
    timer: f32,
    frames_per_second: f32,
}

impl Animation {
    pub(crate) fn new(frames: Vec<u32>, frames_per_second: f32) -> Self {
        Self {
            frames,
            index: 0,
            timer: 0.0,
            frames_per_second,
        }
    }

    pub(crate) fn walk_cycle(first_frame: u32) -> Self {
        Self::new(vec![first_frame, first_frame + 1], WALK_FRAMES_PER_SECOND)
    }

    pub(crate) fn still(frame: u32) -> Self {
        Self::new(vec![frame], WALK_FRAMES_PER_SECOND)
    }

    pub(crate) fn advance(&mut self, delta_time: f32) {
        if self.frames.is_empty() || self.frames_per_second <= 0.0 {
            return;
        }
        self.timer += delta_time;
        if self.timer >= 1.0 / self.frames_per_second {
            self.timer = 0.0;
            self.index = (self.index + 1) % self.frames.len();
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn current_frame(&self) -> u32 {
        self.frames.get(self.index).copied().unwrap_or_default()
    }
}

/// Rotation, thrust and gravity for entities that fly instead of walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Flight {
    pub(crate) angle_degrees: f32,
    pub(crate) tilt_speed: f32,
    pub(crate) thrust: f32,
    pub(crate) gravity: Vec2,
    pub(crate) flapping: bool,
}

/// Read-only inputs of one entity step.
#[derive(Clone, Copy)]
pub(crate) struct StepContext<'a> {
    pub(crate) map: &'a Tilemap,
    pub(crate) delta_time: f32,
    pub(crate) player_position: Option<Vec2>,
    pub(crate) side_contact: SideContact,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Entity {
    pub(crate) kind: EntityKind,
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) acceleration: Vec2,
    pub(crate) movement: Vec2,
    pub(crate) speed: f32,
    pub(crate) jump_power: f32,
    pub(crate) size: Vec2,
    pub(crate) hitbox_width: f32,
    pub(crate) facing_right: bool,
    pub(crate) flags: CollisionFlags,
    pub(crate) animation: Animation,
    pub(crate) sprite: Sprite,
    pub(crate) flight: Option<Flight>,
    jump_requested: bool,
    active: bool,
    model: Mat4,
}

impl Entity {
    fn with_kind(kind: EntityKind, position: Vec2, size: Vec2, sprite: Sprite) -> Self {
        let mut entity = Self {
            kind,
            position,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            movement: Vec2::ZERO,
            speed: 0.0,
            jump_power: 0.0,
            size,
            hitbox_width: size.x * HITBOX_RATIO,
            facing_right: matches!(kind, EntityKind::Player),
            flags: CollisionFlags::default(),
            animation: Animation::still(0),
            sprite,
            flight: None,
            jump_requested: false,
            active: true,
            model: Mat4::IDENTITY,
        };
        entity.rebuild_model();
        entity
    }

    pub(crate) fn player(position: Vec2, size: f32, sprite: Sprite) -> Self {
        Self::with_kind(EntityKind::Player, position, Vec2::splat(size), sprite)
    }

    pub(crate) fn enemy(
        position: Vec2,
        size: f32,
        sprite: Sprite,
        ai: AiKind,
        state: AiState,
    ) -> Self {
        Self::with_kind(
            EntityKind::Enemy { ai, state },
            position,
            Vec2::splat(size),
            sprite,
        )
    }

    pub(crate) fn platform(position: Vec2, size: Vec2, sprite: Sprite) -> Self {
        Self::with_kind(EntityKind::Platform, position, size, sprite)
    }

    pub(crate) fn with_motion(mut self, speed: f32, jump_power: f32, gravity: Vec2) -> Self {
        self.speed = speed;
        self.jump_power = jump_power;
        self.acceleration = gravity;
        self
    }

    pub(crate) fn with_animation(mut self, animation: Animation) -> Self {
        self.animation = animation;
        self
    }

    pub(crate) fn with_flight(mut self, flight: Flight) -> Self {
        self.acceleration = flight.gravity;
        self.flight = Some(flight);
        self.rebuild_model();
        self
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn model(&self) -> Mat4 {
        self.model
    }

    pub(crate) fn is_jump_requested(&self) -> bool {
        self.jump_requested
    }

    pub(crate) fn move_left(&mut self) {
        self.movement.x = -1.0;
        self.facing_right = false;
    }

    pub(crate) fn move_right(&mut self) {
        self.movement.x = 1.0;
        self.facing_right = true;
    }

    pub(crate) fn jump(&mut self) {
        self.jump_requested = true;
    }

    /// Axis-aligned overlap using the narrowed hitbox on x and full height on y.
    pub(crate) fn overlaps(&self, other: &Entity) -> bool {
        let x_reach = (self.hitbox_width + other.hitbox_width) / 2.0;
        let x_distance = (self.position.x - other.position.x).abs() - x_reach;
        let y_distance =
            (self.position.y - other.position.y).abs() - (self.size.y + other.size.y) / 2.0;
        x_distance < 0.0 && y_distance < 0.0
    }

    /// One fixed step: flags, animation, integration, x then y resolution,
    /// AI, jump and transform, in that order. Inactive entities are skipped.
    pub(crate) fn update(&mut self, ctx: &StepContext<'_>, objects: &mut [Entity]) {
        if !self.active {
            return;
        }

        self.flags = CollisionFlags::default();

        if self.movement.length() != 0.0 {
            self.animation.advance(ctx.delta_time);
        }

        self.velocity.x = self.movement.x * self.speed;
        self.velocity += self.acceleration * ctx.delta_time;

        self.position.x += self.velocity.x * ctx.delta_time;
        collision::resolve_objects_x(self, objects, ctx.side_contact);
        if !self.active {
            return;
        }
        collision::resolve_map_x(self, ctx.map);

        self.position.y += self.velocity.y * ctx.delta_time;
        collision::resolve_objects_y(self, objects);
        collision::resolve_map_y(self, ctx.map);

        if let EntityKind::Enemy { ai: ai_kind, .. } = self.kind {
            ai::activate(self, ctx.player_position);
            collision::check_platform_x(self, ctx.map, self.velocity.x * ctx.delta_time);
            if ai_kind == AiKind::Walker {
                ai::turn_at_obstacles(self);
            }
        }

        if self.jump_requested {
            self.jump_requested = false;
            self.velocity.y += self.jump_power;
        }

        self.rebuild_model();
    }

    /// Soft delete: parked off-screen, motionless and excluded from collision.
    pub(crate) fn kill_off(&mut self) {
        self.active = false;
        self.position = PARKED_POSITION;
        self.velocity = Vec2::ZERO;
        self.model = Mat4::IDENTITY;
    }

    pub(crate) fn reset(&mut self, map: &Tilemap, position: Vec2) {
        self.active = true;
        self.facing_right = true;
        self.position = position;
        self.velocity = Vec2::ZERO;
        self.movement = Vec2::ZERO;
        self.jump_requested = false;
        let settle = StepContext {
            map,
            delta_time: 0.0,
            player_position: None,
            side_contact: SideContact::default(),
        };
        self.update(&settle, &mut []);
    }

    /// Enemies only; other kinds have no AI state.
    pub(crate) fn set_ai_state(&mut self, state: AiState) {
        if let EntityKind::Enemy { ai, .. } = self.kind {
            self.kind = EntityKind::Enemy { ai, state };
        }
    }

    pub(crate) fn stop(&mut self) {
        self.velocity = Vec2::ZERO;
        self.acceleration = Vec2::ZERO;
    }

    pub(crate) fn tilt(&mut self, direction: f32) {
        if let Some(flight) = self.flight.as_mut() {
            flight.angle_degrees += direction * flight.tilt_speed;
        }
    }

    pub(crate) fn set_flapping(&mut self, flapping: bool) {
        if let Some(flight) = self.flight.as_mut() {
            flight.flapping = flapping;
        }
    }

    /// Points the acceleration along the entity's up vector while flapping.
    /// Returns whether a flap happened.
    pub(crate) fn flap(&mut self) -> bool {
        let Some(flight) = self.flight else {
            return false;
        };
        if flight.flapping {
            let heading = (flight.angle_degrees + 90.0).to_radians();
            self.acceleration = flight.thrust * Vec2::new(heading.cos(), heading.sin());
        }
        flight.flapping
    }

    /// Free flight: no collision, acceleration falls back to gravity afterwards.
    pub(crate) fn update_flight(&mut self, delta_time: f32) {
        let Some(flight) = self.flight else {
            return;
        };
        self.velocity += self.acceleration * delta_time;
        self.position += self.velocity * delta_time;
        self.rebuild_model();
        self.acceleration = flight.gravity;
    }

    pub(crate) fn rebuild_model(&mut self) {
        let translation = Mat4::from_translation(self.position.extend(0.0));
        self.model = match self.flight {
            Some(flight) => {
                translation
                    * Mat4::from_rotation_z(flight.angle_degrees.to_radians())
                    * Mat4::from_scale(Vec3::new(self.size.x, self.size.y, 1.0))
            }
            None => {
                let mirror = if self.facing_right { -1.0 } else { 1.0 };
                translation * Mat4::from_scale(Vec3::new(mirror * self.size.x, self.size.y, 1.0))
            }
        };
    }

    pub(crate) fn render(&self, target: &mut dyn RenderTarget) {
        if !self.active {
            return;
        }
        target.set_model_matrix(self.model);
        match self.sprite {
            Sprite::Quad(texture) => target.draw_quad(texture),
            Sprite::Atlas {
                texture,
                cols,
                rows,
            } => target.draw_atlas_frame(
                texture,
                AtlasFrame {
                    index: self.animation.current_frame(),
                    cols,
                    rows,
                },
            ),
        }
    }
}
