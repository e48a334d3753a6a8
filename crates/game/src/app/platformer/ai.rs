use engine::Vec2;
use serde::Deserialize;
use tracing::debug;

use super::entity::{Entity, EntityKind};

pub(crate) const GUARD_WAKE_DISTANCE: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum AiKind {
    Walker,
    Guard,
    Jumper,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum AiState {
    #[default]
    Idle,
    Walking,
    Attacking,
}

/// Runs the behaviour for the entity's AI kind. Guards need the player's
/// position and stay put without one.
pub(crate) fn activate(entity: &mut Entity, player_position: Option<Vec2>) {
    let EntityKind::Enemy { ai, .. } = entity.kind else {
        return;
    };
    match ai {
        AiKind::Walker => walk(entity),
        AiKind::Guard => {
            if let Some(player_position) = player_position {
                guard(entity, player_position);
            }
        }
        AiKind::Jumper => entity.jump(),
    }
}

/// Walks in the facing direction while grounded, otherwise drifts.
pub(crate) fn walk(entity: &mut Entity) {
    let direction = if entity.flags.bottom {
        if entity.facing_right {
            1.0
        } else {
            -1.0
        }
    } else {
        0.0
    };
    entity.movement = Vec2::new(direction, 0.0);
}

pub(crate) fn guard(entity: &mut Entity, player_position: Vec2) {
    let EntityKind::Enemy { ai, mut state } = entity.kind else {
        return;
    };
    if state == AiState::Idle && entity.position.distance(player_position) < GUARD_WAKE_DISTANCE {
        state = AiState::Walking;
        entity.kind = EntityKind::Enemy { ai, state };
        debug!(x = entity.position.x, y = entity.position.y, "guard_woke");
    }
    // Walking never falls back to Idle.
    if state == AiState::Walking {
        let direction = if entity.position.x > player_position.x {
            -1.0
        } else {
            1.0
        };
        entity.movement = Vec2::new(direction, 0.0);
    }
}

/// Walkers bounce off walls and platform edges.
pub(crate) fn turn_at_obstacles(entity: &mut Entity) {
    if entity.flags.right || entity.flags.gap_right {
        entity.move_left();
    } else if entity.flags.left || entity.flags.gap_left {
        entity.move_right();
    }
}
