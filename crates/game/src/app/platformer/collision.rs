use engine::{Penetration, Tilemap, Vec2};
use serde::Deserialize;
use tracing::debug;

use super::entity::{Entity, EntityKind};

/// Feet probes sit this far below the bottom edge so a resting entity
/// always samples the tile it stands on.
const GROUND_PROBE_DEPTH: f32 = 1.0e-3;

/// Who is deactivated when a moving entity runs into another one sideways.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SideContact {
    #[default]
    DefeatMover,
    DefeatOther,
}

impl SideContact {
    fn as_token(self) -> &'static str {
        match self {
            Self::DefeatMover => "defeat_mover",
            Self::DefeatOther => "defeat_other",
        }
    }
}

fn is_defeatable(entity: &Entity) -> bool {
    matches!(entity.kind, EntityKind::Enemy { .. })
}

pub(crate) fn resolve_objects_x(entity: &mut Entity, objects: &mut [Entity], policy: SideContact) {
    for other in objects.iter_mut() {
        if !other.is_active() || !entity.overlaps(other) {
            continue;
        }
        let x_distance = (entity.position.x - other.position.x).abs();
        let x_overlap = (x_distance - entity.size.x / 2.0 - other.size.x / 2.0).abs();
        if entity.velocity.x > 0.0 {
            entity.position.x -= x_overlap;
            entity.flags.right = true;
        } else if entity.velocity.x < 0.0 {
            entity.position.x += x_overlap;
            entity.flags.left = true;
        }

        match policy {
            SideContact::DefeatMover => {
                debug!(
                    policy = policy.as_token(),
                    x = entity.position.x,
                    y = entity.position.y,
                    "entity_defeated"
                );
                entity.kill_off();
                return;
            }
            SideContact::DefeatOther if is_defeatable(other) => {
                debug!(
                    policy = policy.as_token(),
                    x = other.position.x,
                    y = other.position.y,
                    "entity_defeated"
                );
                other.kill_off();
            }
            SideContact::DefeatOther => {}
        }
    }
}

/// Landing on an enemy (moving down into it) deactivates that enemy.
pub(crate) fn resolve_objects_y(entity: &mut Entity, objects: &mut [Entity]) {
    for other in objects.iter_mut() {
        if !other.is_active() || !entity.overlaps(other) {
            continue;
        }
        let y_distance = (entity.position.y - other.position.y).abs();
        let y_overlap = (y_distance - entity.size.y / 2.0 - other.size.y / 2.0).abs();
        if entity.velocity.y > 0.0 {
            entity.position.y -= y_overlap;
            entity.velocity.y = 0.0;
            entity.flags.top = true;
        } else if entity.velocity.y < 0.0 {
            entity.position.y += y_overlap;
            entity.velocity.y = 0.0;
            entity.flags.bottom = true;
            if is_defeatable(other) {
                debug!(
                    policy = "stomp",
                    x = other.position.x,
                    y = other.position.y,
                    "entity_defeated"
                );
                other.kill_off();
            }
        }
    }
}

fn first_solid(map: &Tilemap, probes: &[Vec2]) -> Option<Penetration> {
    probes.iter().find_map(|probe| map.solid_at(*probe))
}

pub(crate) fn resolve_map_x(entity: &mut Entity, map: &Tilemap) {
    let half_width = entity.size.x / 2.0;
    let left = Vec2::new(entity.position.x - half_width, entity.position.y);
    let right = Vec2::new(entity.position.x + half_width, entity.position.y);

    if entity.velocity.x < 0.0 {
        if let Some(penetration) = map.solid_at(left) {
            entity.position.x += penetration.x;
            entity.velocity.x = 0.0;
            entity.flags.left = true;
        }
    }
    if entity.velocity.x > 0.0 {
        if let Some(penetration) = map.solid_at(right) {
            entity.position.x -= penetration.x;
            entity.velocity.x = 0.0;
            entity.flags.right = true;
        }
    }
}

/// Probes the centre and both corners of the leading edge; the first solid
/// hit wins.
pub(crate) fn resolve_map_y(entity: &mut Entity, map: &Tilemap) {
    let half = entity.size / 2.0;
    let Vec2 { x, y } = entity.position;

    if entity.velocity.y > 0.0 {
        let top = [
            Vec2::new(x, y + half.y),
            Vec2::new(x - half.x, y + half.y),
            Vec2::new(x + half.x, y + half.y),
        ];
        if let Some(penetration) = first_solid(map, &top) {
            entity.position.y -= penetration.y;
            entity.velocity.y = 0.0;
            entity.flags.top = true;
        }
    }
    if entity.velocity.y < 0.0 {
        let bottom = [
            Vec2::new(x, y - half.y),
            Vec2::new(x - half.x, y - half.y),
            Vec2::new(x + half.x, y - half.y),
        ];
        if let Some(penetration) = first_solid(map, &bottom) {
            entity.position.y += penetration.y;
            entity.velocity.y = 0.0;
            entity.flags.bottom = true;
        }
    }
}

/// Undoes this step's horizontal move when the ground ends on the side the
/// entity is heading toward.
pub(crate) fn check_platform_x(entity: &mut Entity, map: &Tilemap, delta_x: f32) {
    let half = entity.size / 2.0;
    let feet_y = entity.position.y - half.y - GROUND_PROBE_DEPTH;
    let bottom_left = Vec2::new(entity.position.x - half.x, feet_y);
    let bottom_right = Vec2::new(entity.position.x + half.x, feet_y);

    if map.solid_at(bottom_left).is_none() && entity.velocity.x < 0.0 {
        entity.position.x += delta_x.abs();
        entity.velocity.x = 0.0;
        entity.flags.gap_left = true;
    }
    if map.solid_at(bottom_right).is_none() && entity.velocity.x > 0.0 {
        entity.position.x -= delta_x.abs();
        entity.velocity.x = 0.0;
        entity.flags.gap_right = true;
    }
}
