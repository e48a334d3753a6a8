use std::collections::HashSet;

use glam::{Mat4, Vec3};
use serde::Deserialize;
use thiserror::Error;

use super::assets::TextureId;
use super::rendering::{AtlasFrame, RenderTarget};
use super::Vec2;

/// Overlap of a probe point with the tile it landed in, per axis, always >= 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileAtlas {
    pub texture: TextureId,
    pub cols: u32,
    pub rows: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TilemapError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("tile size must be positive")]
    ZeroTileSize,
    #[error("atlas grid must be at least 1x1, got {cols}x{rows}")]
    EmptyAtlasGrid { cols: u32, rows: u32 },
}

/// On-disk layout of a map: row-major ids, row 0 at the top.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TilemapDef {
    pub width: u32,
    pub height: u32,
    pub tile_size: f32,
    pub atlas: String,
    pub atlas_cols: u32,
    pub atlas_rows: u32,
    #[serde(default)]
    pub non_solid: Vec<u32>,
    pub tiles: Vec<u32>,
}

/// Tile origin convention:
/// - the centre of tile (x, y) is `(x * tile_size, -y * tile_size)`;
/// - row 0 is the top row, rows extend toward negative world y.
#[derive(Debug, Clone, PartialEq)]
pub struct Tilemap {
    width: u32,
    height: u32,
    tile_size: f32,
    tiles: Vec<u32>,
    non_solid: HashSet<u32>,
    atlas: TileAtlas,
}

impl Tilemap {
    pub fn new(
        width: u32,
        height: u32,
        tile_size: f32,
        tiles: Vec<u32>,
        atlas: TileAtlas,
    ) -> Result<Self, TilemapError> {
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(TilemapError::TileCountMismatch { expected, actual });
        }
        if tile_size.is_nan() || tile_size <= 0.0 {
            return Err(TilemapError::ZeroTileSize);
        }
        if atlas.cols == 0 || atlas.rows == 0 {
            return Err(TilemapError::EmptyAtlasGrid {
                cols: atlas.cols,
                rows: atlas.rows,
            });
        }
        Ok(Self {
            width,
            height,
            tile_size,
            tiles,
            non_solid: HashSet::new(),
            atlas,
        })
    }

    pub fn from_def(def: &TilemapDef, texture: TextureId) -> Result<Self, TilemapError> {
        let atlas = TileAtlas {
            texture,
            cols: def.atlas_cols,
            rows: def.atlas_rows,
        };
        Self::new(def.width, def.height, def.tile_size, def.tiles.clone(), atlas)
            .map(|map| map.with_non_solid(def.non_solid.iter().copied()))
    }

    /// Ids drawn as decoration but ignored by collision.
    pub fn with_non_solid(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.non_solid.extend(ids);
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn atlas(&self) -> TileAtlas {
        self.atlas
    }

    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn tile_at(&self, x: u32, y: u32) -> Option<u32> {
        self.index_of(x, y)
            .and_then(|index| self.tiles.get(index).copied())
    }

    pub fn tile_center_world(&self, x: u32, y: u32) -> Option<Vec2> {
        self.index_of(x, y)?;
        Some(Vec2::new(
            x as f32 * self.tile_size,
            -(y as f32) * self.tile_size,
        ))
    }

    pub fn is_solid_id(&self, id: u32) -> bool {
        id != 0 && !self.non_solid.contains(&id)
    }

    /// Returns the penetration of `point` into a solid tile, or `None` when
    /// the point is outside the map or over an empty/decorative tile.
    pub fn solid_at(&self, point: Vec2) -> Option<Penetration> {
        let half = self.tile_size * 0.5;
        let left_bound = -half;
        let right_bound = self.tile_size * self.width as f32 - half;
        let top_bound = half;
        let bottom_bound = -(self.tile_size * self.height as f32) + half;
        if point.x < left_bound
            || point.x > right_bound
            || point.y > top_bound
            || point.y < bottom_bound
        {
            return None;
        }

        let tile_x = ((point.x + half) / self.tile_size).floor();
        let tile_y = ((-point.y + half) / self.tile_size).floor();
        if tile_x < 0.0 || tile_y < 0.0 {
            return None;
        }
        let (tile_x, tile_y) = (tile_x as u32, tile_y as u32);
        let id = self.tile_at(tile_x, tile_y)?;
        if !self.is_solid_id(id) {
            return None;
        }

        let center = self.tile_center_world(tile_x, tile_y)?;
        Some(Penetration {
            x: half - (point.x - center.x).abs(),
            y: half - (point.y - center.y).abs(),
        })
    }

    pub fn render(&self, target: &mut dyn RenderTarget) {
        let scale = Mat4::from_scale(Vec3::new(self.tile_size, self.tile_size, 1.0));
        for y in 0..self.height {
            for x in 0..self.width {
                let Some(id) = self.tile_at(x, y).filter(|id| *id != 0) else {
                    continue;
                };
                let Some(center) = self.tile_center_world(x, y) else {
                    continue;
                };
                target.set_model_matrix(Mat4::from_translation(center.extend(0.0)) * scale);
                target.draw_atlas_frame(
                    self.atlas.texture,
                    AtlasFrame {
                        index: id,
                        cols: self.atlas.cols,
                        rows: self.atlas.rows,
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::DrawList;

    const ATLAS: TileAtlas = TileAtlas {
        texture: TextureId(0),
        cols: 4,
        rows: 1,
    };

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1.0e-5
    }

    #[test]
    fn new_rejects_invalid_tile_count() {
        let err = Tilemap::new(2, 2, 1.0, vec![0, 1, 2], ATLAS).expect_err("err");
        assert_eq!(
            err,
            TilemapError::TileCountMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn new_rejects_degenerate_geometry() {
        assert_eq!(
            Tilemap::new(1, 1, 0.0, vec![1], ATLAS).expect_err("size"),
            TilemapError::ZeroTileSize
        );
        let flat = TileAtlas { cols: 0, ..ATLAS };
        assert!(matches!(
            Tilemap::new(1, 1, 1.0, vec![1], flat),
            Err(TilemapError::EmptyAtlasGrid { .. })
        ));
    }

    #[test]
    fn indexing_and_bounds() {
        let map = Tilemap::new(2, 2, 1.0, vec![10, 11, 12, 13], ATLAS).expect("tilemap");
        assert_eq!(map.index_of(1, 1), Some(3));
        assert_eq!(map.tile_at(0, 1), Some(12));
        assert_eq!(map.tile_at(2, 0), None);
        assert_eq!(map.tile_center_world(1, 1), Some(Vec2::new(1.0, -1.0)));
    }

    #[test]
    fn probe_inside_solid_tile_reports_both_axes() {
        let map = Tilemap::new(2, 1, 1.0, vec![1, 0], ATLAS).expect("tilemap");
        let pen = map.solid_at(Vec2::new(0.3, -0.1)).expect("solid");
        assert!(approx(pen.x, 0.2));
        assert!(approx(pen.y, 0.4));
        assert!(map.solid_at(Vec2::new(1.2, 0.0)).is_none());
    }

    #[test]
    fn probe_outside_bounds_is_never_solid() {
        let map = Tilemap::new(1, 1, 1.0, vec![1], ATLAS).expect("tilemap");
        assert!(map.solid_at(Vec2::new(-0.6, 0.0)).is_none());
        assert!(map.solid_at(Vec2::new(0.0, 0.6)).is_none());
        assert!(map.solid_at(Vec2::new(0.0, -0.6)).is_none());
        assert!(map.solid_at(Vec2::new(0.6, 0.0)).is_none());
    }

    #[test]
    fn non_solid_ids_are_ignored_by_collision() {
        let map = Tilemap::new(1, 1, 1.0, vec![7], ATLAS)
            .expect("tilemap")
            .with_non_solid([7]);
        assert!(!map.is_solid_id(7));
        assert!(map.solid_at(Vec2::ZERO).is_none());
    }

    #[test]
    fn scaled_tiles_use_scaled_centres() {
        let map = Tilemap::new(2, 2, 2.0, vec![0, 0, 0, 3], ATLAS).expect("tilemap");
        let pen = map.solid_at(Vec2::new(2.5, -2.0)).expect("solid");
        assert!(approx(pen.x, 0.5));
        assert!(approx(pen.y, 1.0));
    }

    #[test]
    fn render_skips_empty_tiles() {
        let map = Tilemap::new(3, 1, 1.0, vec![2, 0, 3], ATLAS).expect("tilemap");
        let mut draws = DrawList::default();
        map.render(&mut draws);

        let commands = draws.commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[1].model.w_axis.x, 2.0);
    }

    #[test]
    fn def_carries_decorations() {
        let def = TilemapDef {
            width: 2,
            height: 1,
            tile_size: 1.0,
            atlas: "tiles".to_string(),
            atlas_cols: 4,
            atlas_rows: 1,
            non_solid: vec![2],
            tiles: vec![1, 2],
        };
        let map = Tilemap::from_def(&def, TextureId(3)).expect("tilemap");
        assert_eq!(map.atlas().texture, TextureId(3));
        assert!(map.is_solid_id(1));
        assert!(!map.is_solid_id(2));
    }
}
