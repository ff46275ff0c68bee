//! Immutable tile map: grid, palette and the geometry queries the simulation needs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Tile code used outside the grid.
pub const EMPTY_TILE: char = ' ';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum TileEffect {
    #[default]
    None,
    Start,
    End,
    FullTrap,
    FloorTrap,
    Jump,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct TileData {
    #[serde(default)]
    pub solid: bool,
    #[serde(default)]
    pub effect: TileEffect,
}

impl TileData {
    pub const fn new(solid: bool, effect: TileEffect) -> Self {
        Self { solid, effect }
    }
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to read map: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse map: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("map has no rows")]
    Empty,

    #[error("row {row} has {found} tiles, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("tile size must be positive")]
    InvalidTileSize,
}

fn default_floor_probe() -> f32 {
    2.0
}

fn default_spawn_marker() -> char {
    '/'
}

/// On-disk layout of a map file.
#[derive(Debug, Deserialize)]
struct MapFile {
    tile_size: u32,
    #[serde(default = "default_floor_probe")]
    floor_probe: f32,
    #[serde(default = "default_spawn_marker")]
    spawn_marker: char,
    palette: HashMap<char, TileData>,
    rows: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MapData {
    tile_size: u32,
    width: usize,
    height: usize,
    tiles: Vec<char>,
    palette: HashMap<char, TileData>,
    floor_probe: f32,
    spawn: (f32, f32),
}

impl MapData {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, MapError> {
        let file: MapFile = serde_json::from_str(text)?;
        Self::build(
            file.tile_size,
            &file.rows,
            file.palette,
            file.floor_probe,
            file.spawn_marker,
        )
    }

    /// Build a map from rows of tile codes with the default probe and spawn marker.
    pub fn from_rows<S: AsRef<str>>(
        tile_size: u32,
        rows: &[S],
        palette: HashMap<char, TileData>,
    ) -> Result<Self, MapError> {
        Self::build(
            tile_size,
            rows,
            palette,
            default_floor_probe(),
            default_spawn_marker(),
        )
    }

    fn build<S: AsRef<str>>(
        tile_size: u32,
        rows: &[S],
        palette: HashMap<char, TileData>,
        floor_probe: f32,
        spawn_marker: char,
    ) -> Result<Self, MapError> {
        if tile_size == 0 {
            return Err(MapError::InvalidTileSize);
        }
        let width = rows.first().ok_or(MapError::Empty)?.as_ref().chars().count();
        if width == 0 {
            return Err(MapError::Empty);
        }

        let mut tiles = Vec::with_capacity(width * rows.len());
        for (row, line) in rows.iter().enumerate() {
            let before = tiles.len();
            tiles.extend(line.as_ref().chars());
            let found = tiles.len() - before;
            if found != width {
                return Err(MapError::RaggedRow {
                    row,
                    expected: width,
                    found,
                });
            }
        }

        let mut map = Self {
            tile_size,
            width,
            height: rows.len(),
            tiles,
            palette,
            floor_probe,
            spawn: (0.0, 0.0),
        };
        map.spawn = map.find_spawn(spawn_marker);
        Ok(map)
    }

    /// Centre of the first tile (row-major) holding `marker`, or the origin.
    fn find_spawn(&self, marker: char) -> (f32, f32) {
        let ts = self.tile_size as f32;
        self.tiles
            .iter()
            .position(|&tile| tile == marker)
            .map(|index| {
                let x = (index % self.width) as f32;
                let y = (index / self.width) as f32;
                ((x + 0.5) * ts, (y + 0.5) * ts)
            })
            .unwrap_or((0.0, 0.0))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Distance below a player at which floor traps look for solid ground.
    pub fn floor_probe(&self) -> f32 {
        self.floor_probe
    }

    pub fn spawn(&self) -> (f32, f32) {
        self.spawn
    }

    /// World-space y beyond which a player has fallen out of the map.
    pub fn lower_bound(&self) -> f32 {
        (self.tile_size as usize * self.height) as f32
    }

    pub fn tile(&self, x: i32, y: i32) -> char {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return EMPTY_TILE;
        }
        self.tiles[x as usize + y as usize * self.width]
    }

    pub fn tile_at_world(&self, x: f32, y: f32) -> char {
        let ts = self.tile_size as f32;
        self.tile((x / ts).floor() as i32, (y / ts).floor() as i32)
    }

    /// Palette entry for `code`; unknown codes are empty, non-solid tiles.
    pub fn tile_data(&self, code: char) -> TileData {
        self.palette.get(&code).copied().unwrap_or_default()
    }

    pub fn tile_data_at_world(&self, x: f32, y: f32) -> TileData {
        self.tile_data(self.tile_at_world(x, y))
    }

    /// Whether a box of `size` centred on `(x, y)` overlaps a solid tile at any corner.
    pub fn is_colliding_with(&self, x: f32, y: f32, size: (f32, f32)) -> bool {
        let (half_w, half_h) = (size.0 * 0.5, size.1 * 0.5);
        [(-half_w, -half_h), (half_w, -half_h), (-half_w, half_h), (half_w, half_h)]
            .iter()
            .any(|(dx, dy)| self.tile_data_at_world(x + dx, y + dy).solid)
    }
}
