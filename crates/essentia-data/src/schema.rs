//! Serde structs for the on-disk pack format.
//!
//! Everything here names aspects by key. The pack loader resolves keys into
//! [`essentia_core::id::AspectId`]s and builds engine types.

use essentia_core::grid::Face;
use serde::Deserialize;

// ===========================================================================
// Aspects
// ===========================================================================

/// One aspect definition. Compounds list two components by key; both must be
/// defined earlier in the same file.
#[derive(Debug, Clone, Deserialize)]
pub struct AspectData {
    pub key: String,
    /// `"#rrggbb"`.
    pub color: String,
    #[serde(default)]
    pub components: Option<(String, String)>,
}

/// TOML wrapper: `[[aspects]]` tables.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlAspects {
    pub aspects: Vec<AspectData>,
}

// ===========================================================================
// Layout
// ===========================================================================

/// What to place at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Tube,
    FilterTube,
    Buffer,
    Valve,
    Restricted,
    OneWay,
    Jar,
    VoidJar,
    Reservoir,
    Alembic,
    Bellows,
}

impl TileKind {
    pub fn is_container(self) -> bool {
        matches!(
            self,
            TileKind::Jar | TileKind::VoidJar | TileKind::Reservoir | TileKind::Alembic
        )
    }
}

/// A single placed tile.
#[derive(Debug, Clone, Deserialize)]
pub struct TileData {
    pub pos: (i32, i32, i32),
    pub kind: TileKind,
    /// Initial contents. Tubes hold at most one unit; buffers up to ten.
    #[serde(default)]
    pub aspect: Option<String>,
    #[serde(default = "default_amount")]
    pub amount: u32,
    /// Filter aspect for filter tubes and containers.
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub facing: Option<Face>,
    /// Faces to close, starting from the kind's default mask.
    #[serde(default)]
    pub closed: Vec<Face>,
    /// Containers only: hidden from the direct handler.
    #[serde(default)]
    pub blocked: bool,
}

fn default_amount() -> u32 {
    1
}

/// A world layout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayoutData {
    #[serde(default)]
    pub tiles: Vec<TileData>,
    /// Positions receiving a redstone signal at load.
    #[serde(default)]
    pub powered: Vec<(i32, i32, i32)>,
}
