//! Data-file loading for essentia packs.
//!
//! A pack is a directory holding up to three files, each in RON, TOML or
//! JSON: `aspects` (required), `essentia` (engine configuration) and
//! `layout` (tiles by position). [`load_pack`] reads them, resolves aspect
//! names and builds a ready-to-tick [`essentia_tubes::EssentiaWorld`].

pub mod loader;
pub mod pack;
pub mod schema;

pub use loader::DataLoadError;
pub use pack::{EssentiaPack, load_pack};
