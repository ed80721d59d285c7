//! World snapshots.
//!
//! Persists tiles by position, pending signals, the network config and the
//! tick. Suction, vent cooldowns and bellows counts are derived and rebuilt
//! on the first tick after loading. Tile ids are not stable across a
//! snapshot round trip; positions are.

use std::collections::BTreeSet;

use essentia_core::config::NetworkConfig;
use essentia_core::grid::GridPos;
use essentia_core::serialize::{
    DeserializeError, SerializeError, SnapshotHeader, decode, encode,
};
use serde::{Deserialize, Serialize};

use crate::tile::Tile;
use crate::world::EssentiaWorld;

#[derive(Debug, Serialize, Deserialize)]
struct WorldSnapshot {
    header: SnapshotHeader,
    config: NetworkConfig,
    tiles: Vec<(GridPos, Tile)>,
    powered: Vec<GridPos>,
}

impl EssentiaWorld {
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = WorldSnapshot {
            header: SnapshotHeader::new(self.tick),
            config: self.config.clone(),
            tiles: self.iter().map(|(pos, _, t)| (pos, t.clone())).collect(),
            powered: self.powered.iter().copied().collect(),
        };
        encode(&snapshot)
    }

    /// Rebuild a world from [`EssentiaWorld::serialize`] output. The aspect
    /// registry is not part of the snapshot; attach it again with
    /// [`EssentiaWorld::with_aspects`].
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        let snapshot: WorldSnapshot = decode(data)?;
        snapshot.header.validate()?;

        let mut world = EssentiaWorld::new(snapshot.config);
        world.tick = snapshot.header.tick;
        for (pos, tile) in snapshot.tiles {
            tile.validate()
                .and_then(|()| world.place(pos, tile).map(|_| ()))
                .map_err(|e| DeserializeError::Inconsistent(format!("tile at {pos:?}: {e}")))?;
        }
        world.powered = snapshot.powered.into_iter().collect::<BTreeSet<_>>();
        Ok(world)
    }
}
