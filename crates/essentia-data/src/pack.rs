//! Resolve a pack directory into a registry, a configuration and a world.

use std::collections::HashMap;
use std::path::Path;

use essentia_core::aspect::{AspectRegistry, AspectRegistryBuilder, Color};
use essentia_core::config::EssentiaConfig;
use essentia_core::container::{Container, ContainerKind};
use essentia_core::grid::{Face, GridPos, SideMask};
use essentia_core::id::AspectId;
use essentia_core::transport::{BUFFER_CAPACITY, TUBE_CAPACITY};
use essentia_tubes::{Bellows, EssentiaWorld, Tile, TubeNode, TubeVariant};
use log::{debug, info};

use crate::loader::{
    DataLoadError, check_duplicate, deserialize_file, deserialize_list, find_data_file,
    require_data_file, resolve_name,
};
use crate::schema::{AspectData, LayoutData, TileData, TileKind};

/// Everything a pack directory describes.
#[derive(Debug)]
pub struct EssentiaPack {
    pub aspects: AspectRegistry,
    pub config: EssentiaConfig,
    pub world: EssentiaWorld,
}

/// Load `aspects` (required), `essentia` and `layout` (optional) from `dir`.
pub fn load_pack(dir: &Path) -> Result<EssentiaPack, DataLoadError> {
    let aspects_path = require_data_file(dir, "aspects")?;
    let records: Vec<AspectData> = deserialize_list(&aspects_path, "aspects")?;
    let aspects = build_registry(&records, &aspects_path)?;

    let config = match find_data_file(dir, "essentia")? {
        Some(path) => deserialize_file::<EssentiaConfig>(&path)?,
        None => EssentiaConfig::default(),
    };
    config.validate()?;

    let mut world = EssentiaWorld::new(config.network.clone()).with_aspects(aspects.clone());
    if let Some(path) = find_data_file(dir, "layout")? {
        let layout: LayoutData = deserialize_file(&path)?;
        populate(&mut world, &layout, &aspects, &path)?;
    }

    info!(
        "loaded pack {}: {} aspects, {} tiles",
        dir.display(),
        aspects.len(),
        world.len()
    );
    Ok(EssentiaPack {
        aspects,
        config,
        world,
    })
}

/// Build a registry from records in file order.
pub fn build_registry(records: &[AspectData], file: &Path) -> Result<AspectRegistry, DataLoadError> {
    let mut builder = AspectRegistryBuilder::new();
    let mut ids: HashMap<String, AspectId> = HashMap::new();

    for record in records {
        check_duplicate(&ids, &record.key, file)?;
        let color = Color::from_hex(&record.color).ok_or_else(|| DataLoadError::InvalidColor {
            file: file.to_path_buf(),
            aspect: record.key.clone(),
            color: record.color.clone(),
        })?;
        let id = match &record.components {
            None => builder.register_primal(&record.key, color)?,
            Some((a, b)) => {
                let first = *resolve_name(&ids, a, file, "aspect")?;
                let second = *resolve_name(&ids, b, file, "aspect")?;
                builder.register_compound(&record.key, color, first, second)?
            }
        };
        ids.insert(record.key.clone(), id);
    }

    Ok(builder.build())
}

/// Place every tile of `layout` and apply its initial signals.
pub fn populate(
    world: &mut EssentiaWorld,
    layout: &LayoutData,
    aspects: &AspectRegistry,
    file: &Path,
) -> Result<(), DataLoadError> {
    for data in &layout.tiles {
        let tile = build_tile(data, aspects, file)?;
        world.place(grid_pos(data.pos), tile)?;
    }
    for &pos in &layout.powered {
        world.set_powered(grid_pos(pos), true);
    }
    debug!(
        "{}: placed {} tiles, {} powered",
        file.display(),
        layout.tiles.len(),
        layout.powered.len()
    );
    Ok(())
}

fn grid_pos((x, y, z): (i32, i32, i32)) -> GridPos {
    GridPos::new(x, y, z)
}

fn lookup(aspects: &AspectRegistry, key: &str, file: &Path) -> Result<AspectId, DataLoadError> {
    aspects.id(key).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: key.to_string(),
        expected_kind: "aspect",
    })
}

fn build_tile(data: &TileData, aspects: &AspectRegistry, file: &Path) -> Result<Tile, DataLoadError> {
    let pos = grid_pos(data.pos);
    let invalid = |detail: String| DataLoadError::InvalidTile {
        file: file.to_path_buf(),
        pos,
        detail,
    };
    let contents = data
        .aspect
        .as_deref()
        .map(|key| lookup(aspects, key, file))
        .transpose()?;
    let filter = data
        .filter
        .as_deref()
        .map(|key| lookup(aspects, key, file))
        .transpose()?;

    if data.kind == TileKind::Bellows {
        let facing = data
            .facing
            .ok_or_else(|| invalid("bellows need a facing".to_string()))?;
        return Ok(Tile::Bellows(Bellows { facing }));
    }

    if data.kind.is_container() {
        let kind = match data.kind {
            TileKind::Jar => ContainerKind::Jar,
            TileKind::VoidJar => ContainerKind::VoidJar,
            TileKind::Reservoir => ContainerKind::Reservoir,
            _ => ContainerKind::Alembic,
        };
        let mut container = Container::new(kind);
        if let Some(aspect) = filter {
            container = container.with_filter(aspect)?;
        }
        if let Some(aspect) = contents {
            container = container.with_contents(aspect, data.amount)?;
        }
        for &face in &data.closed {
            container.set_side(face, false);
        }
        container.blocked = data.blocked;
        return Ok(Tile::Container(container));
    }

    let mut node = match data.kind {
        TileKind::FilterTube => TubeNode::new(TubeVariant::Filter { aspect: filter }),
        TileKind::Buffer => TubeNode::new_buffer(),
        TileKind::Valve => TubeNode::new_valve(),
        TileKind::Restricted => TubeNode::restricted(),
        TileKind::OneWay => TubeNode::one_way(data.facing.unwrap_or(Face::Up)),
        _ => TubeNode::standard(),
    };
    if let Some(facing) = data.facing {
        node.facing = facing;
    }
    if let Some(aspect) = contents {
        let capacity = if node.is_buffer() {
            BUFFER_CAPACITY
        } else {
            TUBE_CAPACITY
        };
        if data.amount > capacity {
            return Err(invalid(format!(
                "{} units exceed tube capacity {capacity}",
                data.amount
            )));
        }
        if let Some(only) = node.filter_override()
            && only != aspect
        {
            return Err(invalid("cargo does not match the tube filter".to_string()));
        }
        for _ in 0..data.amount {
            node = node.with_cargo(aspect);
        }
    }
    let mut sides = SideMask::ALL;
    for &face in &data.closed {
        sides.set(face, false);
    }
    Ok(Tile::Tube(node.with_sides(sides)))
}
