//! Essentia Core -- shared vocabulary for the essentia transport simulation.
//!
//! This crate defines the pieces every other essentia crate builds on:
//! aspects and their frozen registry, 3D grid coordinates and faces, bulk
//! containers, the transport capability trait implemented by every tile that
//! can hold or move essentia, simulation events, configuration, and the
//! snapshot header used for persistence.
//!
//! # Suction in one paragraph
//!
//! Every tile advertises a [`transport::Suction`]: an optional aspect ("any"
//! when unset) and a magnitude. Tubes relay the strongest suction they can
//! see, and each tick a tile pulls at most one unit from a neighbor that
//! advertises strictly less suction than itself. Net flow therefore runs from
//! low demand toward high demand without any global solver.
//!
//! # Key Types
//!
//! - [`aspect::AspectRegistry`] -- immutable aspect table, frozen at startup.
//! - [`grid::GridPos`] / [`grid::Face`] / [`grid::SideMask`] -- placement and
//!   per-face connectivity.
//! - [`container::Container`] -- jars, reservoirs, void jars and alembics.
//! - [`transport::EssentiaTransport`] -- the capability every tile exposes.
//! - [`event::EventSink`] / [`event::EventLog`] -- fire-and-forget effects.
//! - [`config::EssentiaConfig`] -- tunables for the network and the handler.
//! - [`serialize`] -- versioned snapshot header over `bitcode`.

pub mod aspect;
pub mod config;
pub mod container;
pub mod event;
pub mod grid;
pub mod id;
pub mod serialize;
pub mod tick;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
