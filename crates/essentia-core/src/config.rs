//! Tunables for the tube network and the direct-transfer handler.
//!
//! Every field has a serde default, so a config file only needs to name the
//! values it changes.

use serde::{Deserialize, Serialize};

use crate::tick::Ticks;

/// How close two advertised magnitudes must be to count as a routing
/// conflict when their aspects differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VentTolerance {
    /// Only equal magnitudes conflict.
    Exact,
    /// Equal, or the neighbor exactly one below.
    #[default]
    OneBelow,
}

impl VentTolerance {
    /// Whether a neighbor advertising `theirs` conflicts with `ours`.
    pub fn in_band(self, ours: u32, theirs: u32) -> bool {
        match self {
            VentTolerance::Exact => theirs == ours,
            VentTolerance::OneBelow => theirs == ours || theirs + 1 == ours,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Subtracted from relayed suction at each unrestricted tube hop.
    pub hop_decay: u32,
    pub vent_tolerance: VentTolerance,
    pub vent_cooldown: Ticks,
    pub propagate_interval: Ticks,
    pub equalize_interval: Ticks,
    pub valve_poll_interval: Ticks,
    /// Buffer suction contributed by each adjacent bellows.
    pub bellows_suction: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            hop_decay: 1,
            vent_tolerance: VentTolerance::OneBelow,
            vent_cooldown: 40,
            propagate_interval: 1,
            equalize_interval: 1,
            valve_poll_interval: 5,
            bellows_suction: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Ticks to wait before rescanning an origin whose scan found nothing.
    pub rescan_delay: Ticks,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self { rescan_delay: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EssentiaConfig {
    pub network: NetworkConfig,
    pub handler: HandlerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be at least 1")]
    ZeroInterval { field: &'static str },
}

impl EssentiaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = &self.network;
        for (field, value) in [
            ("network.propagate_interval", n.propagate_interval),
            ("network.equalize_interval", n.equalize_interval),
            ("network.valve_poll_interval", n.valve_poll_interval),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroInterval { field });
            }
        }
        Ok(())
    }
}
