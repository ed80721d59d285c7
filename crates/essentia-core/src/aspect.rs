//! Aspects: the typed resource categories carried by the network.
//!
//! Aspects are registered once through [`AspectRegistryBuilder`] and frozen
//! into an [`AspectRegistry`]. A compound aspect names exactly two components
//! that must already be registered, which rules out self-reference and
//! cycles by construction.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::id::AspectId;

/// A 24-bit RGB display color (`0xRRGGBB`), used as the vent color hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    /// Parse `#rrggbb` or `rrggbb`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().map(Color)
    }

    pub fn to_hex(self) -> String {
        format!("#{:06x}", self.0 & 0x00ff_ffff)
    }
}

/// An aspect definition in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AspectDef {
    pub key: String,
    pub color: Color,
    /// `None` for primal aspects.
    pub components: Option<(AspectId, AspectId)>,
}

impl AspectDef {
    pub fn is_primal(&self) -> bool {
        self.components.is_none()
    }
}

/// Errors raised while registering aspects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AspectError {
    #[error("aspect '{0}' is already registered")]
    DuplicateKey(String),
    #[error("aspect '{aspect}' references unregistered component {component:?}")]
    UnknownComponent { aspect: String, component: AspectId },
    #[error("aspect '{0}' not found")]
    NotFound(String),
}

/// Builder for constructing an immutable [`AspectRegistry`].
#[derive(Debug, Default)]
pub struct AspectRegistryBuilder {
    aspects: Vec<AspectDef>,
    key_to_id: HashMap<String, AspectId>,
}

impl AspectRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a primal aspect. Returns its ID.
    pub fn register_primal(&mut self, key: &str, color: Color) -> Result<AspectId, AspectError> {
        self.insert(key, color, None)
    }

    /// Register a compound aspect made of two already-registered components.
    pub fn register_compound(
        &mut self,
        key: &str,
        color: Color,
        first: AspectId,
        second: AspectId,
    ) -> Result<AspectId, AspectError> {
        for component in [first, second] {
            if component.0 as usize >= self.aspects.len() {
                return Err(AspectError::UnknownComponent {
                    aspect: key.to_string(),
                    component,
                });
            }
        }
        self.insert(key, color, Some((first, second)))
    }

    /// Register a compound aspect, naming its components by key.
    pub fn register_compound_by_key(
        &mut self,
        key: &str,
        color: Color,
        first: &str,
        second: &str,
    ) -> Result<AspectId, AspectError> {
        let first = self
            .id(first)
            .ok_or_else(|| AspectError::NotFound(first.to_string()))?;
        let second = self
            .id(second)
            .ok_or_else(|| AspectError::NotFound(second.to_string()))?;
        self.register_compound(key, color, first, second)
    }

    pub fn id(&self, key: &str) -> Option<AspectId> {
        self.key_to_id.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.aspects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aspects.is_empty()
    }

    /// Freeze the registry.
    pub fn build(self) -> AspectRegistry {
        AspectRegistry {
            aspects: self.aspects,
            key_to_id: self.key_to_id,
        }
    }

    fn insert(
        &mut self,
        key: &str,
        color: Color,
        components: Option<(AspectId, AspectId)>,
    ) -> Result<AspectId, AspectError> {
        if self.key_to_id.contains_key(key) {
            return Err(AspectError::DuplicateKey(key.to_string()));
        }
        let id = AspectId(self.aspects.len() as u32);
        self.aspects.push(AspectDef {
            key: key.to_string(),
            color,
            components,
        });
        self.key_to_id.insert(key.to_string(), id);
        Ok(id)
    }
}

/// Immutable aspect table. Frozen after [`AspectRegistryBuilder::build`].
#[derive(Debug, Clone)]
pub struct AspectRegistry {
    aspects: Vec<AspectDef>,
    key_to_id: HashMap<String, AspectId>,
}

impl AspectRegistry {
    pub fn get(&self, id: AspectId) -> Option<&AspectDef> {
        self.aspects.get(id.0 as usize)
    }

    pub fn id(&self, key: &str) -> Option<AspectId> {
        self.key_to_id.get(key).copied()
    }

    pub fn key(&self, id: AspectId) -> Option<&str> {
        self.get(id).map(|def| def.key.as_str())
    }

    pub fn color(&self, id: AspectId) -> Option<Color> {
        self.get(id).map(|def| def.color)
    }

    pub fn components(&self, id: AspectId) -> Option<(AspectId, AspectId)> {
        self.get(id).and_then(|def| def.components)
    }

    pub fn is_primal(&self, id: AspectId) -> bool {
        self.get(id).is_some_and(AspectDef::is_primal)
    }

    pub fn len(&self) -> usize {
        self.aspects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aspects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AspectId, &AspectDef)> {
        self.aspects
            .iter()
            .enumerate()
            .map(|(i, def)| (AspectId(i as u32), def))
    }

    pub fn primals(&self) -> impl Iterator<Item = AspectId> + '_ {
        self.iter().filter(|(_, d)| d.is_primal()).map(|(id, _)| id)
    }

    pub fn compounds(&self) -> impl Iterator<Item = AspectId> + '_ {
        self.iter().filter(|(_, d)| !d.is_primal()).map(|(id, _)| id)
    }

    /// Reduce an aspect to the primal aspects it is built from, with counts.
    ///
    /// A primal maps to itself with count 1. Unknown ids reduce to nothing.
    pub fn primal_breakdown(&self, id: AspectId) -> BTreeMap<AspectId, u32> {
        let mut out = BTreeMap::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            match self.get(next) {
                Some(AspectDef {
                    components: Some((a, b)),
                    ..
                }) => {
                    stack.push(*a);
                    stack.push(*b);
                }
                Some(_) => *out.entry(next).or_insert(0) += 1,
                None => {}
            }
        }
        out
    }
}

/// The classic primal set plus common compounds, in a fixed order so the
/// resulting ids are stable: aer=0, terra=1, ignis=2, aqua=3, ordo=4,
/// perditio=5, then compounds.
pub fn standard_aspects() -> Result<AspectRegistry, AspectError> {
    const PRIMALS: [(&str, u32); 6] = [
        ("aer", 0xffff7e),
        ("terra", 0x56c000),
        ("ignis", 0xff5a01),
        ("aqua", 0x3cd4fc),
        ("ordo", 0xd5d4ec),
        ("perditio", 0x404040),
    ];
    const COMPOUNDS: [(&str, u32, &str, &str); 10] = [
        ("vacuos", 0x888888, "aer", "perditio"),
        ("lux", 0xfff663, "aer", "ignis"),
        ("tempestas", 0xffffff, "aer", "aqua"),
        ("motus", 0xcdccf4, "aer", "ordo"),
        ("gelum", 0xe1ffff, "ignis", "perditio"),
        ("vitreus", 0x80ffff, "terra", "ordo"),
        ("victus", 0xde0005, "aqua", "terra"),
        ("venenum", 0x89f000, "aqua", "perditio"),
        ("potentia", 0xc0ffff, "ordo", "ignis"),
        ("permutatio", 0x578357, "motus", "aqua"),
    ];

    let mut builder = AspectRegistryBuilder::new();
    for (key, color) in PRIMALS {
        builder.register_primal(key, Color(color))?;
    }
    for (key, color, a, b) in COMPOUNDS {
        builder.register_compound_by_key(key, Color(color), a, b)?;
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let mut b = AspectRegistryBuilder::new();
        let aer = b.register_primal("aer", Color(0xffff7e)).unwrap();
        let ignis = b.register_primal("ignis", Color(0xff5a01)).unwrap();
        let lux = b.register_compound("lux", Color(0xfff663), aer, ignis).unwrap();
        let reg = b.build();

        assert_eq!(reg.len(), 3);
        assert_eq!(reg.id("lux"), Some(lux));
        assert_eq!(reg.key(aer), Some("aer"));
        assert!(reg.is_primal(aer));
        assert!(!reg.is_primal(lux));
        assert_eq!(reg.components(lux), Some((aer, ignis)));
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut b = AspectRegistryBuilder::new();
        b.register_primal("aer", Color(0)).unwrap();
        let err = b.register_primal("aer", Color(1)).unwrap_err();
        assert_eq!(err, AspectError::DuplicateKey("aer".into()));
    }

    #[test]
    fn compound_cannot_reference_itself() {
        let mut b = AspectRegistryBuilder::new();
        let aer = b.register_primal("aer", Color(0)).unwrap();
        // The next id would be AspectId(1): naming it as a component must fail.
        let err = b
            .register_compound("loop", Color(0), aer, AspectId(1))
            .unwrap_err();
        assert!(matches!(err, AspectError::UnknownComponent { .. }));
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn compound_by_unknown_key_rejected() {
        let mut b = AspectRegistryBuilder::new();
        b.register_primal("aer", Color(0)).unwrap();
        let err = b
            .register_compound_by_key("vacuos", Color(0), "aer", "perditio")
            .unwrap_err();
        assert_eq!(err, AspectError::NotFound("perditio".into()));
    }

    #[test]
    fn standard_set_has_stable_ids() {
        let reg = standard_aspects().unwrap();
        assert_eq!(reg.id("aer"), Some(AspectId(0)));
        assert_eq!(reg.id("aqua"), Some(AspectId(3)));
        assert_eq!(reg.primals().count(), 6);
        assert_eq!(reg.compounds().count(), 10);
    }

    #[test]
    fn primal_breakdown_recurses() {
        let reg = standard_aspects().unwrap();
        let permutatio = reg.id("permutatio").unwrap();
        let breakdown = reg.primal_breakdown(permutatio);
        // permutatio = motus + aqua = (aer + ordo) + aqua
        assert_eq!(breakdown.get(&reg.id("aer").unwrap()), Some(&1));
        assert_eq!(breakdown.get(&reg.id("ordo").unwrap()), Some(&1));
        assert_eq!(breakdown.get(&reg.id("aqua").unwrap()), Some(&1));
        assert_eq!(breakdown.values().sum::<u32>(), 3);
    }

    #[test]
    fn color_hex_round_trip() {
        let c = Color::from_hex("#3cd4fc").unwrap();
        assert_eq!(c, Color(0x3cd4fc));
        assert_eq!(c.to_hex(), "#3cd4fc");
        assert!(Color::from_hex("#12345").is_none());
        assert!(Color::from_hex("zzzzzz").is_none());
    }
}
