//! The read-only spell/aura metadata boundary.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::LookupError;
use crate::id::SpellId;
use crate::model::{AuraInfo, SpellInfo};

/// Pure lookup service for static spell and aura data.
///
/// Implementations must be side-effect free: the same id always yields
/// the same answer for the lifetime of the provider.
pub trait MetadataProvider: Send + Sync {
    /// Spell metadata, or [`LookupError::SpellNotFound`].
    fn spell_info(&self, id: SpellId) -> Result<Arc<SpellInfo>, LookupError>;

    /// Aura metadata, or [`LookupError::AuraNotFound`].
    fn aura_info(&self, id: SpellId) -> Result<Arc<AuraInfo>, LookupError>;
}

/// In-memory [`MetadataProvider`] backed by insertion-ordered tables.
#[derive(Clone, Debug, Default)]
pub struct StaticMetadata {
    spells: IndexMap<SpellId, Arc<SpellInfo>>,
    auras: IndexMap<SpellId, Arc<AuraInfo>>,
}

impl StaticMetadata {
    /// Empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a spell.
    pub fn with_spell(mut self, info: SpellInfo) -> Self {
        self.insert_spell(info);
        self
    }

    /// Add (or replace) an aura.
    pub fn with_aura(mut self, info: AuraInfo) -> Self {
        self.insert_aura(info);
        self
    }

    /// Add (or replace) a spell, returning the shared handle.
    pub fn insert_spell(&mut self, info: SpellInfo) -> Arc<SpellInfo> {
        let info = Arc::new(info);
        self.spells.insert(info.id, Arc::clone(&info));
        info
    }

    /// Add (or replace) an aura, returning the shared handle.
    pub fn insert_aura(&mut self, info: AuraInfo) -> Arc<AuraInfo> {
        let info = Arc::new(info);
        self.auras.insert(info.id, Arc::clone(&info));
        info
    }

    /// Number of spells known.
    pub fn spell_count(&self) -> usize {
        self.spells.len()
    }
}

impl MetadataProvider for StaticMetadata {
    fn spell_info(&self, id: SpellId) -> Result<Arc<SpellInfo>, LookupError> {
        self.spells
            .get(&id)
            .cloned()
            .ok_or(LookupError::SpellNotFound(id))
    }

    fn aura_info(&self, id: SpellId) -> Result<Arc<AuraInfo>, LookupError> {
        self.auras
            .get(&id)
            .cloned()
            .ok_or(LookupError::AuraNotFound(id))
    }
}
