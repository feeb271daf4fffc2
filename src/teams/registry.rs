use crate::error::RegistryError;
use crate::models::{League, NameVariant, Source, TeamIdentity};
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

/// Normalize a raw team name for lookup: trim, casefold, collapse whitespace
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<String>>()
        .join(" ")
}

/// Canonical team records plus every known per-source spelling
///
/// Built once from the curated mapping table, then frozen with
/// [`TeamRegistry::freeze`] before any join work starts.
#[derive(Debug, Default, Clone)]
pub struct TeamRegistry {
    teams: HashMap<String, TeamIdentity>,
    order: Vec<String>,
    variants: HashMap<(Source, String), NameVariant>,
}

impl TeamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a canonical team. Re-registering identical attributes is a no-op.
    pub fn register(
        &mut self,
        canonical_id: &str,
        display_name: &str,
        league: League,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.teams.get(canonical_id) {
            if existing.display_name == display_name && existing.league == league {
                return Ok(());
            }
            return Err(RegistryError::DuplicateIdentity {
                canonical_id: canonical_id.to_string(),
                existing_name: existing.display_name.clone(),
                existing_league: existing.league,
            });
        }

        self.teams.insert(
            canonical_id.to_string(),
            TeamIdentity {
                canonical_id: canonical_id.to_string(),
                display_name: display_name.to_string(),
                league,
            },
        );
        self.order.push(canonical_id.to_string());
        Ok(())
    }

    /// Map a per-source spelling onto a registered team. Never overwrites.
    pub fn add_variant(
        &mut self,
        source: Source,
        raw_name: &str,
        canonical_id: &str,
    ) -> Result<(), RegistryError> {
        if !self.teams.contains_key(canonical_id) {
            return Err(RegistryError::UnknownIdentity {
                site: source,
                raw_name: raw_name.to_string(),
                canonical_id: canonical_id.to_string(),
            });
        }

        let key = (source, normalize_name(raw_name));
        if let Some(existing) = self.variants.get(&key) {
            if existing.canonical_id == canonical_id {
                return Ok(());
            }
            return Err(RegistryError::ConflictingVariant {
                site: source,
                raw_name: raw_name.to_string(),
                existing: existing.canonical_id.clone(),
                requested: canonical_id.to_string(),
            });
        }

        self.variants.insert(
            key,
            NameVariant {
                source,
                raw_name: raw_name.trim().to_string(),
                canonical_id: canonical_id.to_string(),
            },
        );
        Ok(())
    }

    /// Exact lookup of a (source, raw name) pair. `None` means not found.
    pub fn resolve(&self, source: Source, raw_name: &str) -> Option<&str> {
        self.variants
            .get(&(source, normalize_name(raw_name)))
            .map(|v| v.canonical_id.as_str())
    }

    pub fn team(&self, canonical_id: &str) -> Option<&TeamIdentity> {
        self.teams.get(canonical_id)
    }

    /// Stable index of a team in registration order, used as a categorical feature
    pub fn encoding_index(&self, canonical_id: &str) -> Option<usize> {
        self.order.iter().position(|id| id == canonical_id)
    }

    /// Teams in registration order
    pub fn teams(&self) -> impl Iterator<Item = &TeamIdentity> {
        self.order.iter().filter_map(|id| self.teams.get(id))
    }

    /// All variants, sorted by (source, normalized name) so callers iterate deterministically
    pub fn variants(&self) -> Vec<(&str, &NameVariant)> {
        let mut all: Vec<(&str, &NameVariant)> = self
            .variants
            .iter()
            .map(|((_, normalized), variant)| (normalized.as_str(), variant))
            .collect();
        all.sort_by(|a, b| (a.1.source, a.0).cmp(&(b.1.source, b.0)));
        all
    }

    pub fn variants_for(&self, canonical_id: &str) -> Vec<&NameVariant> {
        let mut found: Vec<&NameVariant> = self
            .variants
            .values()
            .filter(|v| v.canonical_id == canonical_id)
            .collect();
        found.sort_by(|a, b| (a.source, &a.raw_name).cmp(&(b.source, &b.raw_name)));
        found
    }

    /// Spellings of one team grouped by site, every site listed even when it has none
    pub fn known_names(&self, canonical_id: &str) -> Vec<(Source, Vec<&str>)> {
        let variants = self.variants_for(canonical_id);
        Source::ALL
            .iter()
            .map(|source| {
                let names = variants
                    .iter()
                    .filter(|v| v.source == *source)
                    .map(|v| v.raw_name.as_str())
                    .collect();
                (*source, names)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Finish building. The snapshot is read-only and cheap to share across workers.
    pub fn freeze(self) -> FrozenRegistry {
        FrozenRegistry(Arc::new(self))
    }
}

/// Read-only, shareable registry snapshot
#[derive(Debug, Clone)]
pub struct FrozenRegistry(Arc<TeamRegistry>);

impl Deref for FrozenRegistry {
    type Target = TeamRegistry;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
