use crate::models::Source;
use crate::teams::registry::{normalize_name, FrozenRegistry};
use serde::Serialize;
use std::collections::BTreeMap;
use strsim::normalized_levenshtein;

/// Minimum similarity and winning margin a fuzzy match must clear
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    pub threshold: f64,
    pub margin: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            margin: 0.05,
        }
    }
}

/// Outcome of resolving one raw name
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    Exact { canonical_id: String },
    Fuzzy { canonical_id: String, score: f64 },
    Unresolved { raw_name: String },
}

impl Resolution {
    pub fn canonical_id(&self) -> Option<&str> {
        match self {
            Resolution::Exact { canonical_id } | Resolution::Fuzzy { canonical_id, .. } => {
                Some(canonical_id)
            }
            Resolution::Unresolved { .. } => None,
        }
    }
}

/// Maps raw names from any source onto canonical team ids
///
/// Pure and deterministic: no randomness, no I/O, and candidate scoring
/// iterates in a fixed order.
#[derive(Debug, Clone)]
pub struct NameResolver {
    registry: FrozenRegistry,
    policy: MatchPolicy,
}

impl NameResolver {
    pub fn new(registry: FrozenRegistry, policy: MatchPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &FrozenRegistry {
        &self.registry
    }

    pub fn resolve_or_flag(&self, source: Source, raw_name: &str) -> Resolution {
        let normalized = normalize_name(raw_name);
        if normalized.is_empty() {
            return Resolution::Unresolved {
                raw_name: raw_name.to_string(),
            };
        }

        if let Some(id) = self.registry.resolve(source, &normalized) {
            return Resolution::Exact {
                canonical_id: id.to_string(),
            };
        }

        // Best score per team across all of its spellings
        let mut best_by_team: BTreeMap<&str, f64> = BTreeMap::new();
        for (variant_name, variant) in self.registry.variants() {
            let score = normalized_levenshtein(&normalized, variant_name);
            let entry = best_by_team
                .entry(variant.canonical_id.as_str())
                .or_insert(0.0);
            if score > *entry {
                *entry = score;
            }
        }

        let mut ranked: Vec<(&str, f64)> = best_by_team.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        match ranked.as_slice() {
            [] => Resolution::Unresolved {
                raw_name: raw_name.to_string(),
            },
            [(id, score), rest @ ..] => {
                let runner_up = rest.first().map(|(_, s)| *s).unwrap_or(0.0);
                if *score >= self.policy.threshold && score - runner_up >= self.policy.margin {
                    Resolution::Fuzzy {
                        canonical_id: id.to_string(),
                        score: *score,
                    }
                } else {
                    Resolution::Unresolved {
                        raw_name: raw_name.to_string(),
                    }
                }
            }
        }
    }
}
