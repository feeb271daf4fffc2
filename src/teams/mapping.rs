use crate::error::{PipelineError, RegistryError};
use crate::models::{League, Source};
use crate::teams::registry::TeamRegistry;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Values the hand-maintained dictionary uses for "not filled in yet"
const PLACEHOLDERS: [&str; 3] = ["", "unknown", "unkown"];

/// Extra spelling for a team, e.g. after a site renames it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub source: Source,
    pub name: String,
}

/// One curated row of the team mapping table
///
/// Accepts both the contract field names and the legacy dictionary keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    #[serde(alias = "TeamID", default)]
    pub canonical_id: String,
    #[serde(alias = "Full Name", default)]
    pub display_name: String,
    #[serde(alias = "Team Rankings Name", default)]
    pub stats_site: String,
    #[serde(alias = "DraftKings Name", default)]
    pub sportsbook: String,
    #[serde(alias = "Covers", default)]
    pub results_site: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<AliasEntry>,
}

impl MappingEntry {
    fn usable(value: &str) -> Option<&str> {
        let trimmed = value.trim();
        if PLACEHOLDERS.contains(&trimmed.to_lowercase().as_str()) {
            None
        } else {
            Some(trimmed)
        }
    }

    /// Canonical id, falling back to a slug of the stats-site name
    pub fn id(&self) -> Option<String> {
        Self::usable(&self.canonical_id)
            .map(str::to_string)
            .or_else(|| Self::usable(&self.stats_site).map(slugify))
    }

    pub fn name(&self) -> Option<&str> {
        Self::usable(&self.display_name).or_else(|| Self::usable(&self.stats_site))
    }

    /// Every usable (source, raw name) pair this entry declares
    pub fn variants(&self) -> Vec<(Source, &str)> {
        let mut found = Vec::new();
        for (source, value) in [
            (Source::StatsSite, &self.stats_site),
            (Source::Sportsbook, &self.sportsbook),
            (Source::ResultsSite, &self.results_site),
        ] {
            if let Some(name) = Self::usable(value) {
                found.push((source, name));
            }
        }
        for alias in &self.aliases {
            if let Some(name) = Self::usable(&alias.name) {
                found.push((alias.source, name));
            }
        }
        found
    }
}

/// Lowercase, alphanumeric-and-underscore id derived from a name
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if c == '&' {
            slug.push_str("and");
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    slug.trim_end_matches('_').to_string()
}

/// Load the curated mapping table from JSON
pub fn load_mapping_table(path: &Path) -> Result<Vec<MappingEntry>, PipelineError> {
    let json = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| PipelineError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Build the registry for one league. Any integrity problem aborts.
///
/// Entries with neither an id nor a stats-site name are skipped; they are
/// skeleton rows nobody has curated yet.
pub fn build_registry(
    entries: &[MappingEntry],
    league: League,
) -> Result<TeamRegistry, RegistryError> {
    let mut registry = TeamRegistry::new();
    for entry in entries {
        let (Some(id), Some(name)) = (entry.id(), entry.name()) else {
            tracing::debug!("Skipping uncurated mapping entry {:?}", entry);
            continue;
        };
        registry.register(&id, name, league)?;
        for (source, raw_name) in entry.variants() {
            registry.add_variant(source, raw_name, &id)?;
        }
    }
    tracing::info!("Registry built with {} {} teams", registry.len(), league);
    Ok(registry)
}

/// Skeleton mapping rows for a list of stats-site names, awaiting manual curation
pub fn mapping_skeleton(team_names: &[String]) -> Vec<MappingEntry> {
    team_names
        .iter()
        .filter(|name| !name.trim().is_empty())
        .map(|name| MappingEntry {
            canonical_id: slugify(name),
            display_name: name.trim().to_string(),
            stats_site: name.trim().to_string(),
            ..Default::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Texas A&M"), "texas_aandm");
        assert_eq!(slugify("Miami (FL)"), "miami_fl");
        assert_eq!(slugify("  St. John's "), "st_john_s");
    }

    #[test]
    fn test_legacy_dictionary_keys() {
        let json = r#"[
            {
                "Team Rankings Index": 0,
                "Team Rankings Name": "Boston",
                "DraftKings Name": "BOS Celtics",
                "ESPNBet": "Celtics",
                "TeamID": "BOS",
                "PlainText": "Unknown",
                "Full Name": "Boston Celtics",
                "Covers": "Unkown"
            }
        ]"#;
        let entries: Vec<MappingEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0].id().as_deref(), Some("BOS"));
        assert_eq!(entries[0].name(), Some("Boston Celtics"));
        // Covers is a placeholder, so only two variants survive
        assert_eq!(
            entries[0].variants(),
            vec![
                (Source::StatsSite, "Boston"),
                (Source::Sportsbook, "BOS Celtics")
            ]
        );
    }

    #[test]
    fn test_build_registry() {
        let entries = vec![
            MappingEntry {
                canonical_id: "duke".to_string(),
                display_name: "Duke Blue Devils".to_string(),
                stats_site: "Duke".to_string(),
                sportsbook: "Duke Blue Devils".to_string(),
                results_site: "Duke".to_string(),
                aliases: vec![AliasEntry {
                    source: Source::Sportsbook,
                    name: "DUKE".to_string(),
                }],
            },
            MappingEntry {
                stats_site: "N Carolina".to_string(),
                sportsbook: "North Carolina Tar Heels".to_string(),
                ..Default::default()
            },
            MappingEntry::default(),
        ];
        let registry = build_registry(&entries, League::College).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.resolve(Source::ResultsSite, "Duke"),
            Some("duke")
        );
        assert_eq!(
            registry.resolve(Source::Sportsbook, "North Carolina Tar Heels"),
            Some("n_carolina")
        );
    }

    #[test]
    fn test_build_registry_conflict_aborts() {
        let entries = vec![
            MappingEntry {
                canonical_id: "a".to_string(),
                stats_site: "Alpha".to_string(),
                sportsbook: "Shared".to_string(),
                ..Default::default()
            },
            MappingEntry {
                canonical_id: "b".to_string(),
                stats_site: "Beta".to_string(),
                sportsbook: "Shared".to_string(),
                ..Default::default()
            },
        ];
        let err = build_registry(&entries, League::Pro).unwrap_err();
        assert!(matches!(err, RegistryError::ConflictingVariant { .. }));
    }

    #[test]
    fn test_mapping_skeleton() {
        let skeleton = mapping_skeleton(&["Saint Mary's".to_string(), " ".to_string()]);
        assert_eq!(skeleton.len(), 1);
        assert_eq!(skeleton[0].canonical_id, "saint_mary_s");
        assert_eq!(skeleton[0].stats_site, "Saint Mary's");
        assert!(skeleton[0].sportsbook.is_empty());
    }
}
