pub mod mapping;
pub mod registry;
pub mod resolver;

pub use mapping::{build_registry, load_mapping_table, mapping_skeleton, MappingEntry};
pub use registry::{normalize_name, FrozenRegistry, TeamRegistry};
pub use resolver::{MatchPolicy, NameResolver, Resolution};
