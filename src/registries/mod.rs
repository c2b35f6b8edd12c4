mod pattern_registry;

pub use pattern_registry::{FilePatternRegistry, PatternPair, RegistryError};
