use crate::contexts::{PatternExtractor, ResponseFormat};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

const LANGUAGE_PLACEHOLDER: &str = "{language}";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read pattern registry {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid pattern registry YAML: {0}")]
    Yaml(String),
    #[error("Format '{name}' is missing the '{field}' pattern")]
    MissingPattern { name: String, field: &'static str },
    #[error("Unknown response format '{0}'")]
    UnknownFormat(String),
    #[error("Invalid pattern for format '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// Implementation and test patterns for one response format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternPair {
    pub implementation: String,
    pub test: String,
}

/// File-based registry of response formats
/// Built-in formats are always present; the YAML file may add new ones or override them
#[derive(Clone)]
pub struct FilePatternRegistry {
    registry_path: PathBuf,
    language: String,
}

impl FilePatternRegistry {
    /// Creates a new FilePatternRegistry
    ///
    /// # Arguments
    /// * `registry_path` - Optional path to registry file (defaults to "agentgen/patterns.yml")
    /// * `language` - Target language substituted for `{language}` in patterns
    pub fn new(registry_path: Option<PathBuf>, language: &str) -> Self {
        Self {
            registry_path: registry_path.unwrap_or_else(|| PathBuf::from("agentgen/patterns.yml")),
            language: language.to_string(),
        }
    }

    /// Loads the custom formats from the file
    fn load_registry(&self) -> Result<BTreeMap<String, PatternPair>, RegistryError> {
        if !self.registry_path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.registry_path).map_err(|source| RegistryError::Read {
            path: self.registry_path.clone(),
            source,
        })?;

        parse_registry(&content, &self.language)
    }

    /// All known formats by name, built-ins first overridden by the file
    pub fn formats(&self) -> Result<BTreeMap<String, PatternPair>, RegistryError> {
        let mut formats: BTreeMap<String, PatternPair> = ResponseFormat::ALL
            .into_iter()
            .map(|format| {
                let (implementation, test) = format.patterns(&self.language);
                (format.name().to_string(), PatternPair { implementation, test })
            })
            .collect();

        formats.extend(self.load_registry()?);
        Ok(formats)
    }

    /// Looks up a format by exact name, falling back to a case-insensitive
    /// match on the built-in format names
    pub fn get_patterns(&self, name: &str) -> Result<PatternPair, RegistryError> {
        let mut formats = self.formats()?;
        if let Some(pair) = formats.remove(name) {
            return Ok(pair);
        }

        ResponseFormat::from_name(name)
            .and_then(|format| formats.remove(format.name()))
            .ok_or_else(|| RegistryError::UnknownFormat(name.to_string()))
    }

    /// Builds an extractor for the named format
    pub fn extractor(&self, name: &str) -> Result<PatternExtractor, RegistryError> {
        let patterns = self.get_patterns(name)?;
        PatternExtractor::new(&patterns.implementation, &patterns.test).map_err(|source| {
            RegistryError::InvalidPattern {
                name: name.to_string(),
                source,
            }
        })
    }
}

/// Parses the YAML registry file into a map of format name to pattern pair
fn parse_registry(
    yaml_content: &str,
    language: &str,
) -> Result<BTreeMap<String, PatternPair>, RegistryError> {
    use yaml_rust::{Yaml, YamlLoader};

    let docs = YamlLoader::load_from_str(yaml_content)
        .map_err(|e| RegistryError::Yaml(e.to_string()))?;

    let mut registry = BTreeMap::new();
    let Some(doc) = docs.first() else {
        return Ok(registry);
    };
    if doc.is_null() {
        return Ok(registry);
    }

    let hash = doc
        .as_hash()
        .ok_or_else(|| RegistryError::Yaml("top level must be a map of format names".to_string()))?;

    let language = regex::escape(&language.to_lowercase());
    for (key, value) in hash {
        let Some(name) = key.as_str() else {
            continue;
        };
        let entry = value.as_hash().ok_or_else(|| {
            RegistryError::Yaml(format!("format '{}' must map to implementation and test", name))
        })?;

        let field = |field: &'static str| {
            entry
                .get(&Yaml::String(field.to_string()))
                .and_then(|v| v.as_str())
                .map(|pattern| pattern.replace(LANGUAGE_PLACEHOLDER, &language))
                .ok_or_else(|| RegistryError::MissingPattern {
                    name: name.to_string(),
                    field,
                })
        };

        registry.insert(
            name.to_string(),
            PatternPair {
                implementation: field("implementation")?,
                test: field("test")?,
            },
        );
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ResponseParser;
    use tempfile::TempDir;

    #[test]
    fn test_parse_registry() {
        let yaml = r#"
xml:
  implementation: '<code>(.*?)</code>'
  test: '<test>(.*?)</test>'
"#;

        let registry = parse_registry(yaml, "JavaScript").unwrap();
        let xml = registry.get("xml").unwrap();
        assert_eq!(xml.implementation, "<code>(.*?)</code>");
        assert_eq!(xml.test, "<test>(.*?)</test>");
    }

    #[test]
    fn test_language_placeholder() {
        let yaml = r#"
single:
  implementation: '```{language}\n(.*?)```'
  test: '```{language}\n(.*?)```'
"#;

        let registry = parse_registry(yaml, "JavaScript").unwrap();
        assert_eq!(registry["single"].implementation, "```javascript\\n(.*?)```");
    }

    #[test]
    fn test_missing_test_pattern() {
        let yaml = r#"
broken:
  implementation: '(.*)'
"#;

        match parse_registry(yaml, "JavaScript") {
            Err(RegistryError::MissingPattern { name, field }) => {
                assert_eq!(name, "broken");
                assert_eq!(field, "test");
            }
            other => panic!("Expected MissingPattern error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_registry() {
        assert!(parse_registry("", "JavaScript").unwrap().is_empty());
    }

    #[test]
    fn test_builtins_without_file() {
        let dir = TempDir::new().unwrap();
        let registry = FilePatternRegistry::new(Some(dir.path().join("none.yml")), "JavaScript");

        let formats = registry.formats().unwrap();
        assert!(formats.contains_key("fenced"));
        assert!(formats.contains_key("labeled"));
        assert!(matches!(
            registry.get_patterns("xml"),
            Err(RegistryError::UnknownFormat(name)) if name == "xml"
        ));
    }

    #[test]
    fn test_builtin_names_ignore_case() {
        let dir = TempDir::new().unwrap();
        let registry = FilePatternRegistry::new(Some(dir.path().join("none.yml")), "JavaScript");

        assert_eq!(
            registry.get_patterns("Fenced").unwrap(),
            registry.get_patterns("fenced").unwrap()
        );
        assert!(registry.extractor("LABELED").is_ok());
        assert!(matches!(
            registry.get_patterns("Xml"),
            Err(RegistryError::UnknownFormat(name)) if name == "Xml"
        ));
    }

    #[test]
    fn test_file_adds_and_overrides_formats() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("patterns.yml");
        fs::write(
            &path,
            "fenced:\n  implementation: 'IMPL:(.*?);'\n  test: 'TEST:(.*?);'\nxml:\n  implementation: '<code>(.*?)</code>'\n  test: '<test>(.*?)</test>'\n",
        )
        .unwrap();
        let registry = FilePatternRegistry::new(Some(path), "JavaScript");

        let extractor = registry.extractor("fenced").unwrap();
        let artifact = extractor.extract(Some("IMPL: a(); TEST: b();"));
        assert_eq!(artifact.implementation.as_deref(), Some("a()"));
        assert_eq!(artifact.test.as_deref(), Some("b()"));

        assert!(registry.extractor("xml").is_ok());
        assert!(registry.extractor("labeled").is_ok());
    }

    #[test]
    fn test_invalid_regex_in_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("patterns.yml");
        fs::write(&path, "bad:\n  implementation: '(unclosed'\n  test: '(.*)'\n").unwrap();
        let registry = FilePatternRegistry::new(Some(path), "JavaScript");

        assert!(matches!(
            registry.extractor("bad"),
            Err(RegistryError::InvalidPattern { .. })
        ));
    }
}
