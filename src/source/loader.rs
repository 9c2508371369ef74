use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

use crate::domain::RuleDefinition;
use crate::rules::{create_rule, RuleError, RuleParser, RuleRegistry};

/// Errors that can occur while loading the rule source.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("rule {name:?} rejected: {source}")]
    Rule {
        name: String,
        #[source]
        source: RuleError,
    },
}

/// Read rule definitions from a file.
///
/// `.yaml` and `.yml` files are read as YAML, anything else as a JSON
/// array of `{name, rule}` entries.
pub fn load_definitions(path: impl AsRef<Path>) -> Result<Vec<RuleDefinition>, LoadError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;

    let definitions = if is_yaml(path) {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };

    Ok(definitions)
}

/// Parse and register definitions in order.
///
/// Stops at the first definition that fails; definitions before it stay
/// registered.
pub fn register_all(
    definitions: &[RuleDefinition],
    parser: &RuleParser,
    registry: &RuleRegistry,
) -> Result<usize, LoadError> {
    for definition in definitions {
        create_rule(parser, registry, definition).map_err(|source| {
            error!(rule = %definition.name, error = %source, "Failed to load rule");
            LoadError::Rule {
                name: definition.name.clone(),
                source,
            }
        })?;
    }

    Ok(definitions.len())
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Loads the startup rule set from a file into a registry.
pub struct RuleLoader {
    rules_path: PathBuf,
}

impl RuleLoader {
    pub fn new(rules_path: impl Into<PathBuf>) -> Self {
        RuleLoader {
            rules_path: rules_path.into(),
        }
    }

    /// Load every rule in the file into `registry`.
    ///
    /// Returns the number of rules registered.
    pub fn load_into(&self, parser: &RuleParser, registry: &RuleRegistry) -> Result<usize, LoadError> {
        let definitions = load_definitions(&self.rules_path)?;
        let count = register_all(&definitions, parser, registry)?;

        info!(
            path = %self.rules_path.display(),
            rules = count,
            fields = registry.field_count(),
            "Rules loaded"
        );
        Ok(count)
    }

    /// Get the rule file path.
    pub fn rules_path(&self) -> &Path {
        &self.rules_path
    }
}
