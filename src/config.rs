use crate::errors::{ExtractorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extraction configuration, loadable from YAML or JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Token recognition extensions.
    pub tokens: TokenRuleConfig,

    /// Structural fingerprint tuning.
    pub fingerprint: FingerprintConfig,

    /// Representative markup rendering.
    pub markup: MarkupConfig,

    /// PHP execution settings (dynamic mode).
    pub php: PhpConfig,

    /// Classifier traversal bounds.
    pub classify: ClassifyConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            tokens: TokenRuleConfig::default(),
            fingerprint: FingerprintConfig::default(),
            markup: MarkupConfig::default(),
            php: PhpConfig::default(),
            classify: ClassifyConfig::default(),
        }
    }
}

/// Extensions to the built-in Tailwind token table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenRuleConfig {
    /// Additional utility prefixes to recognize (e.g. a theme's custom
    /// plugin prefixes).
    pub extra_prefixes: Vec<String>,
}

/// Which attributes count as structural for fingerprinting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Attributes included in the canonical form. Everything else (id,
    /// data-*, event handlers) is ignored for deduplication.
    pub attr_allowlist: Vec<String>,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            attr_allowlist: vec!["type".to_string()],
        }
    }
}

/// Attributes preserved in a component's representative markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupConfig {
    pub keep_attrs: Vec<String>,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            keep_attrs: ["id", "type", "placeholder", "href", "src", "alt"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// PHP subprocess settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhpConfig {
    /// PHP executable path (or name resolved via PATH).
    pub path: String,

    /// Per-file execution timeout in seconds. A hung script is killed and
    /// the file recorded as a dynamic execution failure.
    pub timeout_secs: u64,
}

impl Default for PhpConfig {
    fn default() -> Self {
        Self {
            path: "php".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Depth bounds for classification context queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    pub ancestor_depth: usize,
    pub descendant_depth: usize,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            ancestor_depth: 8,
            descendant_depth: 4,
        }
    }
}

impl CatalogConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ExtractorError::ConfigError {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        serde_yaml::from_str(&content).map_err(|e| ExtractorError::ConfigError {
            message: format!("Failed to parse YAML config: {}", e),
        })
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ExtractorError::ConfigError {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        serde_json::from_str(&content).map_err(|e| ExtractorError::ConfigError {
            message: format!("Failed to parse JSON config: {}", e),
        })
    }

    /// Load configuration from a file (auto-detect format)
    pub fn from_file(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(ExtractorError::ConfigError {
                message: format!(
                    "Unsupported config file format: {}. Use .yaml, .yml, or .json",
                    path.display()
                ),
            }),
        }
    }

    /// Merge with another configuration; list-valued fields union, scalar
    /// fields take the overlay's value.
    pub fn merge(mut self, other: Self) -> Self {
        for prefix in other.tokens.extra_prefixes {
            if !self.tokens.extra_prefixes.contains(&prefix) {
                self.tokens.extra_prefixes.push(prefix);
            }
        }
        for attr in other.fingerprint.attr_allowlist {
            if !self.fingerprint.attr_allowlist.contains(&attr) {
                self.fingerprint.attr_allowlist.push(attr);
            }
        }
        for attr in other.markup.keep_attrs {
            if !self.markup.keep_attrs.contains(&attr) {
                self.markup.keep_attrs.push(attr);
            }
        }
        self.php = other.php;
        self.classify = other.classify;
        self
    }
}
