//! Configuration management for the binding runtime
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (binding.toml)
//! - Environment variables (BINDING__*)
//!
//! ## Example config file (binding.toml):
//! ```toml
//! [payload]
//! codec = "json-bytes"
//!
//! [hash]
//! exclude = ["SimpleType.createdAt"]
//! exclude_patterns = ["\\.optional-"]
//!
//! [groups]
//! annotation = "x-groups"
//!
//! [schema]
//! strict_defaults = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BindingError, Result};
use crate::factory::FactoryOptions;
use crate::hash::Exclude;
use crate::payload::codec_by_name;

/// Main configuration for the binding runtime
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Payload settings
    #[serde(default)]
    pub payload: PayloadConfig,

    /// Hash settings
    #[serde(default)]
    pub hash: HashConfig,

    /// Grouping settings
    #[serde(default)]
    pub groups: GroupsConfig,

    /// Schema compilation settings
    #[serde(default)]
    pub schema: SchemaConfig,
}

/// Payload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadConfig {
    /// Codec name (json-bytes or pass-through)
    #[serde(default = "default_codec")]
    pub codec: String,
}

/// Hash configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HashConfig {
    /// Dotted paths left out of the hash
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Regular expressions matched against dotted paths
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Grouping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupsConfig {
    /// Schema annotation holding group names
    #[serde(default = "default_annotation")]
    pub annotation: String,
}

/// Schema compilation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Fail on defaults that do not coerce
    #[serde(default)]
    pub strict_defaults: bool,
}

// Default value functions
fn default_codec() -> String {
    "json-bytes".to_string()
}

fn default_annotation() -> String {
    "x-groups".to_string()
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self { codec: default_codec() }
    }
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self { annotation: default_annotation() }
    }
}

impl BindingConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["binding.toml", ".binding.toml", "config/binding.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "binding") {
            let xdg_config = config_dir.config_dir().join("binding.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // BINDING__HASH__EXCLUDE=... and friends
        builder = builder.add_source(
            Environment::with_prefix("BINDING")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Compile options for factories
    pub fn factory_options(&self) -> Result<FactoryOptions> {
        let codec = codec_by_name(&self.payload.codec)
            .ok_or_else(|| BindingError::Config(format!("unknown payload codec: {}", self.payload.codec)))?;
        Ok(FactoryOptions {
            codec,
            strict_defaults: self.schema.strict_defaults,
            ..FactoryOptions::default()
        })
    }

    /// Exact paths followed by compiled patterns
    pub fn hash_excludes(&self) -> Result<Vec<Exclude>> {
        let mut excludes: Vec<Exclude> = self.hash.exclude.iter().map(|p| Exclude::Path(p.clone())).collect();
        for pattern in &self.hash.exclude_patterns {
            let regex = Regex::new(pattern)
                .map_err(|e| BindingError::Config(format!("bad exclude pattern {}: {}", pattern, e)))?;
            excludes.push(Exclude::Pattern(regex));
        }
        Ok(excludes)
    }

    pub fn group_annotation(&self) -> &str {
        &self.groups.annotation
    }
}
