//! Compiler configuration, read from TOML.
//!
//! ```toml
//! default_source = "base.png"
//!
//! [symbols]
//! my_group = 12
//!
//! [replacement_types.TRAIN]
//! code = 0x19
//! sprites = 64
//! block = "offset"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use nml::expression::CB_FAILED;
use serde::Deserialize;
use thiserror::Error;

use crate::action::{ReplacementType, ReplacementTypeTable};
use crate::registry::{ActionSetId, CB_FAILED_ID};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("replacement type '{name}' has code {code:#04x}; codes must be below 0x80")]
    InvalidTypeCode { name: String, code: u8 },

    #[error("symbol '{name}': {reason}")]
    InvalidSymbol { name: String, reason: &'static str },
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Image file for sprites that name none, and whose block names none.
    #[serde(default)]
    pub default_source: Option<String>,

    /// Action sets compiled elsewhere, by name.
    #[serde(default)]
    pub symbols: BTreeMap<String, ActionSetId>,

    /// Additional or overriding sprite replacement types.
    #[serde(default)]
    pub replacement_types: BTreeMap<String, ReplacementType>,
}

impl CompilerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: CompilerConfig = toml::from_str(source)?;
        config.check()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    fn check(&self) -> Result<(), ConfigError> {
        for (name, ty) in &self.replacement_types {
            if ty.code >= 0x80 {
                return Err(ConfigError::InvalidTypeCode {
                    name: name.clone(),
                    code: ty.code,
                });
            }
        }
        for (name, id) in &self.symbols {
            if name == CB_FAILED {
                return Err(ConfigError::InvalidSymbol {
                    name: name.clone(),
                    reason: "the name is reserved",
                });
            }
            if *id == CB_FAILED_ID {
                return Err(ConfigError::InvalidSymbol {
                    name: name.clone(),
                    reason: "id 0 is reserved for CB_FAILED",
                });
            }
        }
        Ok(())
    }

    /// The built-in replacement types with this configuration's entries applied.
    pub fn replacement_type_table(&self) -> ReplacementTypeTable {
        let mut table = ReplacementTypeTable::builtin();
        for (name, ty) in &self.replacement_types {
            table.insert(name.clone(), *ty);
        }
        table
    }
}
