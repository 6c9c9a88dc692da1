use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

pub const DEFAULT_MAX_ITEMS: usize = 10;
pub const DEFAULT_MAX_CONTROLLERS: usize = 10;
pub const DEFAULT_MAX_DOCUMENT_FIELD: usize = 300;

/// Limits applied during structural validation of operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of items in one operation
    pub max_items: usize,
    /// Maximum number of controllers named by one create item
    pub max_controllers: usize,
    /// Maximum byte length of a document title or uri
    pub max_document_field: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            max_controllers: DEFAULT_MAX_CONTROLLERS,
            max_document_field: DEFAULT_MAX_DOCUMENT_FIELD,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON, filling missing fields with defaults
    pub fn from_json_str(json: &str) -> Result<Self, LedgerError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.max_items == 0 {
            return Err(LedgerError::Validation("max_items must be positive".to_string()));
        }
        if self.max_controllers == 0 {
            return Err(LedgerError::Validation(
                "max_controllers must be positive".to_string(),
            ));
        }
        if self.max_document_field == 0 {
            return Err(LedgerError::Validation(
                "max_document_field must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
