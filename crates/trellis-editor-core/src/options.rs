//! Editor configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExperimentalFeature {
    /// Reuse cached render elements across syncs.
    PersistCache,
    /// Route Enter next to inline entities through the model.
    HandleEnterKey,
}

/// Options for the model and its synchronizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorOptions {
    /// Surround read-only entities with zero-width caret anchors.
    pub add_delimiter_for_entity: bool,
    /// Top-level blocks rendered per step of a chunked conversion.
    pub async_chunk_size: usize,
    /// Host runs on macOS (affects word and line delete gestures).
    pub is_mac: bool,
    pub experimental_features: Vec<ExperimentalFeature>,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            add_delimiter_for_entity: true,
            async_chunk_size: 16,
            is_mac: false,
            experimental_features: vec![ExperimentalFeature::PersistCache],
        }
    }
}

impl EditorOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        let mut options: Self = serde_json::from_str(json)?;
        options.async_chunk_size = options.async_chunk_size.max(1);
        Ok(options)
    }

    pub fn is_feature_enabled(&self, feature: ExperimentalFeature) -> bool {
        self.experimental_features.contains(&feature)
    }

    pub fn persist_cache(&self) -> bool {
        self.is_feature_enabled(ExperimentalFeature::PersistCache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let options = EditorOptions::from_json(r#"{"isMac": true}"#).unwrap();
        assert!(options.is_mac);
        assert!(options.add_delimiter_for_entity);
        assert!(options.persist_cache());
        assert_eq!(options.async_chunk_size, 16);
    }

    #[test]
    fn test_zero_chunk_size_clamped() {
        let options =
            EditorOptions::from_json(r#"{"asyncChunkSize": 0, "experimentalFeatures": []}"#)
                .unwrap();
        assert_eq!(options.async_chunk_size, 1);
        assert!(!options.persist_cache());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(EditorOptions::from_json("{").is_err());
    }
}
