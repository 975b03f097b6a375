//! Hierarchy configuration.

use serde::{Deserialize, Serialize};
use crate::model::Metric;
use crate::Result;

/// Settings fixed for the lifetime of a hierarchy.
///
/// Deserializes from JSON with every field optional:
///
/// ```
/// let config = ihac::HierarchyConfig::from_json(r#"{"metric": "cosine"}"#).unwrap();
/// assert_eq!(config.metric, ihac::Metric::Cosine);
/// assert!(config.restore_nesting);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Distance used for every comparison during insertion.
    pub metric: Metric,
    /// Rotate new merges upward until each node's merge distance is no
    /// larger than its parent's. When off, a new leaf always joins the
    /// subtree the descent ended at, even if that inverts the nesting.
    pub restore_nesting: bool,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            metric: Metric::Euclidean,
            restore_nesting: true,
        }
    }
}

impl HierarchyConfig {
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_restore_nesting(mut self, restore: bool) -> Self {
        self.restore_nesting = restore;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HierarchyConfig::default();
        assert_eq!(config.metric, Metric::Euclidean);
        assert!(config.restore_nesting);
    }

    #[test]
    fn from_json_fills_missing_fields() {
        let config = HierarchyConfig::from_json(r#"{"restore_nesting": false}"#).unwrap();
        assert_eq!(config.metric, Metric::Euclidean);
        assert!(!config.restore_nesting);

        let config = HierarchyConfig::from_json("{}").unwrap();
        assert_eq!(config, HierarchyConfig::default());
    }

    #[test]
    fn from_json_rejects_unknown_metric() {
        assert!(HierarchyConfig::from_json(r#"{"metric": "manhattan"}"#).is_err());
    }
}
