//! Logic chains: ordered groups of segments forming one argument thread.

use crate::model::segment::SegmentId;
use serde::{Deserialize, Serialize};

/// An ordered group of segments forming one coherent argument thread.
///
/// A segment may belong to more than one chain: an example segment can
/// support one chain while being cross-referenced by another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicChain {
    #[serde(default)]
    pub chain_id: String,
    /// Free-form chain label. The oracle uses labels like `MAIN_ARGUMENT`;
    /// fallback chains carry the majority relation-type name.
    #[serde(default)]
    pub chain_type: String,
    #[serde(default)]
    pub segment_ids: Vec<SegmentId>,
    #[serde(default)]
    pub description: String,
}

impl LogicChain {
    pub fn len(&self) -> usize {
        self.segment_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segment_ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.segment_ids.iter().any(|s| s == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_membership() {
        let chain = LogicChain {
            chain_id: "chain_1".to_string(),
            chain_type: "CONTRAST".to_string(),
            segment_ids: vec!["seg_0001".to_string(), "seg_0002".to_string()],
            description: String::new(),
        };
        assert_eq!(chain.len(), 2);
        assert!(chain.contains("seg_0002"));
        assert!(!chain.contains("seg_0003"));
    }
}
