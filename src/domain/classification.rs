use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

pub const INFO_SERVER: &str = "server";
pub const INFO_DEBUG: &str = "debug";
pub const INFO_RECOMMENDATION: &str = "recommendation";

/// Value of the recommendation hint when the classifier advises dropping the
/// content without review.
pub const RECOMMENDATION_DISCARD: &str = "discard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationKind {
    Spam,
    Ham,
    /// The remote call failed or the reply could not be understood.
    Invalid,
}

impl ClassificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationKind::Spam => "spam",
            ClassificationKind::Ham => "ham",
            ClassificationKind::Invalid => "invalid",
        }
    }
}

impl fmt::Display for ClassificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub kind: ClassificationKind,
    pub info: BTreeMap<String, String>,
}

impl ClassificationResult {
    pub fn new(kind: ClassificationKind, info: BTreeMap<String, String>) -> Self {
        Self { kind, info }
    }

    pub fn invalid() -> Self {
        Self::new(ClassificationKind::Invalid, BTreeMap::new())
    }

    pub fn is_invalid(&self) -> bool {
        self.kind == ClassificationKind::Invalid
    }

    pub fn recommends_discard(&self) -> bool {
        self.info
            .get(INFO_RECOMMENDATION)
            .is_some_and(|hint| hint.trim() == RECOMMENDATION_DISCARD)
    }
}
