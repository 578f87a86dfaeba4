use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Publication action persisted as the marker on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Ignore,
    Publish,
    #[serde(rename = "request")]
    PublicationRequest,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Ignore => "ignore",
            ActionKind::Publish => "publish",
            ActionKind::PublicationRequest => "request",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action value: {0:?}")]
pub struct UnknownActionValue(pub String);

impl FromStr for ActionKind {
    type Err = UnknownActionValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "ignore" => Ok(ActionKind::Ignore),
            "publish" => Ok(ActionKind::Publish),
            "request" => Ok(ActionKind::PublicationRequest),
            other => Err(UnknownActionValue(other.to_string())),
        }
    }
}

/// Vocabulary of the spam branch. `Reject` drops the content outright and
/// `Recommendation` follows the classifier's discard hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpamAction {
    Reject,
    Recommendation,
    Act(ActionKind),
}

impl FromStr for SpamAction {
    type Err = UnknownActionValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "reject" => Ok(SpamAction::Reject),
            "recommendation" => Ok(SpamAction::Recommendation),
            other => other.parse().map(SpamAction::Act),
        }
    }
}
