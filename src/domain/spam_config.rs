use super::action::ActionKind;

/// Effective spam-check configuration of a node after merging its ancestors,
/// closest value first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpamCheckConfig {
    pub api_key: Option<String>,
    pub ham_action: Option<ActionKind>,
    /// Raw operator value; parsed by the dispatcher so a bad value degrades
    /// to `Ignore` instead of hiding the rest of the configuration.
    pub spam_action: Option<String>,
}

impl SpamCheckConfig {
    pub fn is_complete(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty()) && self.ham_action.is_some()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }

    /// Copies every field that is still unset from `other`.
    pub fn merge_missing(&mut self, other: SpamCheckConfig) {
        if self.api_key.is_none() {
            self.api_key = other.api_key;
        }
        if self.ham_action.is_none() {
            self.ham_action = other.ham_action;
        }
        if self.spam_action.is_none() {
            self.spam_action = other.spam_action;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_requires_key_and_ham_action() {
        let mut config = SpamCheckConfig::default();
        assert!(!config.is_complete());

        config.api_key = Some(String::new());
        config.ham_action = Some(ActionKind::Publish);
        assert!(!config.is_complete());

        config.api_key = Some("key".into());
        assert!(config.is_complete());
    }

    #[test]
    fn merge_keeps_closest_values() {
        let mut config = SpamCheckConfig {
            api_key: Some("near".into()),
            ..Default::default()
        };
        config.merge_missing(SpamCheckConfig {
            api_key: Some("far".into()),
            ham_action: Some(ActionKind::PublicationRequest),
            spam_action: Some("reject".into()),
        });
        assert_eq!(config.api_key.as_deref(), Some("near"));
        assert_eq!(config.ham_action, Some(ActionKind::PublicationRequest));
        assert_eq!(config.spam_action.as_deref(), Some("reject"));
    }
}
