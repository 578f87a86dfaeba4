use chrono::{DateTime, Utc};

use crate::{
    domain::{CommentPayload, CommentType},
    repository::{ContentNode, props},
};

/// Site-wide values used when a document does not carry its own.
#[derive(Debug, Clone, Default)]
pub struct PayloadDefaults {
    pub homepage: String,
    pub language: Option<String>,
    pub charset: Option<String>,
}

/// Builds the classifier payload from a document's properties.
pub fn build_payload(document: &ContentNode, defaults: &PayloadDefaults) -> CommentPayload {
    let comment_type = document
        .text_property(props::COMMENT_TYPE)
        .and_then(|value| match value.parse::<CommentType>() {
            Ok(kind) => Some(kind),
            Err(unknown) => {
                tracing::debug!(
                    target: "subscriber",
                    document = %document.id,
                    comment_type = %unknown,
                    "unknown comment type, sending the default"
                );
                None
            }
        })
        .unwrap_or_default();

    CommentPayload {
        identifier: Some(document.id.to_string()),
        homepage: Some(defaults.homepage.clone()),
        user_ip: document.text_property(props::USER_IP),
        user_agent: document.text_property(props::USER_AGENT),
        referrer: document.text_property(props::REFERRER),
        permalink: document.text_property(props::PERMALINK),
        comment_type,
        author_name: document.text_property(props::AUTHOR),
        author_email: document.text_property(props::AUTHOR_EMAIL),
        author_url: document.text_property(props::AUTHOR_URL),
        content: document.text_property(props::TEXT),
        comment_date: timestamp(document, props::CREATED),
        document_date: timestamp(document, props::MODIFIED),
        language: document
            .text_property(props::LANGUAGE)
            .or_else(|| defaults.language.clone()),
        charset: defaults.charset.clone(),
    }
}

fn timestamp(document: &ContentNode, name: &str) -> Option<DateTime<Utc>> {
    let raw = document.text_property(name)?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(value) => Some(value.with_timezone(&Utc)),
        Err(err) => {
            tracing::warn!(
                target: "subscriber",
                document = %document.id,
                property = name,
                error = %err,
                "unparseable timestamp left out of the payload"
            );
            None
        }
    }
}
