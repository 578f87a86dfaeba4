use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content categories understood by the classifier, sent as `comment_type`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommentType {
    #[default]
    Comment,
    Pingback,
    Trackback,
    ForumPost,
    BlogPost,
    ContactForm,
    Signup,
    Tweet,
}

impl CommentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentType::Comment => "comment",
            CommentType::Pingback => "pingback",
            CommentType::Trackback => "trackback",
            CommentType::ForumPost => "forum-post",
            CommentType::BlogPost => "blog-post",
            CommentType::ContactForm => "contact-form",
            CommentType::Signup => "signup",
            CommentType::Tweet => "tweet",
        }
    }
}

impl FromStr for CommentType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let kind = match value.trim() {
            "comment" => CommentType::Comment,
            "pingback" => CommentType::Pingback,
            "trackback" => CommentType::Trackback,
            "forum-post" => CommentType::ForumPost,
            "blog-post" => CommentType::BlogPost,
            "contact-form" => CommentType::ContactForm,
            "signup" => CommentType::Signup,
            "tweet" => CommentType::Tweet,
            other => return Err(other.to_string()),
        };
        Ok(kind)
    }
}

/// Normalized content sent to the classifier.
///
/// `identifier` is only used to correlate log lines and never leaves the
/// process. Every other field is optional; absent fields are omitted from the
/// request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentPayload {
    pub identifier: Option<String>,
    pub homepage: Option<String>,
    pub user_ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub permalink: Option<String>,
    pub comment_type: CommentType,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub author_url: Option<String>,
    pub content: Option<String>,
    pub comment_date: Option<DateTime<Utc>>,
    pub document_date: Option<DateTime<Utc>>,
    pub language: Option<String>,
    pub charset: Option<String>,
}

impl CommentPayload {
    pub fn correlation_id(&self) -> &str {
        self.identifier.as_deref().unwrap_or("-")
    }
}
