//! Property names the engine reads and writes on content nodes.

pub const API_KEY: &str = "spamgate:apiKey";
pub const HAM_ACTION: &str = "spamgate:hamAction";
pub const SPAM_ACTION: &str = "spamgate:spamAction";

pub const PUBLISH_ACTION: &str = "spamgate:publishAction";
pub const CHECK_RESULT: &str = "spamgate:checkResult";

pub const STATE: &str = "spamgate:state";
pub const STATE_UNPUBLISHED: &str = "unpublished";
pub const STATE_PUBLISHED: &str = "published";
pub const STATE_PUBLICATION_REQUESTED: &str = "publication-requested";

pub const AUTHOR: &str = "spamgate:author";
pub const AUTHOR_EMAIL: &str = "spamgate:authorEmail";
pub const AUTHOR_URL: &str = "spamgate:authorUrl";
pub const TEXT: &str = "spamgate:text";
pub const USER_IP: &str = "spamgate:userIp";
pub const USER_AGENT: &str = "spamgate:userAgent";
pub const REFERRER: &str = "spamgate:referrer";
pub const PERMALINK: &str = "spamgate:permalink";
pub const LANGUAGE: &str = "spamgate:language";
pub const COMMENT_TYPE: &str = "spamgate:commentType";
pub const CREATED: &str = "spamgate:created";
pub const MODIFIED: &str = "spamgate:modified";
