//! Wire contract of the classification service.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use url::{Url, form_urlencoded};

use crate::domain::{
    ClassificationKind, ClassificationResult, CommentPayload,
    classification::{INFO_DEBUG, INFO_RECOMMENDATION, INFO_SERVER},
};

use super::{error::ServiceError, transport::TransportResponse};

pub const HEADER_SERVER: &str = "x-akismet-server";
pub const HEADER_DEBUG: &str = "x-akismet-debug-help";
pub const HEADER_RECOMMENDATION: &str = "x-akismet-pro-tip";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub mod params {
    pub const API_KEY: &str = "key";
    pub const HOMEPAGE: &str = "blog";
    pub const USER_IP: &str = "user_ip";
    pub const USER_AGENT: &str = "user_agent";
    pub const REFERRER: &str = "referrer";
    pub const PERMALINK: &str = "permalink";
    pub const COMMENT_TYPE: &str = "comment_type";
    pub const AUTHOR_NAME: &str = "comment_author";
    pub const AUTHOR_EMAIL: &str = "comment_author_email";
    pub const AUTHOR_URL: &str = "comment_author_url";
    pub const CONTENT: &str = "comment_content";
    pub const COMMENT_DATE: &str = "comment_date_gmt";
    pub const MODIFIED_DATE: &str = "comment_post_modified_gmt";
    pub const LANGUAGE: &str = "blog_lang";
    pub const CHARSET: &str = "blog_charset";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    VerifyKey,
    CommentCheck,
    SubmitSpam,
    SubmitHam,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::VerifyKey => "verify-key",
            Endpoint::CommentCheck => "comment-check",
            Endpoint::SubmitSpam => "submit-spam",
            Endpoint::SubmitHam => "submit-ham",
        }
    }

    /// Everything except key verification is addressed on a host prefixed
    /// with the API key.
    fn is_key_scoped(&self) -> bool {
        !matches!(self, Endpoint::VerifyKey)
    }
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    scheme: String,
    host: String,
    version: String,
}

impl Endpoints {
    pub fn new(
        scheme: impl Into<String>,
        host: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            version: version.into(),
        }
    }

    pub fn url(&self, endpoint: Endpoint, api_key: &str) -> Result<Url, ServiceError> {
        let host = if endpoint.is_key_scoped() {
            if api_key.is_empty()
                || !api_key
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
            {
                return Err(ServiceError::InvalidEndpoint(
                    "API key is not usable as a host label".into(),
                ));
            }
            format!("{}.{}", api_key, self.host)
        } else {
            self.host.clone()
        };
        let raw = format!("{}://{}/{}/{}", self.scheme, host, self.version, endpoint.path());
        Url::parse(&raw).map_err(|err| ServiceError::InvalidEndpoint(format!("{raw}: {err}")))
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new("https", "rest.example.com", "1.1")
    }
}

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

pub fn verify_key_fields(api_key: &str, homepage: &str) -> Vec<(&'static str, String)> {
    vec![
        (params::API_KEY, api_key.to_string()),
        (params::HOMEPAGE, homepage.to_string()),
    ]
}

/// Request fields for the comment endpoints. Absent optional fields are left
/// out; the comment date falls back to `now`.
pub fn comment_fields(
    api_key: &str,
    payload: &CommentPayload,
    now: DateTime<Utc>,
) -> Vec<(&'static str, String)> {
    let mut fields = Vec::with_capacity(15);
    let mut push = |name: &'static str, value: Option<&str>| {
        if let Some(value) = value {
            fields.push((name, value.to_string()));
        }
    };

    push(params::AUTHOR_NAME, payload.author_name.as_deref());
    push(params::AUTHOR_EMAIL, payload.author_email.as_deref());
    push(params::AUTHOR_URL, payload.author_url.as_deref());
    push(params::CHARSET, payload.charset.as_deref());
    let comment_date = format_timestamp(&payload.comment_date.unwrap_or(now));
    push(params::COMMENT_DATE, Some(comment_date.as_str()));
    push(params::COMMENT_TYPE, Some(payload.comment_type.as_str()));
    push(params::CONTENT, payload.content.as_deref());
    push(params::LANGUAGE, payload.language.as_deref());
    let modified = payload.document_date.as_ref().map(format_timestamp);
    push(params::MODIFIED_DATE, modified.as_deref());
    push(params::PERMALINK, payload.permalink.as_deref());
    push(params::REFERRER, payload.referrer.as_deref());
    push(params::USER_AGENT, payload.user_agent.as_deref());
    push(params::USER_IP, payload.user_ip.as_deref());
    push(params::API_KEY, Some(api_key));
    push(params::HOMEPAGE, payload.homepage.as_deref());
    fields
}

pub fn encode_form(fields: &[(&str, String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in fields {
        serializer.append_pair(name, value);
    }
    serializer.finish()
}

fn reply_is(body: &str, expected: &str) -> bool {
    body.trim() == expected
}

/// Interprets a verify-key reply.
pub fn parse_key_reply(response: &TransportResponse) -> Result<bool, ServiceError> {
    if !response.is_success() {
        return Err(ServiceError::Status(response.status));
    }
    if reply_is(&response.body, "valid") {
        Ok(true)
    } else if reply_is(&response.body, "invalid") {
        Ok(false)
    } else {
        Err(ServiceError::UnexpectedReply(response.body.trim().to_string()))
    }
}

/// Interprets a comment-check reply. Never fails: anything that is not an
/// explicit verdict is `Invalid`.
pub fn parse_check_reply(response: &TransportResponse) -> ClassificationResult {
    if !response.is_success() {
        return ClassificationResult::invalid();
    }
    if reply_is(&response.body, "true") {
        ClassificationResult::new(
            ClassificationKind::Spam,
            collect_info(
                response,
                &[(INFO_SERVER, HEADER_SERVER), (INFO_RECOMMENDATION, HEADER_RECOMMENDATION)],
            ),
        )
    } else if reply_is(&response.body, "false") {
        ClassificationResult::new(
            ClassificationKind::Ham,
            collect_info(response, &[(INFO_SERVER, HEADER_SERVER)]),
        )
    } else {
        ClassificationResult::new(
            ClassificationKind::Invalid,
            collect_info(response, &[(INFO_SERVER, HEADER_SERVER), (INFO_DEBUG, HEADER_DEBUG)]),
        )
    }
}

fn collect_info(response: &TransportResponse, wanted: &[(&str, &str)]) -> BTreeMap<String, String> {
    wanted
        .iter()
        .filter_map(|(key, header)| response.header(header).map(|value| (key.to_string(), value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::CommentType;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, hour, 5, 7).unwrap()
    }

    #[test]
    fn key_scoped_urls_prefix_the_host() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.url(Endpoint::VerifyKey, "abc123").unwrap().as_str(),
            "https://rest.example.com/1.1/verify-key"
        );
        assert_eq!(
            endpoints.url(Endpoint::CommentCheck, "abc123").unwrap().as_str(),
            "https://abc123.rest.example.com/1.1/comment-check"
        );
        assert_eq!(
            endpoints.url(Endpoint::SubmitHam, "abc123").unwrap().path(),
            "/1.1/submit-ham"
        );
        assert!(endpoints.url(Endpoint::SubmitSpam, "evil.com/x").is_err());
    }

    #[test]
    fn timestamps_are_utc_iso() {
        assert_eq!(format_timestamp(&at(14)), "2024-03-09T14:05:07Z");
    }

    #[test]
    fn comment_fields_skip_absent_values_and_encode_each_value() {
        let payload = CommentPayload {
            identifier: Some("node-1".into()),
            homepage: Some("https://site.example".into()),
            author_name: Some("Jane Doe".into()),
            content: Some("Hi & bye".into()),
            comment_date: Some(at(1)),
            comment_type: CommentType::ForumPost,
            ..Default::default()
        };

        let fields = comment_fields("k1", &payload, at(23));
        let names: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                params::AUTHOR_NAME,
                params::COMMENT_DATE,
                params::COMMENT_TYPE,
                params::CONTENT,
                params::API_KEY,
                params::HOMEPAGE
            ]
        );
        assert_eq!(
            encode_form(&fields),
            "comment_author=Jane+Doe&comment_date_gmt=2024-03-09T01%3A05%3A07Z\
             &comment_type=forum-post&comment_content=Hi+%26+bye&key=k1\
             &blog=https%3A%2F%2Fsite.example"
        );
        assert!(!encode_form(&fields).contains("node-1"));
    }

    #[test]
    fn comment_date_defaults_to_now() {
        let fields = comment_fields("k1", &CommentPayload::default(), at(23));
        assert!(fields.contains(&(params::COMMENT_DATE, "2024-03-09T23:05:07Z".to_string())));
        assert!(!fields.iter().any(|(name, _)| *name == params::MODIFIED_DATE));
    }

    #[test]
    fn check_reply_maps_verdicts_and_headers() {
        let spam = TransportResponse::ok("true")
            .with_header("X-akismet-server", "s1")
            .with_header("X-akismet-pro-tip", "discard")
            .with_header("X-akismet-debug-help", "ignored");
        let result = parse_check_reply(&spam);
        assert_eq!(result.kind, ClassificationKind::Spam);
        assert_eq!(
            result.info,
            BTreeMap::from([
                ("server".to_string(), "s1".to_string()),
                ("recommendation".to_string(), "discard".to_string()),
            ])
        );

        let ham = parse_check_reply(
            &TransportResponse::ok("false")
                .with_header("X-akismet-server", "s1")
                .with_header("X-akismet-pro-tip", "discard"),
        );
        assert_eq!(ham.kind, ClassificationKind::Ham);
        assert_eq!(ham.info, BTreeMap::from([("server".to_string(), "s1".to_string())]));

        let maybe = parse_check_reply(
            &TransportResponse::ok("maybe").with_header("X-akismet-debug-help", "missing blog"),
        );
        assert_eq!(maybe.kind, ClassificationKind::Invalid);
        assert_eq!(maybe.info.get("debug").map(String::as_str), Some("missing blog"));

        let failed = TransportResponse {
            status: 503,
            ..TransportResponse::ok("true")
        };
        assert_eq!(parse_check_reply(&failed), ClassificationResult::invalid());
    }

    #[test]
    fn key_reply_distinguishes_invalid_from_garbage() {
        assert_eq!(parse_key_reply(&TransportResponse::ok(" valid\n")).unwrap(), true);
        assert_eq!(parse_key_reply(&TransportResponse::ok("invalid")).unwrap(), false);
        assert!(matches!(
            parse_key_reply(&TransportResponse::ok("<html>")),
            Err(ServiceError::UnexpectedReply(_))
        ));
        let failed = TransportResponse {
            status: 500,
            ..Default::default()
        };
        assert!(matches!(parse_key_reply(&failed), Err(ServiceError::Status(500))));
    }
}
