use super::builder::PatternSpec;
use super::policy::{ContentTypeFilter, DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "accesstoken",
    "access_token",
    "refreshtoken",
    "refresh_token",
    "apikey",
    "api_key",
    "authorization",
    "auth",
    "credential",
    "credentials",
    "privatekey",
    "private_key",
    "sessionid",
    "session_id",
    "cookie",
    "ssn",
    "creditcard",
    "credit_card",
    "cvv",
    "pin",
];

pub const DEFAULT_SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "x-auth-token",
    "x-csrf-token",
    "proxy-authorization",
];

pub const DEFAULT_EXCLUDED_CONTENT_TYPES: &[&str] = &[
    "image/*",
    "audio/*",
    "video/*",
    "application/pdf",
    "application/zip",
    "application/octet-stream",
    "font/*",
];

const PRODUCTION_EXTRA_FIELDS: &[&str] = &[
    "email",
    "phone",
    "address",
    "dob",
    "date_of_birth",
    "iban",
    "account_number",
];

const PRODUCTION_EXTRA_HEADERS: &[&str] = &["x-forwarded-for", "x-real-ip"];

const MINIMAL_FIELDS: &[&str] = &["password", "token", "secret"];
const MINIMAL_HEADERS: &[&str] = &["authorization", "cookie"];

/// Named base configurations the builder can start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[default]
    Basic,
    Production,
    Development,
    Minimal,
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(Preset::Basic),
            "production" => Ok(Preset::Production),
            "development" => Ok(Preset::Development),
            "minimal" => Ok(Preset::Minimal),
            other => Err(format!(
                "unknown redaction preset '{other}' (expected basic, production, development or minimal)"
            )),
        }
    }
}

/// Raw settings a preset contributes before validation.
pub(crate) struct PresetDefaults {
    pub fields: Vec<String>,
    pub headers: Vec<String>,
    pub patterns: Vec<PatternSpec>,
    pub max_depth: usize,
    pub max_body_size: i64,
    pub sampling_rate: Option<f64>,
    pub content_types: Option<ContentTypeFilter>,
}

impl Preset {
    pub(crate) fn defaults(self) -> PresetDefaults {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        match self {
            Preset::Basic => PresetDefaults {
                fields: owned(DEFAULT_SENSITIVE_FIELDS),
                headers: owned(DEFAULT_SENSITIVE_HEADERS),
                patterns: Vec::new(),
                max_depth: DEFAULT_MAX_DEPTH,
                max_body_size: DEFAULT_MAX_BODY_SIZE as i64,
                sampling_rate: None,
                content_types: Some(ContentTypeFilter::with_default_excludes()),
            },
            Preset::Production => {
                let mut fields = owned(DEFAULT_SENSITIVE_FIELDS);
                fields.extend(owned(PRODUCTION_EXTRA_FIELDS));
                let mut headers = owned(DEFAULT_SENSITIVE_HEADERS);
                headers.extend(owned(PRODUCTION_EXTRA_HEADERS));
                let mut content_types = ContentTypeFilter::with_default_excludes();
                content_types.include = owned(&["*json*", "text/*", "*xml*"]);

                PresetDefaults {
                    fields,
                    headers,
                    patterns: vec![
                        PatternSpec::new(
                            r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
                            "[EMAIL]",
                        ),
                        PatternSpec::new(r"\b(?:\d[ -]?){12,15}\d\b", "[CARD]"),
                        PatternSpec::new(r"(?i)bearer\s+[A-Za-z0-9\-._~+/]+=*", "Bearer [REDACTED]"),
                    ],
                    max_depth: 8,
                    max_body_size: 5 * 1024,
                    sampling_rate: Some(0.1),
                    content_types: Some(content_types),
                }
            }
            Preset::Development => PresetDefaults {
                fields: owned(DEFAULT_SENSITIVE_FIELDS),
                headers: owned(DEFAULT_SENSITIVE_HEADERS),
                patterns: Vec::new(),
                max_depth: 20,
                max_body_size: 100 * 1024,
                sampling_rate: None,
                content_types: Some(ContentTypeFilter::with_default_excludes()),
            },
            Preset::Minimal => PresetDefaults {
                fields: owned(MINIMAL_FIELDS),
                headers: owned(MINIMAL_HEADERS),
                patterns: Vec::new(),
                max_depth: 5,
                max_body_size: 1024,
                sampling_rate: None,
                content_types: Some(ContentTypeFilter {
                    include: Vec::new(),
                    exclude: owned(&["*/*"]),
                }),
            },
        }
    }
}
