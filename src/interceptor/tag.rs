//! Interceptor tags
//!
//! Every interceptor belongs to exactly one tag group, and every request
//! selects one group to run. Four tags are reserved; any other string is a
//! caller-defined tag.

use std::fmt;

// == Request Type ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum RequestType {
    #[default]
    Base,
    Json,
    Download,
    Upload,
    Custom(String),
}

impl RequestType {
    pub fn as_str(&self) -> &str {
        match self {
            RequestType::Base => "base",
            RequestType::Json => "json",
            RequestType::Download => "download",
            RequestType::Upload => "upload",
            RequestType::Custom(tag) => tag,
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for RequestType {
    fn from(tag: &str) -> Self {
        match tag {
            "base" => RequestType::Base,
            "json" => RequestType::Json,
            "download" => RequestType::Download,
            "upload" => RequestType::Upload,
            other => RequestType::Custom(other.to_string()),
        }
    }
}

impl From<String> for RequestType {
    fn from(tag: String) -> Self {
        RequestType::from(tag.as_str())
    }
}
