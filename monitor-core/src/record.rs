//! Traffic record data model
//!
//! A `TrafficRecord` describes one captured HTTP exchange. Producers build a
//! record and hand it to the capture buffer, which assigns its `id` and
//! `timestamp`; after that the record is never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Multi-valued header map: header name to every value observed, in order
pub type HeaderMap = BTreeMap<String, Vec<String>>;

/// One captured request/response exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficRecord {
    /// Identity assigned by the capture buffer (0 until inserted)
    pub id: u64,

    /// Capture time, stamped by the capture buffer on insertion
    pub timestamp: DateTime<Utc>,

    pub method: String,
    pub url: String,
    pub host: String,
    pub path: String,

    /// Response status code, 0 when no response was observed
    pub status_code: u16,
    pub status_text: String,

    pub request_headers: HeaderMap,
    pub response_headers: HeaderMap,

    pub request_body: String,
    pub response_body: String,

    pub content_type: String,

    /// Elapsed processing time, serialized as integer nanoseconds
    #[serde(with = "duration_nanos")]
    pub duration: Duration,

    /// Negotiated TLS version, empty for plaintext
    pub tls_version: String,

    /// Address of the client that issued the request, empty if unknown
    pub client_addr: String,
}

impl Default for TrafficRecord {
    fn default() -> Self {
        Self {
            id: 0,
            timestamp: Utc::now(),
            method: String::new(),
            url: String::new(),
            host: String::new(),
            path: String::new(),
            status_code: 0,
            status_text: String::new(),
            request_headers: HeaderMap::new(),
            response_headers: HeaderMap::new(),
            request_body: String::new(),
            response_body: String::new(),
            content_type: String::new(),
            duration: Duration::ZERO,
            tls_version: String::new(),
            client_addr: String::new(),
        }
    }
}

impl TrafficRecord {
    /// Create a record for a request, deriving `host` and `path` from the URL.
    ///
    /// An unparseable URL is kept verbatim and leaves `host` and `path` empty.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let (host, path) = split_url(&url);

        Self {
            method: method.into(),
            url,
            host,
            path,
            ..Default::default()
        }
    }

    /// Override the derived host, e.g. from the `Host` header of an origin-form request
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Record the response status line
    pub fn with_response(mut self, status_code: u16, status_text: impl Into<String>) -> Self {
        self.status_code = status_code;
        self.status_text = status_text.into();
        self
    }

    pub fn with_request_headers(mut self, headers: HeaderMap) -> Self {
        self.request_headers = headers;
        self
    }

    pub fn with_response_headers(mut self, headers: HeaderMap) -> Self {
        self.response_headers = headers;
        self
    }

    /// Append a request header value, keeping earlier occurrences of the same name
    pub fn add_request_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_headers
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Append a response header value, keeping earlier occurrences of the same name
    pub fn add_response_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response_headers
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_request_body(mut self, body: impl Into<String>) -> Self {
        self.request_body = body.into();
        self
    }

    pub fn with_response_body(mut self, body: impl Into<String>) -> Self {
        self.response_body = body.into();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_tls_version(mut self, tls_version: impl Into<String>) -> Self {
        self.tls_version = tls_version.into();
        self
    }

    pub fn with_client_addr(mut self, client_addr: impl Into<String>) -> Self {
        self.client_addr = client_addr.into();
        self
    }

    /// Whether a response was observed for this exchange
    pub fn has_response(&self) -> bool {
        self.status_code > 0
    }
}

/// Split a URL into `(host[:port], path)`, or two empty strings if it does not parse
fn split_url(raw: &str) -> (String, String) {
    match url::Url::parse(raw) {
        Ok(parsed) => {
            let host = match (parsed.host_str(), parsed.port()) {
                (Some(host), Some(port)) => format!("{}:{}", host, port),
                (Some(host), None) => host.to_string(),
                (None, _) => String::new(),
            };
            (host, parsed.path().to_string())
        }
        Err(_) => (String::new(), String::new()),
    }
}

/// Serde adapter encoding a `Duration` as an integer count of nanoseconds
mod duration_nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        serializer.serialize_u64(nanos)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}
