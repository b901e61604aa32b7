//! Fetch Types
//!
//! Requests as seen by the worker's fetch handler and the response values it
//! produces. A `Response` is an immutable value: cloning shares the body
//! buffer, so the copy handed to the cache and the copy handed to the page
//! never invalidate each other.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

/// HTTP request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl RequestMethod {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Parse a method name, case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request destination, collapsed to the categories routing cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestDestination {
    Document,
    Image,
    Style,
    Script,
    Font,
    /// Anything else, including the empty destination of `fetch()` calls
    #[default]
    Other,
}

impl RequestDestination {
    /// Map a fetch destination string (`"image"`, `"style"`, ...) to a category
    pub fn from_fetch(value: &str) -> Self {
        match value {
            "document" | "iframe" | "frame" => Self::Document,
            "image" => Self::Image,
            "style" => Self::Style,
            "script" | "worker" | "sharedworker" => Self::Script,
            "font" => Self::Font,
            _ => Self::Other,
        }
    }

    /// Static sub-resources refreshed with stale-while-revalidate
    pub fn is_static_asset(&self) -> bool {
        matches!(self, Self::Style | Self::Script | Self::Font)
    }
}

/// Request mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    SameOrigin,
    NoCors,
    #[default]
    Cors,
    /// Top-level document load
    Navigate,
}

/// Identity of a cache entry: exact URL plus method
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey {
    /// Request method
    pub method: RequestMethod,
    /// Absolute URL, compared byte for byte
    pub url: String,
}

impl RequestKey {
    pub fn new(method: RequestMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }

    /// Key for a GET of `url`
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(RequestMethod::Get, url)
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Fetch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Absolute request URL
    pub url: String,
    /// Request method
    pub method: RequestMethod,
    /// Request mode (`navigate` for page loads)
    pub mode: RequestMode,
    /// What the response will be used for
    pub destination: RequestDestination,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// Request body, if any
    pub body: Option<Bytes>,
}

impl Request {
    /// Create a GET request
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: RequestMethod::Get,
            mode: RequestMode::Cors,
            destination: RequestDestination::Other,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Create a top-level navigation request
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::new(url)
            .with_mode(RequestMode::Navigate)
            .with_destination(RequestDestination::Document)
    }

    pub fn with_method(mut self, method: RequestMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_destination(mut self, destination: RequestDestination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Whether this is a top-level navigation
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Cache key for this request
    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.method, self.url.clone())
    }
}

/// Response type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Same-origin response
    Basic,
    /// Valid cross-origin response
    Cors,
    /// Synthesized by the worker
    #[default]
    Default,
    /// Network error
    Error,
    /// Opaque cross-origin response
    Opaque,
}

/// Fetch response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response type
    pub response_type: ResponseType,
    /// HTTP status code
    pub status: u16,
    /// Status message
    pub status_text: String,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Response body; clones share the buffer
    pub body: Bytes,
}

impl Response {
    /// Create an empty response with the given status
    pub fn new(status: u16) -> Self {
        Self {
            response_type: ResponseType::Default,
            status,
            status_text: status_text_for(status).to_string(),
            headers: BTreeMap::new(),
            body: Bytes::new(),
        }
    }

    /// Create a 200 response carrying `body`
    pub fn ok_with(body: impl Into<Bytes>) -> Self {
        Self::new(200).with_body(body)
    }

    /// Network error response
    pub fn error() -> Self {
        Self {
            response_type: ResponseType::Error,
            status: 0,
            status_text: String::new(),
            headers: BTreeMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// Check if response is OK (2xx)
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Only complete 200 responses are written to a cache
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.response_type != ResponseType::Error
    }

    /// Header lookup, case-insensitive on the name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as UTF-8 text, if valid
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Approximate stored size in bytes
    pub fn size(&self) -> usize {
        self.body.len()
            + self
                .headers
                .iter()
                .map(|(k, v)| k.len() + v.len())
                .sum::<usize>()
    }
}

/// Get status text for status code
fn status_text_for(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}
