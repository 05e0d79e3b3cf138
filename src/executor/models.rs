use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use reqwest::{header::HeaderMap, Method};
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters in insertion order. Repeated keys are all sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.pairs.push((key.into(), value.to_string()));
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Query
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl FromIterator<(String, String)> for Query {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

/// Payload of a POST, PUT or DELETE.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON.
    Json(Value),
    /// Sent verbatim.
    Text(String),
    /// Sent as a JSON array of strings.
    Lines(Vec<String>),
}

impl RequestBody {
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(match self {
            RequestBody::Json(value) => serde_json::to_vec(value)?,
            RequestBody::Text(text) => text.as_bytes().to_vec(),
            RequestBody::Lines(lines) => serde_json::to_vec(lines)?,
        })
    }

    pub(crate) fn to_value(&self) -> Value {
        match self {
            RequestBody::Json(value) => value.clone(),
            RequestBody::Text(text) => Value::String(text.clone()),
            RequestBody::Lines(lines) => {
                Value::Array(lines.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<String> for RequestBody {
    fn from(value: String) -> Self {
        RequestBody::Text(value)
    }
}

impl From<&str> for RequestBody {
    fn from(value: &str) -> Self {
        RequestBody::Text(value.to_string())
    }
}

impl From<Vec<String>> for RequestBody {
    fn from(value: Vec<String>) -> Self {
        RequestBody::Lines(value)
    }
}

/// A file to upload, given as path segments joined onto the working
/// directory (an absolute first segment is used as-is).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    segments: Vec<String>,
}

impl Attachment {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub(crate) fn relative(&self) -> PathBuf {
        self.segments.iter().collect()
    }

    pub fn resolve(&self) -> std::io::Result<PathBuf> {
        let relative = self.relative();
        if relative.is_absolute() {
            Ok(relative)
        } else {
            Ok(std::env::current_dir()?.join(relative))
        }
    }
}

impl From<&Path> for Attachment {
    fn from(path: &Path) -> Self {
        Self {
            segments: vec![path.to_string_lossy().into_owned()],
        }
    }
}

/// The request exactly as it left the executor. Built per call and never
/// shared between calls.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub verb: Verb,
    pub url: Url,
    pub headers: HeaderMap,
    pub queries: Vec<(String, String)>,
    pub cookies: Vec<String>,
    pub body: Option<RequestBody>,
    pub files: Vec<FileRecord>,
    pub max_redirects: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub field: String,
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub content_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectRecord {
    pub number_of_redirects: usize,
    pub redirect_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    pub time: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub cookies: Vec<String>,
    pub port: Option<u16>,
    pub url: String,
    pub queries: Map<String, Value>,
    pub body: Option<Value>,
    /// Multipart field name to uploaded file name.
    pub form_data: Option<BTreeMap<String, String>>,
    pub max_redirects: u32,
    pub redirects: RedirectRecord,
    pub files: Vec<FileRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub time: String,
    pub elapsed_ms: f64,
    pub headers: BTreeMap<String, String>,
    pub buffered: bool,
    pub redirects: Vec<String>,
    pub status: u16,
    pub status_text: String,
    pub data: Value,
    pub files: Vec<PathBuf>,
}

/// What a verb call hands back: the request as sent and the response as received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeRecord {
    pub request: RequestRecord,
    pub response: ResponseRecord,
}
