use std::{collections::BTreeMap, path::PathBuf};

use reqwest::{
    header::{HeaderMap, CONTENT_TYPE},
    StatusCode,
};
use serde_json::{Map, Value};
use url::Url;

use super::{
    models::{ExchangeRecord, RedirectRecord, RequestRecord, ResponseRecord, SentRequest},
    writer::is_json_content_type,
};

/// A fully buffered response plus what the executor learned while receiving it.
#[derive(Debug, Clone)]
pub struct ReceivedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub redirects: Vec<Url>,
    pub saved_files: Vec<PathBuf>,
    pub elapsed_ms: f64,
}

pub(crate) fn collect_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Repeated header names are folded into one comma separated value.
fn header_record(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut record: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in collect_headers(headers) {
        record
            .entry(name)
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    record
}

/// Repeated query keys become arrays, in the order they were sent.
fn query_record(pairs: &[(String, String)]) -> Map<String, Value> {
    let mut record = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value.clone());
        match record.get_mut(key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                record.insert(key.clone(), value);
            }
        }
    }
    record
}

/// JSON when the server says so and the bytes agree, text otherwise, hex for
/// binary; never fails.
pub(crate) fn decode_body(bytes: &[u8], content_type: Option<&str>) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    if is_json_content_type(content_type) {
        if let Ok(value) = serde_json::from_slice(bytes) {
            return value;
        }
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Value::String(text.to_string()),
        Err(_) => Value::String(hex::encode(bytes)),
    }
}

/// Builds the record handed back to callers. Tolerates every status and any
/// body; fields that cannot be derived are left empty.
pub fn map_exchange(
    sent: &SentRequest,
    received: &ReceivedResponse,
    request_time: String,
    response_time: String,
) -> ExchangeRecord {
    let redirect_list: Vec<String> = received.redirects.iter().map(Url::to_string).collect();

    let form_data: Option<BTreeMap<String, String>> = (!sent.files.is_empty()).then(|| {
        sent.files
            .iter()
            .map(|file| (file.field.clone(), file.file_name.clone()))
            .collect()
    });

    let request = RequestRecord {
        time: request_time,
        method: sent.verb.as_str().to_string(),
        headers: header_record(&sent.headers),
        cookies: sent.cookies.clone(),
        port: sent.url.port_or_known_default(),
        url: sent.url.to_string(),
        queries: query_record(&sent.queries),
        body: sent.body.as_ref().map(|body| body.to_value()),
        form_data,
        max_redirects: sent.max_redirects,
        redirects: RedirectRecord {
            number_of_redirects: redirect_list.len(),
            redirect_list: redirect_list.clone(),
        },
        files: sent.files.clone(),
    };

    let content_type = received
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    let response = ResponseRecord {
        time: response_time,
        elapsed_ms: received.elapsed_ms,
        headers: header_record(&received.headers),
        buffered: true,
        redirects: redirect_list,
        status: received.status.as_u16(),
        status_text: received
            .status
            .canonical_reason()
            .unwrap_or_default()
            .to_string(),
        data: decode_body(&received.body, content_type),
        files: received.saved_files.clone(),
    };

    ExchangeRecord { request, response }
}
