use std::path::Path;

use reqwest::{
    header::{
        HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, COOKIE,
    },
    multipart::{Form, Part},
    Client, Request,
};
use url::Url;

use crate::{
    config::{ApiConfig, AuthType},
    error::{ExecutorError, Result},
};

use super::{
    models::{Attachment, FileRecord, Query, RequestBody, SentRequest, Verb},
    writer::content_type_for_path,
};

pub(super) const X_API_KEY: &str = "x-api-key";
const RESPONSE_TYPE: &str = "response";
const FILE_FIELD: &str = "file";

/// A dispatchable request together with its read-only description.
#[derive(Debug)]
pub(super) struct PreparedRequest {
    pub request: Request,
    pub sent: SentRequest,
}

pub(super) fn endpoint_url(base_url: &str, endpoint: &str) -> Result<Url> {
    let raw = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    );
    Url::parse(&raw).map_err(|source| ExecutorError::InvalidUrl { url: raw, source })
}

fn insert(headers: &mut HeaderMap, name: &str, value: &str) -> Result<()> {
    let invalid = || ExecutorError::InvalidHeader {
        name: name.to_string(),
    };
    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
    let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
    headers.insert(name, value);
    Ok(())
}

/// Headers derived from the configuration, identical for every verb.
///
/// Custom `headers` go in first so the dedicated fields win on conflict. With
/// an `authType` set, the only credential header sent is the one it selects.
/// `Content-Type: application/json` is left out when a file is attached;
/// the multipart encoder supplies its own with the boundary.
pub(super) fn configured_headers(config: &ApiConfig, attaching_file: bool) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (name, value) in &config.headers {
        insert(&mut headers, name, value)?;
    }

    if let Some(auth_type) = &config.auth_type {
        let auth = config.auth.as_deref().unwrap_or_default();
        headers.remove(AUTHORIZATION);
        headers.remove(X_API_KEY);
        match auth_type {
            AuthType::Basic => insert(&mut headers, AUTHORIZATION.as_str(), &format!("Basic {auth}"))?,
            AuthType::Bearer => {
                insert(&mut headers, AUTHORIZATION.as_str(), &format!("Bearer {auth}"))?
            }
            AuthType::ApiKey => insert(&mut headers, X_API_KEY, auth)?,
            AuthType::Other(_) => insert(&mut headers, AUTHORIZATION.as_str(), auth)?,
        }
    }

    if let Some(cookies) = config.cookies.as_ref().filter(|c| !c.is_empty()) {
        insert(&mut headers, COOKIE.as_str(), &cookies.join("; "))?;
    }

    if attaching_file {
        headers.remove(CONTENT_TYPE);
    } else {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    let optional = [
        (RESPONSE_TYPE, &config.response_type),
        ("accept", &config.accept),
        ("connection", &config.connection),
        ("cache-control", &config.cache_control),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            insert(&mut headers, name, value)?;
        }
    }

    Ok(headers)
}

async fn file_part(path: &Path) -> Result<(Part, FileRecord)> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ExecutorError::Attachment {
            path: path.to_path_buf(),
            source,
        })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| FILE_FIELD.to_string());
    let content_type = content_type_for_path(path);

    let record = FileRecord {
        field: FILE_FIELD.to_string(),
        path: path.to_path_buf(),
        file_name: file_name.clone(),
        size: bytes.len() as u64,
        content_type: content_type.to_string(),
    };
    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(content_type)?;
    Ok((part, record))
}

/// Builds the call-local request for one verb invocation.
pub(super) async fn prepare(
    client: &Client,
    config: &ApiConfig,
    verb: Verb,
    endpoint: &str,
    query: Option<&Query>,
    body: Option<RequestBody>,
    file: Option<&Attachment>,
) -> Result<PreparedRequest> {
    if body.is_some() && file.is_some() {
        return Err(ExecutorError::BodyWithFile);
    }

    let mut url = endpoint_url(&config.base_url, endpoint)?;
    let queries: Vec<(String, String)> = query.map(|q| q.pairs().to_vec()).unwrap_or_default();
    if !queries.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &queries {
            pairs.append_pair(key, value);
        }
    }

    let headers = configured_headers(config, file.is_some())?;
    let mut builder = client
        .request(verb.method(), url.clone())
        .headers(headers)
        .timeout(config.timeout());

    if let Some(body) = &body {
        builder = builder.body(body.to_bytes()?);
    }

    let mut files = Vec::new();
    if let Some(attachment) = file {
        let path = attachment
            .resolve()
            .map_err(|source| ExecutorError::Attachment {
                path: attachment.relative(),
                source,
            })?;
        let (part, record) = file_part(&path).await?;
        builder = builder.multipart(Form::new().part(FILE_FIELD, part));
        files.push(record);
    }

    let request = builder.build()?;
    let sent = SentRequest {
        verb,
        url: request.url().clone(),
        headers: request.headers().clone(),
        queries,
        cookies: config.cookies.clone().unwrap_or_default(),
        body,
        files,
        max_redirects: config.max_redirects(),
    };

    Ok(PreparedRequest { request, sent })
}
