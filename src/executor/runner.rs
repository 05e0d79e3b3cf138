use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::Local;
use once_cell::sync::OnceCell;
use reqwest::{
    header::{HeaderMap, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION},
    redirect::Policy,
    Client, Method, Proxy, Request, Response, StatusCode,
};
use tracing::{debug, error, warn};
use url::Url;

use crate::{
    config::ApiConfig,
    error::{ExecutorError, Result},
};

use super::{
    descriptor::{prepare, X_API_KEY},
    models::{Attachment, ExchangeRecord, Query, RequestBody, Verb},
    normalize::{map_exchange, ReceivedResponse},
    writer::write_response_body,
};

const TIME_FORMAT: &str = "%H:%M:%S%.3f";

fn timestamp() -> String {
    Local::now().format(TIME_FORMAT).to_string()
}

/// Issues requests against one configured API and returns normalized
/// [`ExchangeRecord`]s.
///
/// The configuration is frozen at construction. Cloning is cheap and clones
/// share the underlying connection pool; concurrent calls are independent.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    config: Arc<ApiConfig>,
    client: Arc<OnceCell<Client>>,
}

impl RequestExecutor {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: Arc::new(OnceCell::new()),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub async fn get(&self, endpoint: &str, query: Option<&Query>) -> Result<ExchangeRecord> {
        self.execute(Verb::Get, endpoint, query, None, None).await
    }

    pub async fn post(
        &self,
        endpoint: &str,
        query: Option<&Query>,
        body: Option<RequestBody>,
        file: Option<&Attachment>,
    ) -> Result<ExchangeRecord> {
        self.execute(Verb::Post, endpoint, query, body, file).await
    }

    pub async fn put(
        &self,
        endpoint: &str,
        query: Option<&Query>,
        body: Option<RequestBody>,
        file: Option<&Attachment>,
    ) -> Result<ExchangeRecord> {
        self.execute(Verb::Put, endpoint, query, body, file).await
    }

    pub async fn delete(
        &self,
        endpoint: &str,
        query: Option<&Query>,
        body: Option<RequestBody>,
    ) -> Result<ExchangeRecord> {
        self.execute(Verb::Delete, endpoint, query, body, None).await
    }

    /// Runs one verb. Any status below 600 is a successful exchange; only
    /// failures to complete the round trip are returned as errors.
    pub async fn execute(
        &self,
        verb: Verb,
        endpoint: &str,
        query: Option<&Query>,
        body: Option<RequestBody>,
        file: Option<&Attachment>,
    ) -> Result<ExchangeRecord> {
        match self.exchange(verb, endpoint, query, body, file).await {
            Ok(record) => Ok(record),
            Err(err) => {
                error!(verb = verb.as_str(), endpoint, "ERROR: {verb} Request - {err}");
                Err(err)
            }
        }
    }

    fn client(&self) -> Result<&Client> {
        self.client.get_or_try_init(|| build_client(&self.config))
    }

    async fn exchange(
        &self,
        verb: Verb,
        endpoint: &str,
        query: Option<&Query>,
        body: Option<RequestBody>,
        file: Option<&Attachment>,
    ) -> Result<ExchangeRecord> {
        let client = self.client()?;
        let prepared = prepare(client, &self.config, verb, endpoint, query, body, file).await?;

        let request_time = timestamp();
        let start = Instant::now();
        debug!(method = verb.as_str(), url = %prepared.sent.url, "dispatching request");

        let deadline = start + self.config.timeout();
        let (response, redirects) =
            dispatch(client, prepared.request, prepared.sent.max_redirects, deadline).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        let response_time = timestamp();
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let saved_files = self.save_body(endpoint, &headers, &body).await;

        let received = ReceivedResponse {
            status,
            headers,
            body,
            redirects,
            saved_files,
            elapsed_ms,
        };
        Ok(map_exchange(
            &prepared.sent,
            &received,
            request_time,
            response_time,
        ))
    }

    /// Keeps every body when an output directory is configured and spills
    /// binary bodies to the temp dir otherwise. Write failures only lose the file.
    async fn save_body(&self, endpoint: &str, headers: &HeaderMap, body: &[u8]) -> Vec<PathBuf> {
        let output_dir = self.config.response_output_dir.as_deref();
        if body.is_empty() || (output_dir.is_none() && std::str::from_utf8(body).is_ok()) {
            return Vec::new();
        }

        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
        match write_response_body(body, content_type, output_dir, endpoint).await {
            Ok(path) => vec![path],
            Err(err) => {
                warn!(endpoint, "could not save response body: {err:#}");
                Vec::new()
            }
        }
    }
}

fn build_client(config: &ApiConfig) -> Result<Client> {
    let mut builder = Client::builder().redirect(Policy::none());

    if let Some(proxy) = &config.proxy {
        let mut transport_proxy = Proxy::all(proxy.url()).map_err(ExecutorError::Client)?;
        if let Some(auth) = &proxy.auth {
            transport_proxy = transport_proxy.basic_auth(&auth.username, &auth.password);
        }
        builder = builder.proxy(transport_proxy);
    }

    builder.build().map_err(ExecutorError::Client)
}

/// Sends `first` and follows up to `max_redirects` hops. The chain is
/// returned alongside the final response instead of living on the client.
///
/// Every hop, and the final body read, must finish before `deadline`.
async fn dispatch(
    client: &Client,
    first: Request,
    max_redirects: u32,
    deadline: Instant,
) -> Result<(Response, Vec<Url>)> {
    let mut redirects = Vec::new();
    let mut current = first;

    loop {
        *current.timeout_mut() = Some(remaining(deadline));
        let method = current.method().clone();
        let url = current.url().clone();
        let headers = current.headers().clone();
        let replay = current.try_clone();

        let response = client.execute(current).await?;
        if redirects.len() as u32 >= max_redirects {
            return Ok((response, redirects));
        }
        let Some(target) = redirect_target(&response) else {
            return Ok((response, redirects));
        };

        let mut next = if switches_to_get(response.status(), &method) {
            let mut next = Request::new(Method::GET, target.clone());
            *next.headers_mut() = headers;
            next.headers_mut().remove(CONTENT_TYPE);
            next.headers_mut().remove(CONTENT_LENGTH);
            next
        } else {
            match replay {
                Some(mut next) => {
                    *next.url_mut() = target.clone();
                    next
                }
                None => {
                    debug!(%target, "redirect body cannot be replayed; stopping");
                    return Ok((response, redirects));
                }
            }
        };

        if url.origin() != target.origin() {
            strip_credentials(next.headers_mut());
        }

        debug!(status = response.status().as_u16(), %target, "following redirect");
        redirects.push(target);
        current = next;
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

fn redirect_target(response: &Response) -> Option<Url> {
    let status = response.status();
    let is_redirect = matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    );
    if !is_redirect {
        return None;
    }
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    response.url().join(location).ok()
}

fn switches_to_get(status: StatusCode, method: &Method) -> bool {
    match status {
        StatusCode::SEE_OTHER => *method != Method::HEAD,
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => {
            *method != Method::GET && *method != Method::HEAD
        }
        _ => false,
    }
}

fn strip_credentials(headers: &mut HeaderMap) {
    headers.remove(AUTHORIZATION);
    headers.remove(COOKIE);
    headers.remove(X_API_KEY);
}
