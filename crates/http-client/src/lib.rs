//! Shared HTTP client wrapper for upstream source adapters.
//!
//! Grounded on `autopilot::infra::solvers::Driver`: a thin `reqwest::Client`
//! wrapper with a size-limited body read and a per-call timeout, rather
//! than a generic HTTP abstraction layer.

use {
    anyhow::{anyhow, Context, Result},
    listing_core::{ErrorKind, SearchError},
    reqwest::Client,
    std::time::Duration,
    url::Url,
};

const DEFAULT_RESPONSE_SIZE_LIMIT: usize = 10_000_000;

#[derive(Debug, Clone, clap::Args)]
pub struct HttpClientArguments {
    /// Response body size limit per upstream call, in bytes.
    #[clap(long, env, default_value_t = DEFAULT_RESPONSE_SIZE_LIMIT)]
    pub response_size_limit: usize,
}

impl Default for HttpClientArguments {
    fn default() -> Self {
        Self {
            response_size_limit: DEFAULT_RESPONSE_SIZE_LIMIT,
        }
    }
}

/// A size/time-limited `reqwest::Client` wrapper shared by every HTTP-backed
/// source adapter.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    response_size_limit: usize,
}

impl HttpClient {
    pub fn new(base_url: Url, args: &HttpClientArguments) -> Self {
        Self {
            client: Client::builder().build().expect("reqwest client"),
            base_url,
            response_size_limit: args.response_size_limit,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// GETs `path` (joined onto `base_url`) with query params, deserializing
    /// the JSON body as `Response`. Maps transport failures onto the shared
    /// `ErrorKind` taxonomy so the dispatch engine can apply retry/breaker
    /// policy uniformly.
    pub async fn get_json<Response>(
        &self,
        path: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<Response, SearchError>
    where
        Response: serde::de::DeserializeOwned,
    {
        self.get_json_bearer(path, query, None, timeout).await
    }

    /// As [`Self::get_json`], but attaches `bearer` (if given) as an
    /// `Authorization: Bearer` header. Used by credentialed sources like
    /// eBay's Browse API, which rejects query-string credentials.
    pub async fn get_json_bearer<Response>(
        &self,
        path: &str,
        query: &[(&str, String)],
        bearer: Option<&str>,
        timeout: Duration,
    ) -> Result<Response, SearchError>
    where
        Response: serde::de::DeserializeOwned,
    {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| SearchError::new(ErrorKind::Permanent, format!("bad path {path}: {err}")))?;

        tracing::trace!(%url, "adapter request");
        let mut request = self.client.get(url.clone()).query(query).timeout(timeout);
        if let Some(bearer) = bearer {
            request = request.bearer_auth(bearer);
        }
        let mut response = request.send().await.map_err(classify_reqwest_error)?;

        let status = response.status();
        let body = response_body_with_size_limit(&mut response, self.response_size_limit)
            .await
            .map_err(|err| SearchError::new(ErrorKind::Transient, err.to_string()))?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SearchError::new(ErrorKind::Unauthorized, "401 from upstream"));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::new(ErrorKind::RateLimited, "429 from upstream"));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SearchError::not_found(format!("{url} returned 404")));
        }
        if status.is_server_error() {
            return Err(SearchError::transient(format!("{url} returned {status}")));
        }
        if !status.is_success() {
            return Err(SearchError::new(
                ErrorKind::Permanent,
                format!("{url} returned unexpected status {status}"),
            ));
        }

        serde_json::from_slice(&body)
            .with_context(|| format!("bad json from {url}"))
            .map_err(|err| SearchError::new(ErrorKind::Permanent, err.to_string()))
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> SearchError {
    if err.is_timeout() {
        SearchError::new(ErrorKind::DeadlineExceeded, err.to_string())
    } else {
        SearchError::new(ErrorKind::Transient, err.to_string())
    }
}

async fn response_body_with_size_limit(
    response: &mut reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if bytes.len() + chunk.len() > limit {
            return Err(anyhow!("response exceeded size limit of {limit} bytes"));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
