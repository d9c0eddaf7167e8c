//! HTTP blob backend for a remote content-storage service.
//!
//! Objects are addressed as `{base_url}/{storage_key}` and moved with plain
//! `PUT`, `GET` and `DELETE`. Calls are never retried here; transient failures
//! surface as [`BlobError::Unavailable`] or [`BlobError::Timeout`] and the
//! caller decides.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{header, Method, StatusCode, Url};
use tracing::debug;

use super::{check_deadline, validate_storage_key, BlobBackend, BlobError, BlobLocation, BlobResult, WritePolicy};
use crate::Deadline;

/// Per-request timeout used when the deadline leaves more time than this.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blob backend talking to a remote object service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBlobBackend {
    client: Client,
    base_url: Url,
    token: Option<String>,
    policy: WritePolicy,
    request_timeout: Duration,
}

impl HttpBlobBackend {
    /// Creates a backend for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Backend`] if the URL is not `http`/`https` or the
    /// HTTP client cannot be built.
    pub fn new(base_url: &str) -> BlobResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| BlobError::Backend(format!("invalid blob url {base_url:?}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(BlobError::Backend(format!(
                "unsupported blob url scheme: {}",
                base_url.scheme()
            )));
        }
        let client = Client::builder()
            .user_agent(format!("docvault-core/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BlobError::Backend(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            token: None,
            policy: WritePolicy::RejectExisting,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the behaviour for writes to an occupied key.
    #[must_use]
    pub const fn with_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Caps each request at `timeout`, independent of the operation deadline.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{key}", self.base_url.as_str().trim_end_matches('/'))
    }

    fn request(&self, method: Method, key: &str, deadline: Deadline) -> RequestBuilder {
        let builder = self
            .client
            .request(method, self.object_url(key))
            .timeout(deadline.bounded_by(self.request_timeout));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn send(key: &str, builder: RequestBuilder) -> BlobResult<Response> {
        builder.send().map_err(|err| {
            if err.is_timeout() {
                BlobError::Timeout {
                    key: key.to_string(),
                }
            } else if err.is_connect() || err.is_request() {
                BlobError::Unavailable(err.to_string())
            } else {
                BlobError::Backend(err.to_string())
            }
        })
    }
}

fn status_error(key: &str, status: StatusCode) -> BlobError {
    match status {
        StatusCode::NOT_FOUND => BlobError::NotFound {
            key: key.to_string(),
        },
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => BlobError::AlreadyExists {
            key: key.to_string(),
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => BlobError::Timeout {
            key: key.to_string(),
        },
        s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
            BlobError::Unavailable(format!("{key}: status {s}"))
        }
        s => BlobError::Backend(format!("{key}: unexpected status {s}")),
    }
}

impl BlobBackend for HttpBlobBackend {
    fn put(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
        deadline: Deadline,
    ) -> BlobResult<BlobLocation> {
        validate_storage_key(key)?;
        check_deadline(key, deadline)?;

        let mut builder = self
            .request(Method::PUT, key, deadline)
            .header(header::CONTENT_TYPE, content_type)
            .body(data.to_vec());
        if self.policy == WritePolicy::RejectExisting {
            builder = builder.header(header::IF_NONE_MATCH, "*");
        }

        let response = Self::send(key, builder)?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(key, status));
        }
        debug!(key, size = data.len(), %status, "blob uploaded");
        Ok(BlobLocation {
            key: key.to_string(),
            url: self.object_url(key),
        })
    }

    fn get(&self, key: &str, deadline: Deadline) -> BlobResult<Vec<u8>> {
        validate_storage_key(key)?;
        check_deadline(key, deadline)?;

        let response = Self::send(key, self.request(Method::GET, key, deadline))?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(key, status));
        }
        response.bytes().map(|bytes| bytes.to_vec()).map_err(|err| {
            if err.is_timeout() {
                BlobError::Timeout {
                    key: key.to_string(),
                }
            } else {
                BlobError::Unavailable(format!("{key}: failed to read body: {err}"))
            }
        })
    }

    fn delete(&self, key: &str, deadline: Deadline) -> BlobResult<()> {
        validate_storage_key(key)?;
        check_deadline(key, deadline)?;

        let response = Self::send(key, self.request(Method::DELETE, key, deadline))?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            debug!(key, %status, "blob deleted");
            return Ok(());
        }
        Err(status_error(key, status))
    }

    fn write_policy(&self) -> WritePolicy {
        self.policy
    }
}
