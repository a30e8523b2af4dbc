//! Request execution through an injectable fetcher

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use command_model::SpecArtifacts;
use spec_core::HttpMethod;

use crate::builder::{
    BuildOutcome, EmbeddedDefaults, GlobalOptions, Invocation, PreparedRequest, RequestBuilder,
};
use crate::cancel::CancellationToken;
use crate::error::{EngineError, EngineResult};
use crate::profile::ProfileStore;
use crate::result::{CommandResult, ResponseInfo, Timing};

/// A captured HTTP response
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Seam for issuing HTTP requests; tests supply a mock returning fixed
/// responses
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch(&self, request: &PreparedRequest) -> EngineResult<FetchedResponse>;
}

/// Default fetcher backed by reqwest.
///
/// No timeout is applied here; the host may impose its own.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| EngineError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch(&self, request: &PreparedRequest) -> EngineResult<FetchedResponse> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Trace => reqwest::Method::TRACE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        Ok(FetchedResponse {
            status,
            headers,
            body,
        })
    }
}

/// Runs invocations end to end: build, fetch, fold into a result
pub struct Executor<'a> {
    artifacts: &'a SpecArtifacts,
    embedded: EmbeddedDefaults,
    globals: GlobalOptions,
    profiles: Arc<dyn ProfileStore>,
    fetcher: Arc<dyn HttpFetcher>,
}

impl<'a> Executor<'a> {
    pub fn new(
        artifacts: &'a SpecArtifacts,
        embedded: EmbeddedDefaults,
        globals: GlobalOptions,
        profiles: Arc<dyn ProfileStore>,
        fetcher: Arc<dyn HttpFetcher>,
    ) -> Self {
        Self {
            artifacts,
            embedded,
            globals,
            profiles,
            fetcher,
        }
    }

    /// Build the request and return it without executing
    pub async fn prepare(&self, invocation: &Invocation) -> CommandResult {
        match self.build(invocation).await {
            Ok(BuildOutcome::Prepared(request)) => CommandResult::Prepared {
                resource: None,
                action: None,
                request,
            },
            Ok(BuildOutcome::Invalid(errors)) => CommandResult::Validation {
                resource: None,
                action: None,
                errors,
                request: None,
            },
            Err(err) => CommandResult::from_engine_error(&err),
        }
        .with_context(&invocation.resource, &invocation.action)
    }

    /// Build and execute one request.
    ///
    /// With the curl flag set, returns the rendering instead of
    /// executing. At most one HTTP request is issued; there are no
    /// retries.
    pub async fn execute(
        &self,
        invocation: &Invocation,
        cancel: Option<&CancellationToken>,
    ) -> CommandResult {
        let request = match self.build(invocation).await {
            Ok(BuildOutcome::Prepared(request)) => request,
            Ok(BuildOutcome::Invalid(errors)) => {
                return CommandResult::Validation {
                    resource: None,
                    action: None,
                    errors,
                    request: None,
                }
                .with_context(&invocation.resource, &invocation.action)
            }
            Err(err) => {
                return CommandResult::from_engine_error(&err)
                    .with_context(&invocation.resource, &invocation.action)
            }
        };

        if invocation.curl {
            return CommandResult::Curl {
                resource: None,
                action: None,
                curl: request.curl.clone(),
                request,
            }
            .with_context(&invocation.resource, &invocation.action);
        }

        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return CommandResult::error("cancelled")
                .with_context(&invocation.resource, &invocation.action);
        }

        let started_at = Utc::now();
        let clock = Instant::now();

        let fetched = match cancel {
            Some(token) => {
                tokio::select! {
                    outcome = self.fetcher.fetch(&request) => outcome,
                    _ = token.cancelled() => Err(EngineError::Cancelled),
                }
            }
            None => self.fetcher.fetch(&request).await,
        };

        let timing = Timing {
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
        };

        match fetched {
            Ok(response) => {
                debug!(status = response.status, "response received");
                CommandResult::Success {
                    resource: None,
                    action: None,
                    response: build_response_info(response),
                    request,
                    timing,
                }
            }
            Err(err) => {
                warn!("request failed: {}", err);
                CommandResult::Error {
                    resource: None,
                    action: None,
                    message: err.to_string(),
                    request: Some(request),
                    response: None,
                    timing: Some(timing),
                }
            }
        }
        .with_context(&invocation.resource, &invocation.action)
    }

    async fn build(&self, invocation: &Invocation) -> EngineResult<BuildOutcome> {
        let model = &self.artifacts.model;

        let resource = model
            .resource(&invocation.resource)
            .ok_or_else(|| EngineError::UnknownResource(invocation.resource.clone()))?;
        let action = resource
            .actions
            .iter()
            .find(|a| a.action == invocation.action)
            .ok_or_else(|| {
                EngineError::UnknownAction(invocation.resource.clone(), invocation.action.clone())
            })?;

        RequestBuilder::new(self.artifacts, &self.embedded, &self.globals)
            .build(action, invocation, self.profiles.as_ref())
            .await
    }
}

/// Parse the body as JSON when the content type says so; keep the raw
/// string on parse failure
fn build_response_info(fetched: FetchedResponse) -> ResponseInfo {
    let is_json = fetched
        .headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        .map(|(_, value)| value.contains("json"))
        .unwrap_or(false);

    let body = if is_json && !fetched.body.is_empty() {
        serde_json::from_str(&fetched.body)
            .unwrap_or_else(|_| Value::String(fetched.body.clone()))
    } else {
        Value::String(fetched.body.clone())
    };

    ResponseInfo {
        status: fetched.status,
        ok: (200..300).contains(&fetched.status),
        headers: fetched.headers,
        body,
        raw_body: fetched.body,
    }
}
