//! JSON-over-HTTP transports
//!
//! One client drives the mutation cluster (any number of endpoints,
//! balanced round-robin per transaction), the other the identifier
//! allocator service. Both speak small JSON bodies under `/graft/v1/` and
//! attach a bearer token when configured.

use crate::error::{ClientError, ErrorCode, Result};
use crate::MutationClient;
use async_trait::async_trait;
use graft_core::Statement;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

/// Transport configuration shared by both clients.
#[derive(Debug, Default, Clone)]
pub struct HttpOptions {
    /// Bearer token attached to every request.
    pub auth_token: Option<String>,
    /// Ask for gzip response compression.
    pub gzip: bool,
    /// Tell the server to ignore conflicts on index keys.
    pub ignore_index_conflict: bool,
    pub tls: Option<TlsOptions>,
}

/// TLS parameters. When present, requests go out over `https`.
#[derive(Debug, Default, Clone)]
pub struct TlsOptions {
    /// Expected server host name. Honored by pinning the name to the
    /// endpoint address; only possible with a single endpoint.
    pub server_name: Option<String>,
    /// PEM CA certificate added to the trust roots.
    pub ca_cert_pem: Option<Vec<u8>>,
    /// PEM client certificate + key for mutual TLS.
    pub identity_pem: Option<Vec<u8>>,
}

/// Wire body of an error response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct MutateRequest<'a> {
    set: &'a [Statement],
    commit_now: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    ignore_index_conflict: bool,
}

#[derive(Debug, Serialize)]
struct AlterRequest<'a> {
    schema: &'a str,
}

#[derive(Debug, Serialize)]
struct AssignRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct AssignResponse {
    uid: u64,
}

#[derive(Debug, Serialize)]
struct BumpRequest {
    value: u64,
}

/// Build the reqwest client and per-endpoint base URLs for a set of
/// `host:port` endpoints.
fn build(endpoints: &[String], opts: &HttpOptions) -> Result<(reqwest::Client, Vec<String>)> {
    let mut builder = reqwest::Client::builder().gzip(opts.gzip);
    let scheme = if opts.tls.is_some() { "https" } else { "http" };
    let mut bases: Vec<String> = endpoints
        .iter()
        .map(|e| format!("{}://{}", scheme, e))
        .collect();

    if let Some(tls) = &opts.tls {
        if let Some(pem) = &tls.ca_cert_pem {
            let cert = reqwest::Certificate::from_pem(pem)
                .map_err(|e| ClientError::new(ErrorCode::InvalidRequest, e.to_string()))?;
            builder = builder.add_root_certificate(cert);
        }
        if let Some(pem) = &tls.identity_pem {
            let identity = reqwest::Identity::from_pem(pem)
                .map_err(|e| ClientError::new(ErrorCode::InvalidRequest, e.to_string()))?;
            builder = builder.identity(identity);
        }
        if let Some(name) = &tls.server_name {
            match (endpoints, endpoints[0].parse::<SocketAddr>()) {
                ([_], Ok(addr)) => {
                    builder = builder.resolve(name, addr);
                    bases = vec![format!("https://{}:{}", name, addr.port())];
                }
                _ => warn!(
                    server_name = %name,
                    "tls server name pinning requires a single host:port endpoint; ignoring"
                ),
            }
        }
    }

    let client = builder.build()?;
    Ok((client, bases))
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let fallback = match status.as_u16() {
        400 => ErrorCode::InvalidRequest,
        409 => ErrorCode::Conflict,
        429 => ErrorCode::ResourceExhausted,
        500 => ErrorCode::Internal,
        502..=504 => ErrorCode::Unavailable,
        _ => ErrorCode::Unknown,
    };
    let bytes = resp.bytes().await.unwrap_or_default();
    match serde_json::from_slice::<ErrorBody>(&bytes) {
        Ok(body) => Err(ClientError::new(
            ErrorCode::from_wire(&body.code),
            body.message,
        )),
        Err(_) => Err(ClientError::new(
            fallback,
            format!("HTTP {} from mutation service", status),
        )),
    }
}

/// Mutation transport over HTTP, balancing transactions across endpoints.
#[derive(Debug)]
pub struct HttpMutationClient {
    http: reqwest::Client,
    bases: Vec<String>,
    next: AtomicUsize,
    auth_token: Option<String>,
    ignore_index_conflict: bool,
}

impl HttpMutationClient {
    pub fn new(endpoints: &[String], opts: &HttpOptions) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(ClientError::new(
                ErrorCode::InvalidRequest,
                "no mutation endpoints configured",
            ));
        }
        let (http, bases) = build(endpoints, opts)?;
        Ok(Self {
            http,
            bases,
            next: AtomicUsize::new(0),
            auth_token: opts.auth_token.clone(),
            ignore_index_conflict: opts.ignore_index_conflict,
        })
    }

    fn base(&self) -> &str {
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        &self.bases[i % self.bases.len()]
    }

    fn add_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref token) = self.auth_token {
            req.bearer_auth(token)
        } else {
            req
        }
    }
}

#[async_trait]
impl MutationClient for HttpMutationClient {
    async fn commit(&self, statements: &[Statement]) -> Result<()> {
        let url = format!("{}/graft/v1/mutate", self.base());
        let body = MutateRequest {
            set: statements,
            commit_now: true,
            ignore_index_conflict: self.ignore_index_conflict,
        };
        let resp = self.add_auth(self.http.post(&url)).json(&body).send().await?;
        check(resp).await?;
        Ok(())
    }

    async fn alter(&self, schema: &str) -> Result<()> {
        let url = format!("{}/graft/v1/alter", self.base());
        let body = AlterRequest { schema };
        let resp = self.add_auth(self.http.post(&url)).json(&body).send().await?;
        check(resp).await?;
        Ok(())
    }
}

/// HTTP client for the identifier allocator service.
#[derive(Debug)]
pub struct HttpAllocatorClient {
    http: reqwest::Client,
    base: String,
    auth_token: Option<String>,
}

impl HttpAllocatorClient {
    pub fn new(endpoint: &str, opts: &HttpOptions) -> Result<Self> {
        let (http, bases) = build(std::slice::from_ref(&endpoint.to_string()), opts)?;
        Ok(Self {
            http,
            base: bases.into_iter().next().unwrap_or_default(),
            auth_token: opts.auth_token.clone(),
        })
    }

    fn add_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref token) = self.auth_token {
            req.bearer_auth(token)
        } else {
            req
        }
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let url = format!("{}/graft/v1/{}", self.base, path);
        let resp = self.add_auth(self.http.post(&url)).json(body).send().await?;
        check(resp).await
    }
}

#[async_trait]
impl graft_xidmap::XidAllocator for HttpAllocatorClient {
    async fn assign(&self, name: &str) -> graft_xidmap::Result<u64> {
        let resp = self
            .post("assign", &AssignRequest { name })
            .await
            .map_err(|e| graft_xidmap::XidError::Allocator(e.to_string()))?;
        let body: AssignResponse = resp
            .json()
            .await
            .map_err(|e| graft_xidmap::XidError::Allocator(e.to_string()))?;
        Ok(body.uid)
    }

    async fn bump_to(&self, value: u64) -> graft_xidmap::Result<()> {
        self.post("bump", &BumpRequest { value })
            .await
            .map_err(|e| graft_xidmap::XidError::Allocator(e.to_string()))?;
        Ok(())
    }

    async fn flush(&self) -> graft_xidmap::Result<()> {
        self.post("flush", &serde_json::json!({}))
            .await
            .map_err(|e| graft_xidmap::XidError::Allocator(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_endpoints() {
        let err = HttpMutationClient::new(&[], &HttpOptions::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest);
    }

    #[test]
    fn test_round_robin_bases() {
        let endpoints = vec!["a:1".to_string(), "b:2".to_string(), "c:3".to_string()];
        let client = HttpMutationClient::new(&endpoints, &HttpOptions::default()).unwrap();
        let seen: Vec<String> = (0..6).map(|_| client.base().to_string()).collect();
        assert_eq!(seen[0], "http://a:1");
        assert_eq!(seen[1], "http://b:2");
        assert_eq!(seen[2], "http://c:3");
        assert_eq!(seen[3], "http://a:1");
    }

    #[test]
    fn test_tls_switches_scheme() {
        let endpoints = vec!["a:1".to_string()];
        let opts = HttpOptions {
            tls: Some(TlsOptions::default()),
            ..Default::default()
        };
        let client = HttpMutationClient::new(&endpoints, &opts).unwrap();
        assert_eq!(client.base(), "https://a:1");
    }
}
