//! Raritan bulk HTTP 클라이언트
//!
//! Connection pooling과 타임아웃을 지원하는 비동기 HTTP 클라이언트입니다.
//! 모든 요청은 단일 performBulk 호출로 배치 전송됩니다.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Certificate, Client, ClientBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};
use url::Url;

use super::response::{BulkReply, RequestId, Responses, RpcResult};
use crate::error::RpcError;

/// Per-request timeout applied to every bulk call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// TLS verification mode for one PDU endpoint
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Platform trust store verification
    Verify,
    /// Skip certificate verification entirely
    Insecure,
    /// Trust only the certificate at this path
    Pinned(PathBuf),
}

/// Endpoint identity and credentials for one PDU.
///
/// Created once from configuration and never mutated.
#[derive(Clone)]
pub struct PduAuth {
    pub name: String,
    pub url: Url,
    pub user: String,
    pub password: String,
    pub tls: TlsMode,
}

impl PduAuth {
    /// 새 인증 정보 생성
    ///
    /// URL에 스킴이 없으면 http://가 기본값입니다. 이름이 비어 있으면
    /// 호스트명이 사용됩니다.
    pub fn new(
        name: &str,
        url: &str,
        user: &str,
        password: &str,
        tls: TlsMode,
    ) -> RpcResult<Self> {
        let url = match Url::parse(url) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("http://{url}"))
                .map_err(|e| RpcError::InvalidUrl(format!("{url}: {e}")))?,
            Err(e) => return Err(RpcError::InvalidUrl(format!("{url}: {e}"))),
        };

        if !matches!(url.scheme(), "http" | "https") {
            return Err(RpcError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let name = if name.is_empty() {
            url.host_str().unwrap_or_default().to_string()
        } else {
            name.to_string()
        };

        Ok(Self {
            name,
            url,
            user: user.to_string(),
            password: password.to_string(),
            tls,
        })
    }
}

impl fmt::Debug for PduAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // credentials stay out of logs
        f.debug_struct("PduAuth")
            .field("name", &self.name)
            .field("url", &self.url.as_str())
            .field("tls", &self.tls)
            .finish_non_exhaustive()
    }
}

/// 하나의 performBulk 호출로 전송될 하위 요청 목록
#[derive(Debug, Default, Serialize)]
pub struct BulkRequest {
    requests: Vec<SubRequest>,
}

#[derive(Debug, Serialize)]
struct SubRequest {
    rid: String,
    json: RpcEnvelope,
}

#[derive(Debug, Serialize)]
struct RpcEnvelope {
    jsonrpc: &'static str,
    method: String,
    id: RequestId,
}

impl BulkRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// 하위 요청 추가
    pub fn add(&mut self, rid: impl Into<String>, method: &str, id: impl Into<RequestId>) {
        self.requests.push(SubRequest {
            rid: rid.into(),
            json: RpcEnvelope {
                jsonrpc: "2.0",
                method: method.to_string(),
                id: id.into(),
            },
        });
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// 전체 performBulk 요청 본문 생성
    pub fn to_body(&self) -> Value {
        json!({
            "jsonrpc": "2.0",
            "method": "performBulk",
            "params": { "requests": self.requests },
            "id": 0,
        })
    }
}

/// Bulk JSON-RPC 클라이언트 - PDU 하나의 /bulk 엔드포인트 담당
#[derive(Clone)]
pub struct BulkClient {
    client: Client,
    endpoint: Url,
    user: String,
    password: String,
    name: String,
}

impl fmt::Debug for BulkClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl BulkClient {
    /// 새 클라이언트 생성
    ///
    /// # Example
    /// ```ignore
    /// let auth = PduAuth::new("rack0", "https://pdu.rack0", "admin", "pw", TlsMode::Verify)?;
    /// let client = BulkClient::new(&auth)?;
    /// ```
    pub fn new(auth: &PduAuth) -> RpcResult<Self> {
        let mut builder = ClientBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30));

        builder = match &auth.tls {
            TlsMode::Verify => builder,
            TlsMode::Insecure => builder.danger_accept_invalid_certs(true),
            TlsMode::Pinned(path) => match load_certificate(path) {
                Ok(cert) => builder
                    .tls_built_in_root_certs(false)
                    .add_root_certificate(cert),
                Err(e) => {
                    warn!(
                        pdu = %auth.name,
                        path = %path.display(),
                        error = %e,
                        "Failed to load pinned certificate, falling back to default verification"
                    );
                    builder
                }
            },
        };

        let client = builder.build().map_err(RpcError::ClientInit)?;
        let endpoint = auth
            .url
            .join("/bulk")
            .map_err(|e| RpcError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            user: auth.user.clone(),
            password: auth.password.clone(),
            name: auth.name.clone(),
        })
    }

    /// performBulk 요청 전송
    ///
    /// Transport failures (timeout, refused connection, TLS failure,
    /// non-success HTTP status) come back as [`BulkReply::Empty`] with the
    /// cause attached; protocol violations in the reply document raise.
    #[instrument(skip(self, request), fields(pdu = %self.name, count = request.len()))]
    pub async fn send(&self, request: &BulkRequest) -> RpcResult<BulkReply> {
        debug!("Sending performBulk request");

        let body = serde_json::to_vec(&request.to_body())
            .map_err(|e| RpcError::JsonParse(e.to_string()))?;

        let result = self
            .client
            .post(self.endpoint.clone())
            .basic_auth(&self.user, Some(&self.password))
            .header(CONTENT_TYPE, "application/json-rpc")
            .body(body)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                let err = RpcError::from(err);
                if err.is_transport() {
                    return Ok(BulkReply::Empty(err));
                }
                return Err(err);
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Ok(BulkReply::Empty(RpcError::HttpStatus(status.as_u16())));
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(err) if err.is_decode() => {
                return Err(RpcError::JsonParse(err.to_string()));
            }
            Err(err) => {
                let err = RpcError::from(err);
                if err.is_transport() {
                    return Ok(BulkReply::Empty(err));
                }
                return Err(err);
            }
        };

        Ok(BulkReply::Responses(Responses::from_value(body)?))
    }
}

fn load_certificate(path: &Path) -> anyhow::Result<Certificate> {
    let bytes = std::fs::read(path)?;
    let cert = Certificate::from_pem(&bytes).or_else(|_| Certificate::from_der(&bytes))?;
    Ok(cert)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_new() {
        let auth = PduAuth::new(
            "foo",
            "https://127.0.0.1:9840",
            "admin",
            "xxx",
            TlsMode::Insecure,
        )
        .unwrap();
        assert_eq!(auth.name, "foo");
        assert_eq!(auth.url.as_str(), "https://127.0.0.1:9840/");
        assert_eq!(auth.user, "admin");
        assert_eq!(auth.password, "xxx");
    }

    #[test]
    fn test_auth_scheme_defaults_to_http() {
        let auth =
            PduAuth::new("foo", "pdu.rack0.example.com", "admin", "xxx", TlsMode::Verify).unwrap();
        assert_eq!(auth.url.scheme(), "http");
    }

    #[test]
    fn test_auth_name_defaults_to_host() {
        let auth = PduAuth::new("", "https://pdu.rack0", "admin", "xxx", TlsMode::Verify).unwrap();
        assert_eq!(auth.name, "pdu.rack0");
    }

    #[test]
    fn test_auth_rejects_unsupported_scheme() {
        let result = PduAuth::new("foo", "ftp://pdu.rack0", "admin", "xxx", TlsMode::Verify);
        assert!(matches!(result, Err(RpcError::InvalidUrl(_))));
    }

    #[test]
    fn test_auth_debug_redacts_credentials() {
        let auth =
            PduAuth::new("foo", "https://pdu.rack0", "admin", "hunter2", TlsMode::Verify).unwrap();
        let debug = format!("{auth:?}");
        assert!(!debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_bulk_request_body() {
        let mut request = BulkRequest::new();
        request.add("unique_id/1", "getFoo", 1);
        request.add("unique_id/2", "getBar", "outlet");
        assert_eq!(request.len(), 2);

        let expected = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "performBulk",
            "params": { "requests": [
                {"rid": "unique_id/1", "json": {"jsonrpc": "2.0", "method": "getFoo", "id": 1}},
                {"rid": "unique_id/2", "json": {"jsonrpc": "2.0", "method": "getBar", "id": "outlet"}}
            ]},
            "id": 0,
        });
        assert_eq!(request.to_body(), expected);
    }

    #[test]
    fn test_client_new() {
        let auth = PduAuth::new(
            "foo",
            "http://localhost:9840",
            "admin",
            "xxx",
            TlsMode::Verify,
        )
        .unwrap();
        let client = BulkClient::new(&auth);
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_bad_pinned_certificate_falls_back() {
        let auth = PduAuth::new(
            "foo",
            "https://localhost:9840",
            "admin",
            "xxx",
            TlsMode::Pinned(PathBuf::from("/nonexistent/cert.pem")),
        )
        .unwrap();
        // a missing or malformed pin must not abort client construction
        let client = BulkClient::new(&auth);
        assert!(client.is_ok());
    }
}
