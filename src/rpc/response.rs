//! Bulk JSON-RPC 응답 파서
//!
//! performBulk 응답을 파싱하여 내부 데이터 구조로 변환합니다.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::RpcError;

/// Collector 작업 결과 타입
pub type RpcResult<T> = Result<T, RpcError>;

/// Correlation id supplied by the caller for each sub-request.
///
/// Discovery uses positional indices for per-entity batches and fixed
/// string tags for the connector-listing batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Positional index into the caller's entity list
    Index(usize),
    /// Fixed tag ("inlet", "outlet", "device")
    Tag(String),
}

impl RequestId {
    /// 위치 인덱스로 변환 시도
    pub fn as_index(&self) -> Option<usize> {
        match self {
            RequestId::Index(i) => Some(*i),
            RequestId::Tag(_) => None,
        }
    }

    /// 태그로 변환 시도
    pub fn as_tag(&self) -> Option<&str> {
        match self {
            RequestId::Index(_) => None,
            RequestId::Tag(tag) => Some(tag),
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Index(i) => write!(f, "{i}"),
            RequestId::Tag(tag) => write!(f, "{tag}"),
        }
    }
}

impl From<usize> for RequestId {
    fn from(i: usize) -> Self {
        RequestId::Index(i)
    }
}

impl From<&str> for RequestId {
    fn from(tag: &str) -> Self {
        RequestId::Tag(tag.to_string())
    }
}

impl From<String> for RequestId {
    fn from(tag: String) -> Self {
        RequestId::Tag(tag)
    }
}

/// One decoded return payload, correlated to its request id.
#[derive(Debug, Clone)]
pub struct Response {
    pub id: RequestId,
    pub ret: Value,
}

impl Response {
    /// Build a response record from one `_ret_` payload.
    ///
    /// A single-valued payload wrapped in a one-element list is unwrapped;
    /// a multi-element list here is a protocol violation (the legitimate
    /// many-per-id case is flattened before this point).
    pub fn new(id: RequestId, ret: Value) -> RpcResult<Self> {
        let ret = match ret {
            Value::Array(mut items) => match items.len() {
                0 | 1 => items.pop().unwrap_or(Value::Null),
                _ => {
                    debug!(?items, "unexpected multi-element return payload");
                    return Err(RpcError::MultiResponse(id));
                }
            },
            other => other,
        };

        Ok(Self { id, ret })
    }
}

/// 하나의 performBulk 응답에서 디코딩된 전체 응답 레코드
#[derive(Debug, Clone, Default)]
pub struct Responses {
    pub responses: Vec<Response>,
}

impl Responses {
    /// Decode a top-level performBulk reply document.
    ///
    /// Raises on an errored or malformed envelope; individual sub-responses
    /// carrying an `error` field are logged and dropped. A list-valued
    /// `_ret_` fans out into one record per element, all sharing the id.
    pub fn from_value(body: Value) -> RpcResult<Self> {
        let map = match body.as_object() {
            Some(map) => map,
            None => {
                return Err(RpcError::JsonParse(
                    "top-level reply is not a JSON object".to_string(),
                ))
            }
        };

        if let Some(err) = map.get("error") {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(RpcError::Protocol(message.to_string()));
        }

        let result = map
            .get("result")
            .ok_or_else(|| RpcError::Protocol("missing 'result' key in json".to_string()))?;

        let raw = result
            .get("responses")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if raw.is_empty() {
            return Err(RpcError::Protocol("no responses returned".to_string()));
        }

        let mut responses = Vec::new();
        for entry in raw {
            let json = match entry.get("json") {
                Some(json) if !json.is_null() => json,
                _ => {
                    return Err(RpcError::Protocol(
                        "missing 'json' key in response".to_string(),
                    ))
                }
            };

            let id: RequestId = match json.get("id").cloned() {
                Some(raw_id) => match serde_json::from_value(raw_id) {
                    Ok(id) => id,
                    Err(_) => {
                        debug!("response with undecodable id, skipping");
                        continue;
                    }
                },
                None => {
                    debug!("response without id, skipping");
                    continue;
                }
            };

            if let Some(err) = json.get("error") {
                let message = err
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                error!(id = %id, message, "errored sub-response dropped");
                continue;
            }

            let ret = json
                .pointer("/result/_ret_")
                .cloned()
                .unwrap_or(Value::Null);
            if is_empty_ret(&ret) {
                continue;
            }

            match ret {
                Value::Array(parts) => {
                    for part in parts {
                        responses.push(Response::new(id.clone(), part)?);
                    }
                }
                ret => responses.push(Response::new(id, ret)?),
            }
        }

        Ok(Self { responses })
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Iterate the positional indices that did answer.
    pub fn answered_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.responses.iter().filter_map(|r| r.id.as_index())
    }
}

fn is_empty_ret(ret: &Value) -> bool {
    match ret {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Outcome of one performBulk call.
///
/// Transport-layer failures are not errors at this level: the caller
/// decides whether an empty reply is fatal (discovery) or merely a cycle
/// with no readings (reads).
#[derive(Debug)]
pub enum BulkReply {
    /// Decoded per-request outcomes
    Responses(Responses),
    /// The transport layer failed outright; carries the cause
    Empty(RpcError),
}

impl BulkReply {
    /// Unwrap into responses, surfacing a transport failure as an error.
    pub fn into_responses(self) -> RpcResult<Responses> {
        match self {
            BulkReply::Responses(responses) => Ok(responses),
            BulkReply::Empty(cause) => Err(cause),
        }
    }
}
