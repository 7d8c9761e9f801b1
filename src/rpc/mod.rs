//! Bulk JSON-RPC 통신 모듈
//!
//! Raritan PDU의 /bulk 엔드포인트로 배치 요청을 전송하고 응답을
//! 요청 id로 상관시킵니다.
//!
//! # Example
//!
//! ```ignore
//! use rpdu_exporter::rpc::{BulkClient, BulkRequest, PduAuth, TlsMode};
//!
//! let auth = PduAuth::new("rack0", "https://pdu.rack0", "admin", "pw", TlsMode::Verify)?;
//! let client = BulkClient::new(&auth)?;
//! let mut request = BulkRequest::new();
//! request.add("/model/pdu/0", "getInlets", "inlet");
//! let reply = client.send(&request).await?;
//! ```

mod client;
mod response;

pub use client::{BulkClient, BulkRequest, PduAuth, TlsMode, REQUEST_TIMEOUT};
pub use response::{BulkReply, RequestId, Response, Responses, RpcResult};
