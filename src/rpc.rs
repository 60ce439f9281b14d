//! JSON-RPC access to the cluster
//!
//! Only two calls are needed: fetch a recent blockhash and submit raw wire
//! bytes. [`RpcTransport`] is the seam the pipeline talks to so it can run
//! against a recording stub in tests.

use crate::error::{GravityError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use solana_sdk::hash::Hash;
use std::str::FromStr;
use tracing::debug;

/// Blockhash together with the last block height at which it stays valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestBlockhash {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Endpoint used in error reports
    fn endpoint(&self) -> &str;

    async fn get_latest_blockhash(&self) -> Result<LatestBlockhash>;

    /// Submit serialized transaction bytes, returning the transaction signature
    async fn send_raw_transaction(&self, wire: &[u8]) -> Result<String>;
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    /// Preflight logs and similar node-specific detail
    data: Option<serde_json::Value>,
}

impl From<RpcErrorObject> for CallError {
    fn from(error: RpcErrorObject) -> Self {
        let message = match error.data {
            Some(data) if !data.is_null() => format!("{}: {}", error.message, data),
            _ => error.message,
        };
        CallError {
            message,
            code: Some(error.code),
        }
    }
}

#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
    last_valid_block_height: u64,
}

/// Failure of a single JSON-RPC round-trip, before it is attributed to a call
struct CallError {
    message: String,
    code: Option<i64>,
}

/// HTTP JSON-RPC 2.0 client
pub struct JsonRpcClient {
    http: Client,
    endpoint: String,
}

impl JsonRpcClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> std::result::Result<T, CallError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        debug!(endpoint = %self.endpoint, method, "JSON-RPC request");

        let transport = |e: reqwest::Error| CallError {
            message: e.to_string(),
            code: None,
        };
        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        // Error statuses often still carry a JSON-RPC error object
        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        match serde_json::from_str::<RpcResponse<T>>(&body) {
            Ok(RpcResponse {
                error: Some(error), ..
            }) => Err(error.into()),
            Ok(RpcResponse {
                result: Some(result),
                ..
            }) if status.is_success() => Ok(result),
            _ if !status.is_success() => Err(CallError {
                message: format!("HTTP status {}", status),
                code: None,
            }),
            Ok(_) => Err(CallError {
                message: "response carries neither result nor error".to_string(),
                code: None,
            }),
            Err(e) => Err(CallError {
                message: format!("invalid JSON-RPC response: {}", e),
                code: None,
            }),
        }
    }
}

#[async_trait]
impl RpcTransport for JsonRpcClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_latest_blockhash(&self) -> Result<LatestBlockhash> {
        let fetch_error = |message: String| GravityError::BlockhashFetch {
            endpoint: self.endpoint.clone(),
            message,
        };

        let response: WithContext<BlockhashValue> = self
            .call("getLatestBlockhash", serde_json::json!([]))
            .await
            .map_err(|e| match e.code {
                Some(code) => fetch_error(format!("{} (code {})", e.message, code)),
                None => fetch_error(e.message),
            })?;

        let blockhash = Hash::from_str(&response.value.blockhash)
            .map_err(|e| fetch_error(format!("bad blockhash {}: {}", response.value.blockhash, e)))?;

        Ok(LatestBlockhash {
            blockhash,
            last_valid_block_height: response.value.last_valid_block_height,
        })
    }

    async fn send_raw_transaction(&self, wire: &[u8]) -> Result<String> {
        let params = serde_json::json!([
            BASE64_STANDARD.encode(wire),
            { "encoding": "base64" }
        ]);

        self.call("sendTransaction", params)
            .await
            .map_err(|e| GravityError::Submission {
                endpoint: self.endpoint.clone(),
                message: e.message,
                code: e.code,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_latest_blockhash() {
        let mut server = mockito::Server::new_async().await;
        let hash = Hash::new_unique();
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"method": "getLatestBlockhash"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": {
                        "context": {"slot": 42},
                        "value": {"blockhash": hash.to_string(), "lastValidBlockHeight": 3090}
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = JsonRpcClient::new(server.url());
        let latest = client.get_latest_blockhash().await.unwrap();
        assert_eq!(latest.blockhash, hash);
        assert_eq!(latest.last_valid_block_height, 3090);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_raw_transaction_encodes_base64() {
        let mut server = mockito::Server::new_async().await;
        let wire = vec![1u8, 2, 3, 4];
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "method": "sendTransaction",
                "params": [BASE64_STANDARD.encode(&wire), {"encoding": "base64"}]
            })))
            .with_status(200)
            .with_body(json!({"jsonrpc": "2.0", "id": 1, "result": "5sig"}).to_string())
            .create_async()
            .await;

        let client = JsonRpcClient::new(server.url());
        assert_eq!(client.send_raw_transaction(&wire).await.unwrap(), "5sig");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rpc_error_object_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": {"code": -32002, "message": "Blockhash not found"}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = JsonRpcClient::new(server.url());
        match client.send_raw_transaction(&[0u8]).await {
            Err(GravityError::Submission { code, message, endpoint }) => {
                assert_eq!(code, Some(-32002));
                assert_eq!(message, "Blockhash not found");
                assert_eq!(endpoint, server.url());
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_keeps_rpc_error_detail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(500)
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": {
                        "code": -32002,
                        "message": "Transaction simulation failed",
                        "data": {"logs": ["Program log: consuls already set"]}
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = JsonRpcClient::new(server.url());
        match client.send_raw_transaction(&[0u8]).await {
            Err(GravityError::Submission { code, message, .. }) => {
                assert_eq!(code, Some(-32002));
                assert!(message.starts_with("Transaction simulation failed"));
                assert!(message.contains("consuls already set"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_failure_on_fetch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(503)
            .create_async()
            .await;

        let client = JsonRpcClient::new(server.url());
        let err = client.get_latest_blockhash().await.unwrap_err();
        assert!(matches!(err, GravityError::BlockhashFetch { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_unreachable_node() {
        let client = JsonRpcClient::new("http://127.0.0.1:1");
        assert!(matches!(
            client.send_raw_transaction(&[0u8]).await,
            Err(GravityError::Submission { code: None, .. })
        ));
    }
}
