//! 以太坊 JSON-RPC 客户端
//! 单次/批量请求、eth_call、交易发送与回执轮询

use crate::models::Address;
use crate::services::abi::{from_hex, to_hex, AbiError};
use async_stream::stream;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{Duration, Instant};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("missing response for request {0}")]
    MissingResponse(u64),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("transaction {0} not confirmed in time")]
    Timeout(String),

    #[error(transparent)]
    Abi(#[from] AbiError),
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

impl JsonRpcResponse {
    fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(err) => Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            }),
            None => Ok(self.result),
        }
    }
}

/// 批量响应按 id 对回请求顺序
fn pair_batch_responses(
    ids: &[u64],
    responses: Vec<JsonRpcResponse>,
) -> Vec<Result<Value, RpcError>> {
    let mut by_id: HashMap<u64, JsonRpcResponse> = responses
        .into_iter()
        .filter_map(|resp| resp.id.map(|id| (id, resp)))
        .collect();

    ids.iter()
        .map(|id| match by_id.remove(id) {
            Some(resp) => resp.into_result(),
            None => Err(RpcError::MissingResponse(*id)),
        })
        .collect()
}

pub fn parse_quantity(value: &Value) -> Result<u64, RpcError> {
    let text = value
        .as_str()
        .ok_or_else(|| RpcError::UnexpectedResponse(format!("expected quantity, got {}", value)))?;
    let body = text.strip_prefix("0x").unwrap_or(text);
    u64::from_str_radix(body, 16)
        .map_err(|_| RpcError::UnexpectedResponse(format!("invalid quantity: {}", text)))
}

pub fn to_quantity(value: u128) -> String {
    format!("0x{:x}", value)
}

fn parse_data(value: &Value) -> Result<Vec<u8>, RpcError> {
    let text = value
        .as_str()
        .ok_or_else(|| RpcError::UnexpectedResponse(format!("expected hex data, got {}", value)))?;
    Ok(from_hex(text)?)
}

/// 一次只读合约调用
#[derive(Debug, Clone, PartialEq)]
pub struct ContractCall {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Vec<u8>,
}

impl ContractCall {
    pub fn new(to: Address, data: Vec<u8>) -> Self {
        Self { from: None, to, data }
    }

    /// 依赖 msg.sender 的读取需要带上调用者
    pub fn with_from(mut self, from: Option<Address>) -> Self {
        self.from = from;
        self
    }

    fn to_params(&self) -> Value {
        let mut tx = json!({
            "to": self.to.to_string(),
            "data": to_hex(&self.data),
        });
        if let Some(from) = self.from {
            tx["from"] = json!(from.to_string());
        }
        json!([tx, "latest"])
    }
}

/// 由节点托管账户签名的交易
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: Vec<u8>,
    pub value: Option<u128>,
}

impl TransactionRequest {
    fn to_params(&self) -> Value {
        let mut tx = json!({
            "from": self.from.to_string(),
            "to": self.to.to_string(),
            "data": to_hex(&self.data),
        });
        if let Some(value) = self.value {
            tx["value"] = json!(to_quantity(value));
        }
        json!([tx])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: u64,
    pub success: bool,
}

impl TransactionReceipt {
    fn from_value(value: &Value) -> Result<Self, RpcError> {
        let transaction_hash = value["transactionHash"]
            .as_str()
            .ok_or_else(|| RpcError::UnexpectedResponse("receipt without transactionHash".into()))?
            .to_string();
        let block_number = parse_quantity(&value["blockNumber"])?;
        // 拜占庭分叉前的回执没有 status 字段
        let success = match &value["status"] {
            Value::Null => true,
            status => parse_quantity(status)? == 1,
        };
        Ok(Self {
            transaction_hash,
            block_number,
            success,
        })
    }
}

/// 回执轮询进度；只有 Confirmed 和 TimedOut 会结束轮询
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptUpdate {
    Pending { elapsed_ms: u64 },
    /// 查询出错，下个间隔重试
    Retrying { elapsed_ms: u64, error: String },
    Confirmed(TransactionReceipt),
    TimedOut,
}

/// 只读访问，聚合器和页面视图依赖这个接口而非具体客户端
pub trait ContractReader: Send + Sync {
    fn read(&self, call: &ContractCall) -> impl Future<Output = Result<Vec<u8>, RpcError>> + Send;

    /// 一次请求内的多次读取；外层错误表示整批失败，内层表示单个子调用失败
    fn read_batch(
        &self,
        calls: &[ContractCall],
    ) -> impl Future<Output = Result<Vec<Result<Vec<u8>, RpcError>>, RpcError>> + Send;
}

/// 写交易
pub trait ContractWriter: Send + Sync {
    fn send_transaction(
        &self,
        tx: &TransactionRequest,
    ) -> impl Future<Output = Result<String, RpcError>> + Send;
}

/// JSON-RPC 客户端
#[derive(Clone)]
pub struct RpcClient {
    url: String,
    http_client: Arc<reqwest::Client>,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http_client: Arc::new(reqwest::Client::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// 单次请求
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id(),
            method,
            params,
        };
        log::debug!("rpc {} #{} -> {}", method, request.id, self.url);

        let response = self
            .http_client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<JsonRpcResponse>()
            .await?;

        response.into_result()
    }

    /// 批量请求，结果顺序与输入一致
    pub async fn batch(
        &self,
        calls: Vec<(&str, Value)>,
    ) -> Result<Vec<Result<Value, RpcError>>, RpcError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let requests: Vec<JsonRpcRequest> = calls
            .into_iter()
            .map(|(method, params)| JsonRpcRequest {
                jsonrpc: "2.0",
                id: self.next_id(),
                method,
                params,
            })
            .collect();
        let ids: Vec<u64> = requests.iter().map(|r| r.id).collect();
        log::debug!("rpc batch of {} -> {}", ids.len(), self.url);

        let responses = self
            .http_client
            .post(&self.url)
            .json(&requests)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<JsonRpcResponse>>()
            .await?;

        Ok(pair_batch_responses(&ids, responses))
    }

    pub async fn chain_id(&self) -> Result<u64, RpcError> {
        parse_quantity(&self.request("eth_chainId", json!([])).await?)
    }

    pub async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        let value = self.request("eth_accounts", json!([])).await?;
        let entries = value
            .as_array()
            .ok_or_else(|| RpcError::UnexpectedResponse("eth_accounts: expected array".into()))?;

        entries
            .iter()
            .map(|entry| {
                entry
                    .as_str()
                    .ok_or_else(|| RpcError::UnexpectedResponse("eth_accounts: expected string".into()))?
                    .parse::<Address>()
                    .map_err(RpcError::from)
            })
            .collect()
    }

    pub async fn call(&self, call: &ContractCall) -> Result<Vec<u8>, RpcError> {
        parse_data(&self.request("eth_call", call.to_params()).await?)
    }

    pub async fn call_batch(
        &self,
        calls: &[ContractCall],
    ) -> Result<Vec<Result<Vec<u8>, RpcError>>, RpcError> {
        let requests = calls.iter().map(|c| ("eth_call", c.to_params())).collect();
        let results = self.batch(requests).await?;
        Ok(results
            .into_iter()
            .map(|result| result.and_then(|value| parse_data(&value)))
            .collect())
    }

    /// 返回交易哈希；签名由节点完成
    pub async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, RpcError> {
        let value = self.request("eth_sendTransaction", tx.to_params()).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RpcError::UnexpectedResponse(format!("expected tx hash, got {}", value)))
    }

    pub async fn transaction_receipt(
        &self,
        hash: &str,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        let value = self
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        TransactionReceipt::from_value(&value).map(Some)
    }

    /// 轮询回执，逐步产出进度
    pub fn receipt_updates(
        &self,
        hash: String,
        interval: Duration,
        max_wait: Duration,
    ) -> impl Stream<Item = ReceiptUpdate> {
        let client = self.clone();

        stream! {
            let start = Instant::now();
            loop {
                match client.transaction_receipt(&hash).await {
                    Ok(Some(receipt)) => {
                        yield ReceiptUpdate::Confirmed(receipt);
                        break;
                    }
                    Ok(None) => {
                        yield ReceiptUpdate::Pending {
                            elapsed_ms: start.elapsed().as_millis() as u64,
                        };
                    }
                    Err(e) => {
                        yield ReceiptUpdate::Retrying {
                            elapsed_ms: start.elapsed().as_millis() as u64,
                            error: e.to_string(),
                        };
                    }
                }

                if start.elapsed() >= max_wait {
                    yield ReceiptUpdate::TimedOut;
                    break;
                }
                tokio::time::sleep(interval).await;
            }
        }
    }

    /// 等待交易上链
    pub async fn wait_for_receipt(
        &self,
        hash: &str,
        interval: Duration,
        max_wait: Duration,
    ) -> Result<TransactionReceipt, RpcError> {
        let start = Instant::now();

        while start.elapsed() < max_wait {
            if let Some(receipt) = self.transaction_receipt(hash).await? {
                return Ok(receipt);
            }
            tokio::time::sleep(interval).await;
        }

        Err(RpcError::Timeout(hash.to_string()))
    }
}

impl ContractReader for RpcClient {
    async fn read(&self, call: &ContractCall) -> Result<Vec<u8>, RpcError> {
        self.call(call).await
    }

    async fn read_batch(
        &self,
        calls: &[ContractCall],
    ) -> Result<Vec<Result<Vec<u8>, RpcError>>, RpcError> {
        self.call_batch(calls).await
    }
}

impl ContractWriter for RpcClient {
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, RpcError> {
        RpcClient::send_transaction(self, tx).await
    }
}
