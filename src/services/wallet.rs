//! 钱包会话
//! 记录当前账户与活动链，负责连接、切换链并按网络守卫给出合约地址

use crate::config::{AppConfig, NetworkConfig};
use crate::models::Address;
use crate::services::network::{self, NetworkWarning};
use crate::services::rpc::{RpcClient, RpcError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("钱包未连接")]
    NotConnected,

    #[error("当前节点没有可用账户")]
    NoAccount,

    #[error("未配置链 {0} 的节点")]
    UnknownChain(u64),

    #[error("节点返回的链 ID {actual} 与目标链 {expected} 不一致")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// 会话状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletStatus {
    pub connected: bool,
    pub address: Option<Address>,
    pub chain_id: Option<u64>,
    pub chain_name: Option<String>,
    pub supported: bool,
}

struct Connection {
    network: NetworkConfig,
    account: Option<Address>,
    client: RpcClient,
}

/// 当前钱包会话
pub struct WalletSession {
    config: Arc<AppConfig>,
    connection: Option<Connection>,
}

impl WalletSession {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            connection: None,
        }
    }

    /// 连接到目标链（缺省为配置的默认链）
    pub async fn connect(&mut self, chain_id: Option<u64>) -> Result<WalletStatus, WalletError> {
        let target = chain_id.unwrap_or(self.config.default_chain_id);
        let network = self
            .config
            .network(target)
            .cloned()
            .ok_or(WalletError::UnknownChain(target))?;

        let client = RpcClient::new(network.rpc_url.clone());
        let actual = client.chain_id().await?;
        if actual != target {
            return Err(WalletError::ChainMismatch {
                expected: target,
                actual,
            });
        }

        let account = client.accounts().await?.into_iter().next();
        log::info!(
            "钱包已连接: {} ({}) 账户 {}",
            network.name,
            network.chain_id,
            account.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string())
        );

        self.connection = Some(Connection {
            network,
            account,
            client,
        });
        Ok(self.status())
    }

    pub async fn switch_chain(&mut self, chain_id: u64) -> Result<WalletStatus, WalletError> {
        log::info!("切换网络 -> {}", chain_id);
        self.connect(Some(chain_id)).await
    }

    pub fn disconnect(&mut self) {
        if self.connection.take().is_some() {
            log::info!("钱包已断开连接");
        }
    }

    pub fn status(&self) -> WalletStatus {
        match &self.connection {
            Some(conn) => WalletStatus {
                connected: true,
                address: conn.account,
                chain_id: Some(conn.network.chain_id),
                chain_name: Some(conn.network.name.clone()),
                supported: network::is_supported_chain(Some(conn.network.chain_id)),
            },
            None => WalletStatus {
                connected: false,
                address: None,
                chain_id: None,
                chain_name: None,
                supported: false,
            },
        }
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.connection.as_ref().map(|c| c.network.chain_id)
    }

    pub fn account(&self) -> Option<Address> {
        self.connection.as_ref().and_then(|c| c.account)
    }

    pub fn require_account(&self) -> Result<Address, WalletError> {
        match &self.connection {
            None => Err(WalletError::NotConnected),
            Some(conn) => conn.account.ok_or(WalletError::NoAccount),
        }
    }

    pub fn client(&self) -> Result<RpcClient, WalletError> {
        self.connection
            .as_ref()
            .map(|c| c.client.clone())
            .ok_or(WalletError::NotConnected)
    }

    /// 题目合约地址；链不在白名单时为 None
    pub fn quiz_contract(&self) -> Option<Address> {
        let conn = self.connection.as_ref()?;
        network::guarded_address(Some(conn.network.chain_id), conn.network.quiz_contract)
    }

    pub fn quiz_data_contract(&self) -> Option<Address> {
        self.connection
            .as_ref()
            .and_then(|c| c.network.quiz_data_contract)
    }

    pub fn network_warning(&self) -> Option<NetworkWarning> {
        let conn = self.connection.as_ref();
        network::network_warning(
            conn.map(|c| c.network.chain_id),
            conn.map(|c| c.network.name.as_str()),
        )
    }

    #[cfg(test)]
    fn attach(&mut self, network: NetworkConfig, account: Option<Address>) {
        let client = RpcClient::new(network.rpc_url.clone());
        self.connection = Some(Connection {
            network,
            account,
            client,
        });
    }
}
