// Tauri 命令模块
// 提供供前端调用的命令接口

pub mod creation;
pub mod quiz;
pub mod quiz_data;
pub mod wallet;

use crate::config::AppConfig;
use crate::models::Address;
use crate::services::database::SubmissionLedger;
use crate::services::network::NetworkWarning;
use crate::services::rpc::RpcClient;
use crate::services::wallet::WalletSession;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::Mutex;

pub use creation::{
    create_question,
    edit_question_draft,
    get_submission,
    list_submissions,
    new_question_draft,
    preview_question_draft,
    refresh_submission,
    validate_question_draft,
    SubmissionEvent,
};

pub use quiz::{
    decode_question_content,
    get_home,
    get_profile,
    get_question_details,
    get_status_text,
    resolve_route,
};

pub use quiz_data::{get_quiz_data, get_user_data, store_quiz_data};

pub use wallet::{
    connect_wallet,
    disconnect_wallet,
    get_network_warning,
    get_wallet_status,
    switch_chain,
};

/// 应用状态
pub struct QuizState {
    pub config: Arc<AppConfig>,
    pub wallet: Mutex<WalletSession>,
    pub ledger: Arc<SubmissionLedger>,
    /// 出题进行中
    pub creating: Arc<AtomicBool>,
}

/// 一次命令所需的链上上下文，取出后即释放会话锁
pub struct ChainSnapshot {
    pub client: RpcClient,
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
    pub quiz_contract: Option<Address>,
    pub quiz_data_contract: Option<Address>,
    pub warning: Option<NetworkWarning>,
}

impl QuizState {
    pub fn new(config: AppConfig, ledger: SubmissionLedger) -> Self {
        let config = Arc::new(config);
        Self {
            wallet: Mutex::new(WalletSession::new(config.clone())),
            config,
            ledger: Arc::new(ledger),
            creating: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn snapshot(&self) -> ChainSnapshot {
        let wallet = self.wallet.lock().await;
        // 未连接时合约地址为 None，不会经由该客户端发起读取
        let client = wallet.client().unwrap_or_else(|_| {
            let url = self
                .config
                .network(self.config.default_chain_id)
                .map(|n| n.rpc_url.clone())
                .unwrap_or_default();
            RpcClient::new(url)
        });

        ChainSnapshot {
            client,
            account: wallet.account(),
            chain_id: wallet.chain_id(),
            quiz_contract: wallet.quiz_contract(),
            quiz_data_contract: wallet.quiz_data_contract(),
            warning: wallet.network_warning(),
        }
    }
}
