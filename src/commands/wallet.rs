//! 钱包命令：连接、断开、切换网络

use super::QuizState;
use crate::services::network::NetworkWarning;
use crate::services::wallet::WalletStatus;
use tauri::State;

/// 连接钱包，缺省连接默认链
#[tauri::command]
pub async fn connect_wallet(
    state: State<'_, QuizState>,
    chain_id: Option<u64>,
) -> Result<WalletStatus, String> {
    let mut wallet = state.wallet.lock().await;
    wallet.connect(chain_id).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn disconnect_wallet(state: State<'_, QuizState>) -> Result<WalletStatus, String> {
    let mut wallet = state.wallet.lock().await;
    wallet.disconnect();
    Ok(wallet.status())
}

#[tauri::command]
pub async fn switch_chain(
    state: State<'_, QuizState>,
    chain_id: u64,
) -> Result<WalletStatus, String> {
    let mut wallet = state.wallet.lock().await;
    wallet.switch_chain(chain_id).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_wallet_status(state: State<'_, QuizState>) -> Result<WalletStatus, String> {
    Ok(state.wallet.lock().await.status())
}

/// 当前链不受支持时返回警告横幅
#[tauri::command]
pub async fn get_network_warning(
    state: State<'_, QuizState>,
) -> Result<Option<NetworkWarning>, String> {
    Ok(state.wallet.lock().await.network_warning())
}
