//! QuizData 演示页命令

use super::QuizState;
use crate::models::Address;
use crate::services::quiz_data::{self, DataScope, QuizDataSnapshot};
use tauri::State;

const NOT_CONFIGURED: &str = "当前网络未配置 QuizData 合约";

#[tauri::command]
pub async fn get_quiz_data(state: State<'_, QuizState>) -> Result<QuizDataSnapshot, String> {
    let chain = state.snapshot().await;
    let contract = chain.quiz_data_contract.ok_or(NOT_CONFIGURED)?;

    quiz_data::load_quiz_data(&chain.client, contract, chain.account)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_user_data(state: State<'_, QuizState>, user: String) -> Result<String, String> {
    let user: Address = user.parse().map_err(|e: crate::services::AbiError| e.to_string())?;
    let chain = state.snapshot().await;
    let contract = chain.quiz_data_contract.ok_or(NOT_CONFIGURED)?;

    quiz_data::load_data_of(&chain.client, contract, user)
        .await
        .map_err(|e| e.to_string())
}

/// 返回交易哈希
#[tauri::command]
pub async fn store_quiz_data(
    state: State<'_, QuizState>,
    scope: DataScope,
    value: String,
) -> Result<String, String> {
    let chain = state.snapshot().await;
    let contract = chain.quiz_data_contract.ok_or(NOT_CONFIGURED)?;
    let from = chain.account.ok_or("请先连接钱包")?;

    quiz_data::store(&chain.client, contract, from, scope, &value)
        .await
        .map_err(|e| e.to_string())
}
