//! 出题命令

use super::QuizState;
use crate::services::creation::{
    self, CreatingGuard, DraftConfirmation, DraftEdit, QuestionDraft, SubmissionTarget,
    SubmittedQuestion,
};
use crate::services::database::{Submission, SubmissionStatus};
use crate::utils;
use serde::Serialize;
use std::time::Duration;
use tauri::{AppHandle, Emitter, State};

pub const SUBMISSION_EVENT: &str = "question-submission";

/// 出题交易最终状态事件
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEvent {
    pub submission_id: String,
    pub tx_hash: String,
    pub status: SubmissionStatus,
    pub error: Option<String>,
}

#[tauri::command]
pub fn new_question_draft() -> QuestionDraft {
    QuestionDraft::default()
}

#[tauri::command]
pub fn edit_question_draft(mut draft: QuestionDraft, edit: DraftEdit) -> QuestionDraft {
    draft.apply(edit);
    draft
}

/// 返回所有校验错误，空数组表示可以提交
#[tauri::command]
pub fn validate_question_draft(draft: QuestionDraft) -> Vec<String> {
    draft.validate().iter().map(|e| e.to_string()).collect()
}

#[tauri::command]
pub fn preview_question_draft(
    state: State<'_, QuizState>,
    draft: QuestionDraft,
) -> Result<DraftConfirmation, String> {
    if let Some(error) = draft.validate().first() {
        return Err(error.to_string());
    }
    Ok(draft.confirmation(&state.config.creation))
}

/// 节点接受交易即返回，回执在后台跟踪
#[tauri::command]
pub async fn create_question(
    app: AppHandle,
    state: State<'_, QuizState>,
    draft: QuestionDraft,
) -> Result<SubmittedQuestion, String> {
    let _guard = CreatingGuard::acquire(&state.creating).ok_or("正在创建题目，请稍候")?;

    let (client, target) = {
        let wallet = state.wallet.lock().await;
        let client = wallet.client().map_err(|e| e.to_string())?;
        let creator = wallet.require_account().map_err(|e| e.to_string())?;
        let contract = wallet.quiz_contract().ok_or("当前网络不支持出题，请切换网络")?;
        let chain_id = wallet.chain_id().ok_or("钱包未连接")?;
        (
            client,
            SubmissionTarget {
                chain_id,
                contract,
                creator,
            },
        )
    };

    let prepared = creation::prepare(&draft, &state.config.creation, utils::unix_now())
        .map_err(|e| e.to_string())?;
    let submitted = creation::submit_question(&client, &state.ledger, &prepared, target)
        .await
        .map_err(|e| e.to_string())?;

    let polling = state.config.receipt.clone();
    let ledger = state.ledger.clone();
    let submission_id = submitted.submission_id.clone();
    let tx_hash = submitted.tx_hash.clone();

    tauri::async_runtime::spawn(async move {
        let updates = client.receipt_updates(
            tx_hash.clone(),
            Duration::from_millis(polling.interval_ms),
            Duration::from_secs(polling.timeout_secs),
        );

        let event = match creation::track_submission(&ledger, &submission_id, updates).await {
            Ok(status) => SubmissionEvent {
                error: ledger
                    .get(&submission_id)
                    .ok()
                    .flatten()
                    .and_then(|s| s.error),
                submission_id,
                tx_hash,
                status,
            },
            Err(e) => {
                log::error!("更新出题记录失败: {}", e);
                SubmissionEvent {
                    submission_id,
                    tx_hash,
                    status: SubmissionStatus::Failed,
                    error: Some(e.to_string()),
                }
            }
        };

        if let Err(e) = app.emit(SUBMISSION_EVENT, &event) {
            log::warn!("发送出题事件失败 {}: {}", event.submission_id, e);
        }
    });

    Ok(submitted)
}

#[tauri::command]
pub fn list_submissions(
    state: State<'_, QuizState>,
    limit: Option<u32>,
) -> Result<Vec<Submission>, String> {
    state
        .ledger
        .list(limit.unwrap_or(50))
        .map_err(|e| e.to_string())
}

/// 重新查询一次回执，用于超时后仍为 submitted 的记录
#[tauri::command]
pub async fn refresh_submission(
    state: State<'_, QuizState>,
    id: String,
) -> Result<Submission, String> {
    let submission = state
        .ledger
        .get(&id)
        .map_err(|e| e.to_string())?
        .ok_or("出题记录不存在")?;
    let tx_hash = match (&submission.status, &submission.tx_hash) {
        (SubmissionStatus::Submitted | SubmissionStatus::Failed, Some(hash)) => hash.clone(),
        _ => return Ok(submission),
    };

    let client = state.snapshot().await.client;
    match client.transaction_receipt(&tx_hash).await {
        Ok(Some(receipt)) => {
            creation::apply_receipt(&state.ledger, &id, &receipt).map_err(|e| e.to_string())?;
        }
        Ok(None) => log::info!("交易 {} 尚未上链", tx_hash),
        Err(e) => return Err(e.to_string()),
    }

    state
        .ledger
        .get(&id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "出题记录不存在".to_string())
}

#[tauri::command]
pub fn get_submission(
    state: State<'_, QuizState>,
    id: String,
) -> Result<Option<Submission>, String> {
    state.ledger.get(&id).map_err(|e| e.to_string())
}
