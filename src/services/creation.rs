//! 出题流程
//! 草稿编辑、表单校验、确认预览、提交交易与回执跟踪

use crate::config::CreationPolicy;
use crate::models::Address;
use crate::services::contract::{self, CreateQuestionArgs};
use crate::services::database::{NewSubmission, SubmissionLedger, SubmissionStatus};
use crate::services::parser;
use crate::services::rpc::{ContractWriter, ReceiptUpdate, TransactionReceipt, TransactionRequest};
use crate::utils;
use anyhow::{bail, Result};
use futures::{pin_mut, Stream, StreamExt};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

pub const MAX_QUESTION_CHARS: usize = 100;
pub const MIN_OPTIONS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOption {
    pub id: u32,
    pub text: String,
    pub is_correct: bool,
}

impl DraftOption {
    fn empty(id: u32) -> Self {
        Self {
            id,
            text: String::new(),
            is_correct: false,
        }
    }
}

/// 出题草稿
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub question: String,
    pub options: Vec<DraftOption>,
}

impl Default for QuestionDraft {
    fn default() -> Self {
        Self {
            question: String::new(),
            options: vec![DraftOption::empty(1), DraftOption::empty(2)],
        }
    }
}

/// 表单校验错误，各项独立
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("请输入题目")]
    EmptyQuestion,

    #[error("题目不能超过 {0} 个字符")]
    QuestionTooLong(usize),

    #[error("选项 {0} 不能为空")]
    EmptyOption(String),

    #[error("选项 {0} 不能是 \"Options:\" 或以 \"Correct Answer:\" 开头")]
    ReservedOption(String),

    #[error("请选择正确答案")]
    NoCorrectOption,

    #[error("至少需要 {0} 个选项")]
    TooFewOptions(usize),
}

/// 前端对草稿的单步编辑
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum DraftEdit {
    SetQuestion { text: String },
    AddOption,
    RemoveOption { id: u32 },
    SetOptionText { id: u32, text: String },
    SetCorrect { id: u32 },
}

/// 选项编号：A..Z 之后是 AA, AB, ...
pub fn option_label(index: usize) -> String {
    let mut label = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        n -= 1;
        label.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    label.reverse();
    String::from_utf8_lossy(&label).into_owned()
}

impl QuestionDraft {
    pub fn apply(&mut self, edit: DraftEdit) {
        match edit {
            DraftEdit::SetQuestion { text } => self.question = text,
            DraftEdit::AddOption => {
                self.add_option();
            }
            DraftEdit::RemoveOption { id } => {
                self.remove_option(id);
            }
            DraftEdit::SetOptionText { id, text } => self.set_option_text(id, text),
            DraftEdit::SetCorrect { id } => self.set_correct(id),
        }
    }

    /// 新选项 id 为当前最大 id + 1
    pub fn add_option(&mut self) -> u32 {
        let id = self.options.iter().map(|o| o.id).max().unwrap_or(0) + 1;
        self.options.push(DraftOption::empty(id));
        id
    }

    /// 至少保留两个选项；删掉正确选项会清空选择
    pub fn remove_option(&mut self, id: u32) -> bool {
        if self.options.len() <= MIN_OPTIONS {
            return false;
        }
        let before = self.options.len();
        self.options.retain(|o| o.id != id);
        before != self.options.len()
    }

    pub fn set_option_text(&mut self, id: u32, text: String) {
        if let Some(option) = self.options.iter_mut().find(|o| o.id == id) {
            option.text = text;
        }
    }

    /// 单选
    pub fn set_correct(&mut self, id: u32) {
        if !self.options.iter().any(|o| o.id == id) {
            return;
        }
        for option in &mut self.options {
            option.is_correct = option.id == id;
        }
    }

    pub fn correct_option(&self) -> Option<(usize, &DraftOption)> {
        self.options.iter().enumerate().find(|(_, o)| o.is_correct)
    }

    pub fn validate(&self) -> Vec<FormError> {
        let mut errors = Vec::new();

        if self.question.trim().is_empty() {
            errors.push(FormError::EmptyQuestion);
        } else if self.question.chars().count() > MAX_QUESTION_CHARS {
            errors.push(FormError::QuestionTooLong(MAX_QUESTION_CHARS));
        }

        for (index, option) in self.options.iter().enumerate() {
            if option.text.trim().is_empty() {
                errors.push(FormError::EmptyOption(option_label(index)));
            } else if parser::is_reserved_line(&option.text) {
                errors.push(FormError::ReservedOption(option_label(index)));
            }
        }

        if self.correct_option().is_none() {
            errors.push(FormError::NoCorrectOption);
        }
        if self.options.len() < MIN_OPTIONS {
            errors.push(FormError::TooFewOptions(MIN_OPTIONS));
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    fn option_texts(&self) -> Vec<String> {
        self.options.iter().map(|o| o.text.trim().to_string()).collect()
    }

    /// 确认弹窗内容
    pub fn confirmation(&self, policy: &CreationPolicy) -> DraftConfirmation {
        DraftConfirmation {
            question: self.question.trim().to_string(),
            options: self
                .options
                .iter()
                .enumerate()
                .map(|(index, o)| LetteredOption {
                    letter: option_label(index),
                    text: o.text.trim().to_string(),
                    is_correct: o.is_correct,
                })
                .collect(),
            correct: self
                .correct_option()
                .map(|(index, _)| option_label(index)),
            reward_pool: utils::format_token_amount(policy.reward_pool),
            participation_fee: utils::format_token_amount(policy.participation_fee),
            duration_days: policy.duration_secs as f64 / 86_400.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LetteredOption {
    pub letter: String,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftConfirmation {
    pub question: String,
    pub options: Vec<LetteredOption>,
    pub correct: Option<String>,
    pub reward_pool: String,
    pub participation_fee: String,
    pub duration_days: f64,
}

/// 答案承诺方案尚未确定，先用随机 32 字节占位
pub fn placeholder_answer_hash() -> [u8; 32] {
    let mut hash = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut hash);
    hash
}

/// 校验通过、可直接上链的题目
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub args: CreateQuestionArgs,
}

pub fn prepare(draft: &QuestionDraft, policy: &CreationPolicy, now: u64) -> Result<PreparedQuestion> {
    let errors = draft.validate();
    if let Some(first) = errors.first() {
        bail!("{}", first);
    }
    let Some((correct_index, _)) = draft.correct_option() else {
        bail!("{}", FormError::NoCorrectOption);
    };

    let question = draft.question.trim().to_string();
    let options = draft.option_texts();

    Ok(PreparedQuestion {
        args: CreateQuestionArgs {
            token: policy.token,
            content: parser::render_content(&question, &options),
            answer_hash: placeholder_answer_hash(),
            reward_pool: policy.reward_pool,
            participation_fee: policy.participation_fee,
            start_at: now,
            end_at: now.saturating_add(policy.duration_secs),
        },
        question,
        options,
        correct_index,
    })
}

/// 同一时间只允许一笔出题交易；guard 释放时复位
pub struct CreatingGuard {
    flag: Arc<AtomicBool>,
}

impl CreatingGuard {
    pub fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for CreatingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionTarget {
    pub chain_id: u64,
    pub contract: Address,
    pub creator: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedQuestion {
    pub submission_id: String,
    pub tx_hash: String,
}

/// 记账后发送交易，节点接受即返回
pub async fn submit_question<W: ContractWriter>(
    writer: &W,
    ledger: &SubmissionLedger,
    prepared: &PreparedQuestion,
    target: SubmissionTarget,
) -> Result<SubmittedQuestion> {
    let submission_id = ledger.record_pending(&NewSubmission {
        chain_id: target.chain_id,
        contract: target.contract,
        creator: target.creator,
        question: prepared.question.clone(),
        options: prepared.options.clone(),
        correct_index: prepared.correct_index,
        answer_hash: prepared.args.answer_hash,
        reward_pool: prepared.args.reward_pool,
        participation_fee: prepared.args.participation_fee,
        start_at: prepared.args.start_at,
        end_at: prepared.args.end_at,
    })?;

    let tx = TransactionRequest {
        from: target.creator,
        to: target.contract,
        data: contract::create_question_call(&prepared.args),
        value: None,
    };

    match writer.send_transaction(&tx).await {
        Ok(tx_hash) => {
            ledger.mark_submitted(&submission_id, &tx_hash)?;
            log::info!("出题交易已发送: {} ({})", tx_hash, submission_id);
            Ok(SubmittedQuestion {
                submission_id,
                tx_hash,
            })
        }
        Err(e) => {
            log::error!("出题交易发送失败: {}", e);
            ledger.mark_failed(&submission_id, &e.to_string())?;
            Err(e.into())
        }
    }
}

pub const RECEIPT_TIMEOUT_NOTE: &str = "等待回执超时，交易仍可能上链";

/// 按回执结果更新账本
pub fn apply_receipt(
    ledger: &SubmissionLedger,
    submission_id: &str,
    receipt: &TransactionReceipt,
) -> Result<SubmissionStatus> {
    if receipt.success {
        ledger.mark_confirmed(submission_id, receipt.block_number)?;
        log::info!("题目已上链: 区块 {}", receipt.block_number);
        Ok(SubmissionStatus::Confirmed)
    } else {
        log::error!("出题交易执行失败: {}", receipt.transaction_hash);
        ledger.mark_failed(submission_id, "交易执行失败")?;
        Ok(SubmissionStatus::Failed)
    }
}

/// 消费回执进度并更新账本，返回最后状态
///
/// 查询出错只记日志继续等待；超时后记录保持 submitted，之后仍可刷新确认
pub async fn track_submission<S>(
    ledger: &SubmissionLedger,
    submission_id: &str,
    updates: S,
) -> Result<SubmissionStatus>
where
    S: Stream<Item = ReceiptUpdate>,
{
    pin_mut!(updates);

    while let Some(update) = updates.next().await {
        match update {
            ReceiptUpdate::Pending { elapsed_ms } => {
                log::debug!("等待回执 {} ({}ms)", submission_id, elapsed_ms);
            }
            ReceiptUpdate::Retrying { elapsed_ms, error } => {
                log::warn!("查询回执失败，稍后重试 ({}ms): {}", elapsed_ms, error);
            }
            ReceiptUpdate::Confirmed(receipt) => {
                return apply_receipt(ledger, submission_id, &receipt);
            }
            ReceiptUpdate::TimedOut => {
                log::warn!("等待回执超时: {}", submission_id);
                ledger.note_unconfirmed(submission_id, RECEIPT_TIMEOUT_NOTE)?;
                return Ok(SubmissionStatus::Submitted);
            }
        }
    }

    Ok(SubmissionStatus::Submitted)
}
