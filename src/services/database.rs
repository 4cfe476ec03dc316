// 出题记录
// 本地 SQLite 账本，记录从本客户端提交的题目及其交易状态

use crate::models::Address;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const SUBMISSION_COLUMNS: &str = "id, chain_id, contract, creator, question, options, correct_index,
     answer_hash, reward_pool, participation_fee, start_at, end_at, tx_hash, block_number,
     status, error, created_at, updated_at";

/// 提交状态：pending → submitted → confirmed | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Submitted,
    Confirmed,
    Failed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Confirmed => "confirmed",
            SubmissionStatus::Failed => "failed",
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(SubmissionStatus::Pending),
            "submitted" => Ok(SubmissionStatus::Submitted),
            "confirmed" => Ok(SubmissionStatus::Confirmed),
            "failed" => Ok(SubmissionStatus::Failed),
            other => Err(anyhow!("未知的提交状态: {}", other)),
        }
    }
}

/// 待写入的出题记录
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub chain_id: u64,
    pub contract: Address,
    pub creator: Address,
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub answer_hash: [u8; 32],
    pub reward_pool: u128,
    pub participation_fee: u128,
    pub start_at: u64,
    pub end_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub chain_id: u64,
    pub contract: Address,
    pub creator: Address,
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub answer_hash: String,
    pub reward_pool: String,
    pub participation_fee: String,
    pub start_at: u64,
    pub end_at: u64,
    pub tx_hash: Option<String>,
    pub block_number: Option<u64>,
    pub status: SubmissionStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn conversion_error<E>(index: usize, err: E) -> rusqlite::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
{
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, err.into())
}

/// 出题记录服务
pub struct SubmissionLedger {
    conn: Mutex<Connection>,
}

impl SubmissionLedger {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let ledger = Self {
            conn: Mutex::new(conn),
        };
        ledger.initialize()?;
        Ok(ledger)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("数据库连接锁已损坏"))
    }

    /// 初始化表结构
    pub fn initialize(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS submissions (
                id TEXT PRIMARY KEY,
                chain_id INTEGER NOT NULL,
                contract TEXT NOT NULL,
                creator TEXT NOT NULL,
                question TEXT NOT NULL,
                options TEXT NOT NULL,
                correct_index INTEGER NOT NULL,
                answer_hash TEXT NOT NULL,
                reward_pool TEXT NOT NULL,
                participation_fee TEXT NOT NULL,
                start_at INTEGER NOT NULL,
                end_at INTEGER NOT NULL,
                tx_hash TEXT,
                block_number INTEGER,
                status TEXT NOT NULL,
                error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_submissions_tx_hash ON submissions(tx_hash)",
            [],
        )?;

        Ok(())
    }

    /// 发送交易前先记一条 pending
    pub fn record_pending(&self, submission: &NewSubmission) -> Result<String> {
        let conn = self.lock()?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            &format!(
                "INSERT INTO submissions ({}) VALUES
                 (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, ?, NULL, ?, ?)",
                SUBMISSION_COLUMNS
            ),
            rusqlite::params![
                id,
                submission.chain_id as i64,
                submission.contract.to_string(),
                submission.creator.to_string(),
                submission.question,
                serde_json::to_string(&submission.options)?,
                submission.correct_index as i64,
                format!("0x{}", hex::encode(submission.answer_hash)),
                submission.reward_pool.to_string(),
                submission.participation_fee.to_string(),
                submission.start_at as i64,
                submission.end_at as i64,
                SubmissionStatus::Pending.as_str(),
                now,
                now,
            ],
        )?;

        Ok(id)
    }

    /// 节点已接受交易
    pub fn mark_submitted(&self, id: &str, tx_hash: &str) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE submissions SET status = ?, tx_hash = ?, updated_at = ?
             WHERE id = ? AND status = ?",
            rusqlite::params![
                SubmissionStatus::Submitted.as_str(),
                tx_hash,
                Utc::now().to_rfc3339(),
                id,
                SubmissionStatus::Pending.as_str(),
            ],
        )?;
        Ok(changed == 1)
    }

    /// 回执已确认；之前被标记失败但已有交易哈希的记录同样可以确认
    pub fn mark_confirmed(&self, id: &str, block_number: u64) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE submissions SET status = ?, block_number = ?, error = NULL, updated_at = ?
             WHERE id = ? AND tx_hash IS NOT NULL AND status IN (?, ?)",
            rusqlite::params![
                SubmissionStatus::Confirmed.as_str(),
                block_number as i64,
                Utc::now().to_rfc3339(),
                id,
                SubmissionStatus::Submitted.as_str(),
                SubmissionStatus::Failed.as_str(),
            ],
        )?;
        Ok(changed == 1)
    }

    /// 回执暂未取得，记录原因但保持 submitted
    pub fn note_unconfirmed(&self, id: &str, note: &str) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE submissions SET error = ?, updated_at = ? WHERE id = ? AND status = ?",
            rusqlite::params![
                note,
                Utc::now().to_rfc3339(),
                id,
                SubmissionStatus::Submitted.as_str(),
            ],
        )?;
        Ok(changed == 1)
    }

    /// 发送失败或回执 revert
    pub fn mark_failed(&self, id: &str, error: &str) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE submissions SET status = ?, error = ?, updated_at = ?
             WHERE id = ? AND status IN (?, ?)",
            rusqlite::params![
                SubmissionStatus::Failed.as_str(),
                error,
                Utc::now().to_rfc3339(),
                id,
                SubmissionStatus::Pending.as_str(),
                SubmissionStatus::Submitted.as_str(),
            ],
        )?;
        Ok(changed == 1)
    }

    pub fn get(&self, id: &str) -> Result<Option<Submission>> {
        let conn = self.lock()?;
        let submission = conn
            .query_row(
                &format!("SELECT {} FROM submissions WHERE id = ?", SUBMISSION_COLUMNS),
                rusqlite::params![id],
                Self::row_to_submission,
            )
            .optional()?;
        Ok(submission)
    }

    /// 最近的提交记录，新的在前
    pub fn list(&self, limit: u32) -> Result<Vec<Submission>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM submissions ORDER BY created_at DESC, rowid DESC LIMIT ?",
            SUBMISSION_COLUMNS
        ))?;

        let rows = stmt.query_map(rusqlite::params![limit], Self::row_to_submission)?;

        let mut submissions = Vec::new();
        for row in rows {
            submissions.push(row?);
        }
        Ok(submissions)
    }

    fn row_to_submission(row: &Row) -> Result<Submission, rusqlite::Error> {
        let address = |index: usize| -> Result<Address, rusqlite::Error> {
            row.get::<_, String>(index)?
                .parse()
                .map_err(|e| conversion_error(index, e))
        };
        let timestamp = |index: usize| -> Result<DateTime<Utc>, rusqlite::Error> {
            row.get::<_, String>(index)?
                .parse::<DateTime<Utc>>()
                .map_err(|e| conversion_error(index, e))
        };

        let options: Vec<String> = serde_json::from_str(&row.get::<_, String>(5)?)
            .map_err(|e| conversion_error(5, e))?;
        let status = row
            .get::<_, String>(14)?
            .parse::<SubmissionStatus>()
            .map_err(|e| conversion_error(14, e))?;

        Ok(Submission {
            id: row.get(0)?,
            chain_id: row.get::<_, i64>(1)? as u64,
            contract: address(2)?,
            creator: address(3)?,
            question: row.get(4)?,
            options,
            correct_index: row.get::<_, i64>(6)? as usize,
            answer_hash: row.get(7)?,
            reward_pool: row.get(8)?,
            participation_fee: row.get(9)?,
            start_at: row.get::<_, i64>(10)? as u64,
            end_at: row.get::<_, i64>(11)? as u64,
            tx_hash: row.get(12)?,
            block_number: row.get::<_, Option<i64>>(13)?.map(|n| n as u64),
            status,
            error: row.get(15)?,
            created_at: timestamp(16)?,
            updated_at: timestamp(17)?,
        })
    }
}
