//! 领域模型
//! StakedQuiz 合约中的题目、参与记录与账户汇总

use crate::services::abi::AbiError;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap())
}

/// 20 字节账户/合约地址
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// 缩写形式，如 `0x742d...b8d4`
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !address_pattern().is_match(s) {
            return Err(AbiError::InvalidAddress(s.to_string()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(&s[2..], &mut bytes)
            .map_err(|_| AbiError::InvalidAddress(s.to_string()))?;
        Ok(Address(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// 题目生命周期：Active → {Revealed | Refunding} → Settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionState {
    Active,
    Revealed,
    Refunding,
    Settled,
    Unknown(u64),
}

impl QuestionState {
    pub fn from_raw(raw: u64) -> Self {
        match raw {
            0 => QuestionState::Active,
            1 => QuestionState::Revealed,
            2 => QuestionState::Refunding,
            3 => QuestionState::Settled,
            other => QuestionState::Unknown(other),
        }
    }

    pub fn raw(&self) -> u64 {
        match self {
            QuestionState::Active => 0,
            QuestionState::Revealed => 1,
            QuestionState::Refunding => 2,
            QuestionState::Settled => 3,
            QuestionState::Unknown(raw) => *raw,
        }
    }

    /// 界面展示用的状态文字
    pub fn label(&self) -> &'static str {
        match self {
            QuestionState::Active => "进行中",
            QuestionState::Revealed => "已揭晓",
            QuestionState::Refunding => "退款中",
            QuestionState::Settled => "已结算",
            QuestionState::Unknown(_) => "未知",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, QuestionState::Active)
    }
}

impl Serialize for QuestionState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.raw())
    }
}

/// 链上题目记录
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: u64,
    pub creator: Address,
    pub token: Address,
    /// `0x` 前缀的十六进制内容
    pub content_uri: String,
    pub reward_pool: u128,
    pub participation_fee: u128,
    pub start_at: u64,
    pub end_at: u64,
    pub answer_hash: [u8; 32],
    pub state: QuestionState,
    pub total_staked_from_participants: u128,
    pub correct_count: u128,
    pub refund_available_at: u64,
}

/// 某地址在某题目下的参与情况
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    pub participated: bool,
    pub answer_index: u64,
    pub is_correct: bool,
}

/// `getUserInfo` 的具名结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAccountSummary {
    pub total_staked: u128,
    pub available: u128,
    pub locked: u128,
    pub total_profit: u128,
    pub total_loss: u128,
    pub created_question_ids: Vec<u64>,
    pub answered_question_ids: Vec<u64>,
}

impl UserAccountSummary {
    pub fn net_profit(&self) -> i128 {
        let profit = i128::try_from(self.total_profit).unwrap_or(i128::MAX);
        let loss = i128::try_from(self.total_loss).unwrap_or(i128::MAX);
        profit.saturating_sub(loss)
    }
}
