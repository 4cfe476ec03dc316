//! 题目聚合
//! 一次批量请求读取 1..=N 号题目，归一化后供各页面筛选
//! N 超过上限时只读取最新的一段，并在结果里标记截断

use crate::models::{Address, Question, QuestionState};
use crate::services::contract;
use crate::services::rpc::{ContractCall, ContractReader, RpcError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::RangeInclusive;

/// 给定 id 区间的读取描述
pub fn question_reads(contract_address: Address, ids: RangeInclusive<u64>) -> Vec<ContractCall> {
    ids.map(|id| ContractCall::new(contract_address, contract::question_call(id)))
        .collect()
}

/// 要读取的 id 区间：不超过 limit 道，优先最新的题目
pub fn read_window(count: u64, limit: u64) -> RangeInclusive<u64> {
    let first = count.saturating_sub(limit).saturating_add(1);
    first..=count
}

/// 返回数据无法解码的题目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedQuestion {
    pub id: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedQuestions {
    pub questions: Vec<Question>,
    pub skipped: Vec<SkippedQuestion>,
    /// 合约报告的题目总数
    pub total: u64,
    /// 总数超过上限，较早的题目未读取
    pub truncated: bool,
}

/// 按位置映射 id = i + 1；失败或 creator 为空的子调用直接过滤
pub fn normalize(results: Vec<Result<Vec<u8>, RpcError>>) -> AggregatedQuestions {
    normalize_from(1, results)
}

/// 同 `normalize`，第一个结果对应 first_id
pub fn normalize_from(first_id: u64, results: Vec<Result<Vec<u8>, RpcError>>) -> AggregatedQuestions {
    let mut aggregated = AggregatedQuestions::default();

    for (index, result) in results.into_iter().enumerate() {
        let id = first_id + index as u64;
        let data = match result {
            Ok(data) => data,
            Err(e) => {
                log::debug!("题目 #{} 读取失败: {}", id, e);
                continue;
            }
        };

        match contract::decode_question(id, &data) {
            Ok(Some(question)) => aggregated.questions.push(question),
            Ok(None) => {}
            Err(e) => {
                log::warn!("题目 #{} 返回数据无法解码: {}", id, e);
                aggregated.skipped.push(SkippedQuestion {
                    id,
                    reason: e.to_string(),
                });
            }
        }
    }

    aggregated
}

/// 读取题目总数，再批量读取最多 limit 道题目
pub async fn load_questions<R: ContractReader>(
    reader: &R,
    contract_address: Address,
    limit: u64,
) -> Result<AggregatedQuestions> {
    let count_call = ContractCall::new(contract_address, contract::question_count_call());
    let data = reader.read(&count_call).await.context("读取题目数量失败")?;
    let count = contract::decode_question_count(&data)?;

    if count == 0 {
        return Ok(AggregatedQuestions::default());
    }

    let window = read_window(count, limit);
    let first_id = *window.start();
    let truncated = first_id > 1;
    if truncated {
        log::warn!(
            "题目数量 {} 超过上限 {}，只读取 #{}..=#{}",
            count,
            limit,
            first_id,
            count
        );
    }

    let results = reader
        .read_batch(&question_reads(contract_address, window))
        .await
        .context("批量读取题目失败")?;
    let mut aggregated = normalize_from(first_id, results);
    aggregated.total = count;
    aggregated.truncated = truncated;

    log::info!(
        "已加载 {} 道题目（共 {}，跳过 {}）",
        aggregated.questions.len(),
        count,
        aggregated.skipped.len()
    );
    Ok(aggregated)
}

pub fn status_text(raw: u64) -> &'static str {
    QuestionState::from_raw(raw).label()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionFilter {
    #[default]
    All,
    Active,
    Ended,
}

impl QuestionFilter {
    pub fn matches(&self, question: &Question) -> bool {
        match self {
            QuestionFilter::All => true,
            QuestionFilter::Active => question.state.is_active(),
            QuestionFilter::Ended => !question.state.is_active(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuestionFilter::All => "全部",
            QuestionFilter::Active => "进行中",
            QuestionFilter::Ended => "已结束",
        }
    }
}

pub fn filter_by_state(questions: &[Question], filter: QuestionFilter) -> Vec<Question> {
    questions
        .iter()
        .filter(|q| filter.matches(q))
        .cloned()
        .collect()
}

pub fn created_by(questions: &[Question], creator: Address) -> Vec<Question> {
    questions
        .iter()
        .filter(|q| q.creator == creator)
        .cloned()
        .collect()
}

pub fn in_id_set(questions: &[Question], ids: &[u64]) -> Vec<Question> {
    let ids: HashSet<u64> = ids.iter().copied().collect();
    questions
        .iter()
        .filter(|q| ids.contains(&q.id))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TabCounts {
    pub all: usize,
    pub active: usize,
    pub ended: usize,
}

pub fn tab_counts(questions: &[Question]) -> TabCounts {
    let active = questions.iter().filter(|q| q.state.is_active()).count();
    TabCounts {
        all: questions.len(),
        active,
        ended: questions.len() - active,
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// 按 call data 返回预置结果
    #[derive(Default)]
    pub struct FakeReader {
        responses: HashMap<Vec<u8>, Vec<u8>>,
        pub batch_sizes: Mutex<Vec<usize>>,
        /// 单次读取与批量中每个子调用都计数
        pub reads: AtomicUsize,
    }

    impl FakeReader {
        pub fn with(mut self, data: Vec<u8>, response: Vec<u8>) -> Self {
            self.responses.insert(data, response);
            self
        }

        pub fn read_count(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        fn lookup(&self, call: &ContractCall) -> Result<Vec<u8>, RpcError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(&call.data)
                .cloned()
                .ok_or_else(|| RpcError::Rpc {
                    code: -32000,
                    message: "execution reverted".to_string(),
                })
        }
    }

    impl ContractReader for FakeReader {
        async fn read(&self, call: &ContractCall) -> Result<Vec<u8>, RpcError> {
            self.lookup(call)
        }

        async fn read_batch(
            &self,
            calls: &[ContractCall],
        ) -> Result<Vec<Result<Vec<u8>, RpcError>>, RpcError> {
            self.batch_sizes.lock().unwrap().push(calls.len());
            Ok(calls.iter().map(|c| self.lookup(c)).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeReader;
    use super::*;
    use crate::services::abi::{encode, Token};
    use crate::services::contract::fixtures::{creator, question_return};

    fn contract_address() -> Address {
        "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512".parse().unwrap()
    }

    fn question(id: u64, state: u64) -> Question {
        contract::decode_question(id, &question_return(creator(), state, "Question: T"))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_creatorless_question_is_filtered() {
        let results = vec![
            Ok(question_return(creator(), 0, "a")),
            Ok(question_return(Address::ZERO, 0, "")),
            Ok(question_return(creator(), 1, "c")),
        ];

        let aggregated = normalize(results);
        let ids: Vec<u64> = aggregated.questions.iter().map(|q| q.id).collect();

        assert_eq!(ids, vec![1, 3]);
        assert!(aggregated.skipped.is_empty());
    }

    #[test]
    fn test_failed_and_malformed_results() {
        let results = vec![
            Err(RpcError::MissingResponse(1)),
            Ok(vec![0u8; 10]),
            Ok(question_return(creator(), 0, "c")),
        ];

        let aggregated = normalize(results);

        assert_eq!(aggregated.questions.len(), 1);
        assert_eq!(aggregated.questions[0].id, 3);
        assert_eq!(aggregated.skipped.len(), 1);
        assert_eq!(aggregated.skipped[0].id, 2);
    }

    #[test]
    fn test_status_text() {
        assert_eq!(status_text(0), "进行中");
        assert_eq!(status_text(3), "已结算");
        assert_eq!(status_text(99), "未知");
    }

    #[test]
    fn test_filters_and_counts() {
        let questions = vec![question(1, 0), question(2, 1), question(3, 2)];

        assert_eq!(filter_by_state(&questions, QuestionFilter::Active).len(), 1);
        assert_eq!(filter_by_state(&questions, QuestionFilter::Ended).len(), 2);
        assert_eq!(created_by(&questions, creator()).len(), 3);
        assert!(created_by(&questions, Address::ZERO).is_empty());

        let picked: Vec<u64> = in_id_set(&questions, &[3, 1, 9]).iter().map(|q| q.id).collect();
        assert_eq!(picked, vec![1, 3]);

        assert_eq!(
            tab_counts(&questions),
            TabCounts {
                all: 3,
                active: 1,
                ended: 2
            }
        );
    }

    #[tokio::test]
    async fn test_load_questions_issues_one_batch() {
        let reader = FakeReader::default()
            .with(contract::question_count_call(), encode(&[Token::Uint(3)]))
            .with(contract::question_call(1), question_return(creator(), 0, "a"))
            .with(contract::question_call(2), question_return(Address::ZERO, 0, ""))
            .with(contract::question_call(3), question_return(creator(), 1, "c"));

        let aggregated = load_questions(&reader, contract_address(), 500).await.unwrap();

        let ids: Vec<u64> = aggregated.questions.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(*reader.batch_sizes.lock().unwrap(), vec![3]);
        assert_eq!(aggregated.total, 3);
        assert!(!aggregated.truncated);
    }

    #[tokio::test]
    async fn test_load_questions_caps_batch_to_newest() {
        let reader = FakeReader::default()
            .with(contract::question_count_call(), encode(&[Token::Uint(5)]))
            .with(contract::question_call(4), question_return(creator(), 0, "d"))
            .with(contract::question_call(5), question_return(creator(), 1, "e"));

        let aggregated = load_questions(&reader, contract_address(), 2).await.unwrap();

        let ids: Vec<u64> = aggregated.questions.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![4, 5]);
        assert_eq!(*reader.batch_sizes.lock().unwrap(), vec![2]);
        assert_eq!(aggregated.total, 5);
        assert!(aggregated.truncated);
    }

    #[tokio::test]
    async fn test_huge_question_count_stays_bounded() {
        let reader = FakeReader::default()
            .with(contract::question_count_call(), encode(&[Token::Uint(u64::MAX.into())]));

        let aggregated = load_questions(&reader, contract_address(), 3).await.unwrap();

        assert_eq!(*reader.batch_sizes.lock().unwrap(), vec![3]);
        assert!(aggregated.truncated);
        assert!(aggregated.questions.is_empty());
    }

    #[test]
    fn test_read_window() {
        assert_eq!(read_window(3, 500), 1..=3);
        assert_eq!(read_window(5, 2), 4..=5);
        assert_eq!(read_window(u64::MAX, 1), u64::MAX..=u64::MAX);
    }

    #[tokio::test]
    async fn test_load_questions_empty_contract() {
        let reader = FakeReader::default()
            .with(contract::question_count_call(), encode(&[Token::Uint(0)]));

        let aggregated = load_questions(&reader, contract_address(), 500).await.unwrap();
        assert!(aggregated.questions.is_empty());
        assert!(reader.batch_sizes.lock().unwrap().is_empty());
    }
}
