//! 页面视图模型
//! 首页、详情页、个人中心的数据在这里组装好，前端只负责渲染

use crate::models::{Address, ParticipantRecord, Question, QuestionState, UserAccountSummary};
use crate::services::aggregator::{self, QuestionFilter, SkippedQuestion};
use crate::services::contract;
use crate::services::network::NetworkWarning;
use crate::services::parser;
use crate::services::rpc::{ContractCall, ContractReader};
use crate::utils::{format_timestamp, format_token_amount};
use anyhow::{Context, Result};
use serde::Serialize;

pub const DEFAULT_QID: u64 = 1;

/// 题目卡片
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionCard {
    pub id: u64,
    pub title: String,
    pub state: QuestionState,
    pub status: &'static str,
    pub reward_pool: String,
    pub participation_fee: String,
    pub start_at: String,
    pub end_at: String,
    pub creator: Address,
    pub creator_short: String,
}

impl QuestionCard {
    pub fn from_question(question: &Question) -> Self {
        let parsed = parser::parse_content_uri(&question.content_uri);
        Self {
            id: question.id,
            title: parser::display_title(&parsed, question.id),
            state: question.state,
            status: question.state.label(),
            reward_pool: format_token_amount(question.reward_pool),
            participation_fee: format_token_amount(question.participation_fee),
            start_at: format_timestamp(question.start_at),
            end_at: format_timestamp(question.end_at),
            creator: question.creator,
            creator_short: question.creator.short(),
        }
    }
}

fn cards(questions: &[Question]) -> Vec<QuestionCard> {
    questions.iter().map(QuestionCard::from_question).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub filter: QuestionFilter,
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeView {
    pub tabs: Vec<Tab>,
    pub active_tab: QuestionFilter,
    pub cards: Vec<QuestionCard>,
    pub skipped: Vec<SkippedQuestion>,
    /// 题目总数超过读取上限，较早的题目未展示
    pub truncated: bool,
    pub warning: Option<NetworkWarning>,
}

pub fn home_view(
    questions: &[Question],
    skipped: Vec<SkippedQuestion>,
    filter: QuestionFilter,
    warning: Option<NetworkWarning>,
) -> HomeView {
    let counts = aggregator::tab_counts(questions);
    let tabs = [
        (QuestionFilter::All, counts.all),
        (QuestionFilter::Active, counts.active),
        (QuestionFilter::Ended, counts.ended),
    ]
    .into_iter()
    .map(|(filter, count)| Tab {
        filter,
        label: filter.label(),
        count,
    })
    .collect();

    HomeView {
        tabs,
        active_tab: filter,
        cards: cards(&aggregator::filter_by_state(questions, filter)),
        skipped,
        truncated: false,
        warning,
    }
}

/// 合约地址被网络守卫抑制时不发起读取
pub async fn load_home<R: ContractReader>(
    reader: &R,
    contract_address: Option<Address>,
    filter: QuestionFilter,
    max_questions: u64,
    warning: Option<NetworkWarning>,
) -> Result<HomeView> {
    let Some(contract_address) = contract_address else {
        return Ok(home_view(&[], Vec::new(), filter, warning));
    };

    let aggregated = aggregator::load_questions(reader, contract_address, max_questions).await?;
    Ok(HomeView {
        truncated: aggregated.truncated,
        ..home_view(&aggregated.questions, aggregated.skipped, filter, warning)
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDetails {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    /// 仅在已揭晓后展示
    pub correct_answer: Option<String>,
    pub state: QuestionState,
    pub status: &'static str,
    pub creator: Address,
    pub token: Address,
    pub reward_pool: String,
    pub participation_fee: String,
    pub total_staked: String,
    pub correct_count: String,
    pub start_at: String,
    pub end_at: String,
    pub refund_available_at: String,
}

impl QuestionDetails {
    pub fn from_question(question: &Question) -> Self {
        let parsed = parser::parse_content_uri(&question.content_uri);
        let revealed = question.state == QuestionState::Revealed;

        Self {
            id: question.id,
            title: parser::display_title(&parsed, question.id),
            description: parsed.description.clone(),
            correct_answer: (revealed && !parsed.correct_answer.is_empty())
                .then(|| parsed.correct_answer.clone()),
            options: parsed.options,
            state: question.state,
            status: question.state.label(),
            creator: question.creator,
            token: question.token,
            reward_pool: format_token_amount(question.reward_pool),
            participation_fee: format_token_amount(question.participation_fee),
            total_staked: format_token_amount(question.total_staked_from_participants),
            correct_count: question.correct_count.to_string(),
            start_at: format_timestamp(question.start_at),
            end_at: format_timestamp(question.end_at),
            refund_available_at: format_timestamp(question.refund_available_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsView {
    pub qid: u64,
    pub question: Option<QuestionDetails>,
    pub participant: ParticipantRecord,
    pub tabs: [&'static str; 2],
    pub warning: Option<NetworkWarning>,
}

impl DetailsView {
    fn empty(qid: u64, warning: Option<NetworkWarning>) -> Self {
        Self {
            qid,
            question: None,
            participant: ParticipantRecord::default(),
            tabs: ["题目详情", "参与记录"],
            warning,
        }
    }
}

/// 题目与当前用户的参与记录并发读取
pub async fn load_details<R: ContractReader>(
    reader: &R,
    contract_address: Option<Address>,
    qid: Option<u64>,
    account: Option<Address>,
    warning: Option<NetworkWarning>,
) -> Result<DetailsView> {
    let qid = qid.unwrap_or(DEFAULT_QID);
    let Some(contract_address) = contract_address else {
        return Ok(DetailsView::empty(qid, warning));
    };

    let question_call = ContractCall::new(contract_address, contract::question_call(qid));
    let participant_call = ContractCall::new(
        contract_address,
        contract::participant_call(qid, account.unwrap_or(Address::ZERO)),
    );

    let (question_data, participant_data) =
        futures::try_join!(reader.read(&question_call), reader.read(&participant_call))
            .with_context(|| format!("读取题目 #{} 失败", qid))?;

    let question = contract::decode_question(qid, &question_data)?;
    let participant = if account.is_some() {
        contract::decode_participant(&participant_data)?
    } else {
        ParticipantRecord::default()
    };

    Ok(DetailsView {
        question: question.as_ref().map(QuestionDetails::from_question),
        participant,
        ..DetailsView::empty(qid, warning)
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileStat {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub address: Option<Address>,
    pub stats: Vec<ProfileStat>,
    pub created: Vec<QuestionCard>,
    pub answered: Vec<QuestionCard>,
    pub truncated: bool,
    pub warning: Option<NetworkWarning>,
}

fn eth(amount: u128) -> String {
    format!("{} ETH", format_token_amount(amount))
}

fn signed_eth(amount: i128) -> String {
    if amount < 0 {
        format!("-{}", eth(amount.unsigned_abs()))
    } else {
        eth(amount.unsigned_abs())
    }
}

pub fn profile_stats(summary: &UserAccountSummary, created: usize, answered: usize) -> Vec<ProfileStat> {
    vec![
        ProfileStat {
            label: "出题数量",
            value: created.to_string(),
        },
        ProfileStat {
            label: "答题数量",
            value: answered.to_string(),
        },
        ProfileStat {
            label: "质押中",
            value: eth(summary.total_staked),
        },
        ProfileStat {
            label: "可提取",
            value: eth(summary.available),
        },
        ProfileStat {
            label: "总收益",
            value: eth(summary.total_profit),
        },
        ProfileStat {
            label: "总损失",
            value: eth(summary.total_loss),
        },
        ProfileStat {
            label: "净收益",
            value: signed_eth(summary.net_profit()),
        },
    ]
}

/// 我出的题：creator 为本人或在 createdQuestionIds 中；我答的题：在 answeredQuestionIds 中
pub fn profile_view(
    address: Address,
    questions: &[Question],
    summary: &UserAccountSummary,
    warning: Option<NetworkWarning>,
) -> ProfileView {
    let created: Vec<Question> = questions
        .iter()
        .filter(|q| q.creator == address || summary.created_question_ids.contains(&q.id))
        .cloned()
        .collect();
    let answered = aggregator::in_id_set(questions, &summary.answered_question_ids);

    ProfileView {
        address: Some(address),
        stats: profile_stats(summary, created.len(), answered.len()),
        created: cards(&created),
        answered: cards(&answered),
        truncated: false,
        warning,
    }
}

pub async fn load_profile<R: ContractReader>(
    reader: &R,
    contract_address: Option<Address>,
    account: Option<Address>,
    token: Address,
    max_questions: u64,
    warning: Option<NetworkWarning>,
) -> Result<ProfileView> {
    let (Some(contract_address), Some(account)) = (contract_address, account) else {
        return Ok(ProfileView {
            address: account,
            stats: profile_stats(&UserAccountSummary::default(), 0, 0),
            created: Vec::new(),
            answered: Vec::new(),
            truncated: false,
            warning,
        });
    };

    let user_info_call = ContractCall::new(contract_address, contract::user_info_call(token, account));
    let (aggregated, user_info) = futures::try_join!(
        aggregator::load_questions(reader, contract_address, max_questions),
        async {
            reader
                .read(&user_info_call)
                .await
                .context("读取用户信息失败")
        },
    )?;
    let summary = contract::decode_user_info(&user_info)?;

    Ok(ProfileView {
        truncated: aggregated.truncated,
        ..profile_view(account, &aggregated.questions, &summary, warning)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::abi::{encode, Token};
    use crate::services::aggregator::fake::FakeReader;
    use crate::services::contract::fixtures::{creator, question_return, user_info_return};
    use crate::services::network;

    fn contract_address() -> Address {
        "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512".parse().unwrap()
    }

    fn content(answer: &str) -> String {
        format!("Question: 1+1=?\nOptions:\n1\n2\nCorrect Answer: {}", answer)
    }

    fn question(id: u64, owner: Address, state: u64) -> Question {
        contract::decode_question(id, &question_return(owner, state, &content("2")))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_home_view_tabs_and_filter() {
        let questions = vec![
            question(1, creator(), 0),
            question(2, creator(), 1),
            question(3, creator(), 3),
        ];

        let view = home_view(&questions, Vec::new(), QuestionFilter::Ended, None);

        let labels: Vec<(&str, usize)> = view.tabs.iter().map(|t| (t.label, t.count)).collect();
        assert_eq!(labels, vec![("全部", 3), ("进行中", 1), ("已结束", 2)]);
        let ids: Vec<u64> = view.cards.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(view.cards[0].title, "1+1=?");
        assert_eq!(view.cards[0].status, "已揭晓");
        assert_eq!(view.cards[0].creator_short, "0x742d...b8d4");
        assert_eq!(view.cards[0].reward_pool, "0.0100");
    }

    #[test]
    fn test_card_placeholder_title() {
        let q = contract::decode_question(5, &question_return(creator(), 0, "plain text"))
            .unwrap()
            .unwrap();
        assert_eq!(QuestionCard::from_question(&q).title, "题目 #5");
    }

    #[test]
    fn test_answer_hidden_until_revealed() {
        let active = QuestionDetails::from_question(&question(1, creator(), 0));
        assert_eq!(active.correct_answer, None);
        assert_eq!(active.options, vec!["1", "2"]);
        assert_eq!(active.description, "1+1=?");

        let revealed = QuestionDetails::from_question(&question(1, creator(), 1));
        assert_eq!(revealed.correct_answer.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_guarded_home_issues_no_reads() {
        let reader = FakeReader::default();
        let warning = network::network_warning(Some(1), None);

        let view = load_home(&reader, None, QuestionFilter::All, 500, warning.clone())
            .await
            .unwrap();

        assert!(view.cards.is_empty());
        assert_eq!(view.warning, warning);
        assert_eq!(reader.read_count(), 0);
    }

    #[tokio::test]
    async fn test_guarded_details_issues_no_reads() {
        let reader = FakeReader::default();
        let warning = network::network_warning(Some(1), None);

        let view = load_details(&reader, None, Some(3), Some(Address([9u8; 20])), warning.clone())
            .await
            .unwrap();

        assert_eq!(view.qid, 3);
        assert!(view.question.is_none());
        assert!(!view.participant.participated);
        assert_eq!(view.warning, warning);
        assert_eq!(reader.read_count(), 0);
    }

    #[tokio::test]
    async fn test_guarded_profile_issues_no_reads() {
        let me = Address([5u8; 20]);
        let reader = FakeReader::default();
        let warning = network::network_warning(Some(1), None);

        let view = load_profile(&reader, None, Some(me), Address::ZERO, 500, warning.clone())
            .await
            .unwrap();

        assert_eq!(view.address, Some(me));
        assert!(view.created.is_empty());
        assert!(view.answered.is_empty());
        assert_eq!(view.stats[0].value, "0");
        assert_eq!(view.warning, warning);
        assert_eq!(reader.read_count(), 0);
    }

    #[tokio::test]
    async fn test_home_reports_truncation() {
        let reader = FakeReader::default()
            .with(contract::question_count_call(), encode(&[Token::Uint(3)]))
            .with(contract::question_call(3), question_return(creator(), 0, &content("1")));

        let view = load_home(&reader, Some(contract_address()), QuestionFilter::All, 1, None)
            .await
            .unwrap();

        assert!(view.truncated);
        let ids: Vec<u64> = view.cards.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[tokio::test]
    async fn test_load_details_with_participation() {
        let user = Address([9u8; 20]);
        let reader = FakeReader::default()
            .with(contract::question_call(1), question_return(creator(), 1, &content("2")))
            .with(
                contract::participant_call(1, user),
                encode(&[Token::Bool(true), Token::Uint(1), Token::Bool(true)]),
            );

        let view = load_details(&reader, Some(contract_address()), None, Some(user), None)
            .await
            .unwrap();

        assert_eq!(view.qid, 1);
        assert!(view.participant.participated);
        assert_eq!(view.question.unwrap().correct_answer.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_load_details_missing_question() {
        let reader = FakeReader::default()
            .with(contract::question_call(7), question_return(Address::ZERO, 0, ""))
            .with(
                contract::participant_call(7, Address::ZERO),
                encode(&[Token::Bool(false), Token::Uint(0), Token::Bool(false)]),
            );

        let view = load_details(&reader, Some(contract_address()), Some(7), None, None)
            .await
            .unwrap();
        assert!(view.question.is_none());
        assert!(!view.participant.participated);
    }

    #[test]
    fn test_profile_view_lists() {
        let me = Address([5u8; 20]);
        let questions = vec![
            question(1, me, 0),
            question(2, creator(), 1),
            question(3, creator(), 0),
            question(4, creator(), 3),
        ];
        let summary = UserAccountSummary {
            total_profit: 10_000_000_000_000_000,
            total_loss: 25_000_000_000_000_000,
            created_question_ids: vec![4],
            answered_question_ids: vec![2, 3],
            ..Default::default()
        };

        let view = profile_view(me, &questions, &summary, None);

        let created: Vec<u64> = view.created.iter().map(|c| c.id).collect();
        let answered: Vec<u64> = view.answered.iter().map(|c| c.id).collect();
        assert_eq!(created, vec![1, 4]);
        assert_eq!(answered, vec![2, 3]);

        assert_eq!(view.stats[0].value, "2");
        let net = view.stats.iter().find(|s| s.label == "净收益").unwrap();
        assert_eq!(net.value, "-0.0150 ETH");
    }

    #[tokio::test]
    async fn test_load_profile() {
        let me = Address([5u8; 20]);
        let reader = FakeReader::default()
            .with(contract::question_count_call(), encode(&[Token::Uint(2)]))
            .with(contract::question_call(1), question_return(me, 0, &content("1")))
            .with(contract::question_call(2), question_return(creator(), 1, &content("2")))
            .with(
                contract::user_info_call(Address::ZERO, me),
                user_info_return(vec![1], vec![2]),
            );

        let view = load_profile(&reader, Some(contract_address()), Some(me), Address::ZERO, 500, None)
            .await
            .unwrap();

        assert!(!view.truncated);
        assert_eq!(view.created.len(), 1);
        assert_eq!(view.answered[0].id, 2);
        let staked = view.stats.iter().find(|s| s.label == "质押中").unwrap();
        assert_eq!(staked.value, "0.2400 ETH");
    }

    #[tokio::test]
    async fn test_profile_without_account() {
        let reader = FakeReader::default();
        let view = load_profile(&reader, Some(contract_address()), None, Address::ZERO, 500, None)
            .await
            .unwrap();
        assert!(view.address.is_none());
        assert!(view.created.is_empty());
    }
}
