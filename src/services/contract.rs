//! StakedQuiz 合约绑定
//! 调用编码与返回值解码集中在这里，按位置排列的元组只在此处解析一次

use crate::models::{Address, ParticipantRecord, Question, QuestionState, UserAccountSummary};
use crate::services::abi::{encode_call, to_hex, AbiError, AbiReader, Token};

pub const QUESTION_COUNT: &str = "questionCount()";
pub const QUESTIONS: &str = "questions(uint256)";
pub const PARTICIPANTS: &str = "participants(uint256,address)";
pub const GET_USER_INFO: &str = "getUserInfo(address,address)";
pub const CREATE_QUESTION: &str =
    "createQuestion(address,string,bytes32,uint256,uint256,uint256,uint256)";

pub fn question_count_call() -> Vec<u8> {
    encode_call(QUESTION_COUNT, &[])
}

pub fn decode_question_count(data: &[u8]) -> Result<u64, AbiError> {
    AbiReader::new(data).uint64(0)
}

pub fn question_call(id: u64) -> Vec<u8> {
    encode_call(QUESTIONS, &[Token::Uint(id.into())])
}

/// 解码 `questions(id)`；creator 为零地址表示题目不存在
///
/// 返回值是 `Question memory`，含 `bytes` 成员属于动态元组，
/// 第 0 个字是元组偏移，各字段相对元组起点读取
pub fn decode_question(id: u64, data: &[u8]) -> Result<Option<Question>, AbiError> {
    let r = AbiReader::new(data).tuple(0)?;

    let creator = r.address(0)?;
    if creator.is_zero() {
        return Ok(None);
    }

    Ok(Some(Question {
        id,
        creator,
        token: r.address(1)?,
        content_uri: to_hex(&r.bytes(2)?),
        reward_pool: r.uint(3)?,
        participation_fee: r.uint(4)?,
        start_at: r.uint64(5)?,
        end_at: r.uint64(6)?,
        answer_hash: r.bytes32(7)?,
        state: QuestionState::from_raw(r.uint64(8)?),
        total_staked_from_participants: r.uint(9)?,
        correct_count: r.uint(10)?,
        refund_available_at: r.uint64(11)?,
    }))
}

pub fn participant_call(id: u64, user: Address) -> Vec<u8> {
    encode_call(PARTICIPANTS, &[Token::Uint(id.into()), Token::Address(user)])
}

/// 成员全是静态类型，结构体内联编码，没有偏移字
pub fn decode_participant(data: &[u8]) -> Result<ParticipantRecord, AbiError> {
    let r = AbiReader::new(data);
    Ok(ParticipantRecord {
        participated: r.bool(0)?,
        answer_index: r.uint64(1)?,
        is_correct: r.bool(2)?,
    })
}

pub fn user_info_call(token: Address, user: Address) -> Vec<u8> {
    encode_call(GET_USER_INFO, &[Token::Address(token), Token::Address(user)])
}

/// 返回值顺序：totalStaked, available, locked, totalProfit, totalLoss,
/// createdQuestionIds[], answeredQuestionIds[]
pub fn decode_user_info(data: &[u8]) -> Result<UserAccountSummary, AbiError> {
    let r = AbiReader::new(data);

    let ids = |index: usize| -> Result<Vec<u64>, AbiError> {
        r.uint_array(index)?
            .into_iter()
            .map(|id| u64::try_from(id).map_err(|_| AbiError::Overflow { index, bits: 64 }))
            .collect()
    };

    Ok(UserAccountSummary {
        total_staked: r.uint(0)?,
        available: r.uint(1)?,
        locked: r.uint(2)?,
        total_profit: r.uint(3)?,
        total_loss: r.uint(4)?,
        created_question_ids: ids(5)?,
        answered_question_ids: ids(6)?,
    })
}

/// `createQuestion` 参数
#[derive(Debug, Clone, PartialEq)]
pub struct CreateQuestionArgs {
    pub token: Address,
    pub content: String,
    pub answer_hash: [u8; 32],
    pub reward_pool: u128,
    pub participation_fee: u128,
    pub start_at: u64,
    pub end_at: u64,
}

pub fn create_question_call(args: &CreateQuestionArgs) -> Vec<u8> {
    encode_call(
        CREATE_QUESTION,
        &[
            Token::Address(args.token),
            Token::String(args.content.clone()),
            Token::FixedBytes(args.answer_hash),
            Token::Uint(args.reward_pool),
            Token::Uint(args.participation_fee),
            Token::Uint(args.start_at.into()),
            Token::Uint(args.end_at.into()),
        ],
    )
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::services::abi::encode;

    pub fn creator() -> Address {
        "0x742d35Cc6634C0532925a3b8D4C0532925a3b8D4".parse().unwrap()
    }

    /// 按 `questions(id)` 的返回布局编码：元组偏移字 + 结构体成员
    pub fn question_return(creator: Address, state: u64, content: &str) -> Vec<u8> {
        let mut data = encode(&[Token::Uint(32)]);
        data.extend(question_fields(creator, state, content));
        data
    }

    /// 不带元组偏移的成员编码
    pub fn question_fields(creator: Address, state: u64, content: &str) -> Vec<u8> {
        encode(&[
            Token::Address(creator),
            Token::Address(Address::ZERO),
            Token::Bytes(content.as_bytes().to_vec()),
            Token::Uint(10_000_000_000_000_000),
            Token::Uint(1_000_000_000_000_000),
            Token::Uint(1_700_000_000),
            Token::Uint(1_700_604_800),
            Token::FixedBytes([7u8; 32]),
            Token::Uint(state.into()),
            Token::Uint(3_000_000_000_000_000),
            Token::Uint(2),
            Token::Uint(0),
        ])
    }

    pub fn user_info_return(created: Vec<u128>, answered: Vec<u128>) -> Vec<u8> {
        encode(&[
            Token::Uint(240_000_000_000_000_000),
            Token::Uint(50_000_000_000_000_000),
            Token::Uint(0),
            Token::Uint(1_860_000_000_000_000_000),
            Token::Uint(120_000_000_000_000_000),
            Token::UintArray(created),
            Token::UintArray(answered),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::services::abi::{encode, selector};

    #[test]
    fn test_question_call_layout() {
        let data = question_call(3);
        assert_eq!(&data[..4], &selector(QUESTIONS));
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(data[35], 3);
    }

    #[test]
    fn test_decode_question() {
        let data = question_return(creator(), 1, "Question: T");
        let question = decode_question(4, &data).unwrap().unwrap();

        assert_eq!(question.id, 4);
        assert_eq!(question.creator, creator());
        assert_eq!(question.content_uri, format!("0x{}", hex::encode("Question: T")));
        assert_eq!(question.reward_pool, 10_000_000_000_000_000);
        assert_eq!(question.end_at, 1_700_604_800);
        assert_eq!(question.state, QuestionState::Revealed);
        assert_eq!(question.answer_hash, [7u8; 32]);
    }

    #[test]
    fn test_decode_question_without_creator_is_absent() {
        let data = question_return(Address::ZERO, 0, "");
        assert_eq!(decode_question(2, &data).unwrap(), None);
    }

    #[test]
    fn test_decode_question_rejects_empty_return() {
        assert!(decode_question(1, &[]).is_err());
    }

    #[test]
    fn test_decode_question_reads_fields_after_tuple_offset() {
        let data = question_return(creator(), 2, "Question: T");
        assert_eq!(AbiReader::new(&data).uint(0).unwrap(), 32);

        let question = decode_question(1, &data).unwrap().unwrap();
        assert_eq!(question.state, QuestionState::Refunding);
        assert_eq!(question.total_staked_from_participants, 3_000_000_000_000_000);
        assert_eq!(question.correct_count, 2);
        assert_eq!(question.refund_available_at, 0);
    }

    #[test]
    fn test_decode_question_rejects_layout_without_tuple_offset() {
        let data = question_fields(creator(), 1, "Question: T");
        assert!(matches!(
            decode_question(1, &data),
            Err(AbiError::InvalidOffset { index: 0 })
        ));
    }

    #[test]
    fn test_decode_participant() {
        let data = encode(&[Token::Bool(true), Token::Uint(2), Token::Bool(false)]);
        let record = decode_participant(&data).unwrap();
        assert!(record.participated);
        assert_eq!(record.answer_index, 2);
        assert!(!record.is_correct);
    }

    #[test]
    fn test_decode_user_info_named_fields() {
        let data = user_info_return(vec![1, 4], vec![2, 3, 5]);
        let summary = decode_user_info(&data).unwrap();

        assert_eq!(summary.total_staked, 240_000_000_000_000_000);
        assert_eq!(summary.total_profit, 1_860_000_000_000_000_000);
        assert_eq!(summary.total_loss, 120_000_000_000_000_000);
        assert_eq!(summary.created_question_ids, vec![1, 4]);
        assert_eq!(summary.answered_question_ids, vec![2, 3, 5]);
    }

    #[test]
    fn test_create_question_call() {
        let args = CreateQuestionArgs {
            token: Address::ZERO,
            content: "Question: 1+1?".to_string(),
            answer_hash: [9u8; 32],
            reward_pool: 10,
            participation_fee: 1,
            start_at: 100,
            end_at: 200,
        };
        let data = create_question_call(&args);

        assert_eq!(&data[..4], &selector(CREATE_QUESTION));
        let r = AbiReader::new(&data[4..]);
        assert_eq!(r.string(1).unwrap(), "Question: 1+1?");
        assert_eq!(r.bytes32(2).unwrap(), [9u8; 32]);
        assert_eq!(r.uint64(6).unwrap(), 200);
    }
}
