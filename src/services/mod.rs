// 服务模块
// 链上读写、内容解析、出题流程与本地记录

pub mod abi;
pub mod aggregator;
pub mod contract;
pub mod creation;
pub mod database;
pub mod network;
pub mod pages;
pub mod parser;
pub mod quiz_data;
pub mod rpc;
pub mod wallet;

pub use abi::AbiError;

pub use aggregator::{
    load_questions,
    status_text,
    AggregatedQuestions,
    QuestionFilter,
    SkippedQuestion,
    TabCounts,
};

pub use creation::{
    CreatingGuard,
    DraftConfirmation,
    DraftEdit,
    FormError,
    QuestionDraft,
    SubmissionTarget,
    SubmittedQuestion,
};

pub use database::{
    Submission,
    SubmissionLedger,
    SubmissionStatus,
};

pub use network::{NetworkWarning, SwitchAction};

pub use pages::{
    DetailsView,
    HomeView,
    ProfileView,
    QuestionCard,
};

pub use parser::{
    decode_content,
    parse_content,
    parse_content_uri,
    ParsedQuestionContent,
};

pub use quiz_data::{DataScope, QuizDataSnapshot};

pub use rpc::{
    ContractCall,
    ContractReader,
    ContractWriter,
    ReceiptUpdate,
    RpcClient,
    RpcError,
};

pub use wallet::{WalletError, WalletSession, WalletStatus};
