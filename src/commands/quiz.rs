//! 题目浏览命令：首页、详情、个人中心

use super::QuizState;
use crate::routes::{self, ResolvedRoute};
use crate::services::aggregator::{self, QuestionFilter};
use crate::services::pages::{self, DetailsView, HomeView, ProfileView};
use crate::services::parser::{self, ParsedQuestionContent};
use tauri::State;

#[tauri::command]
pub async fn get_home(
    state: State<'_, QuizState>,
    filter: Option<QuestionFilter>,
) -> Result<HomeView, String> {
    let chain = state.snapshot().await;
    pages::load_home(
        &chain.client,
        chain.quiz_contract,
        filter.unwrap_or_default(),
        state.config.max_questions,
        chain.warning,
    )
    .await
    .map_err(|e| e.to_string())
}

/// qid 缺省为 1
#[tauri::command]
pub async fn get_question_details(
    state: State<'_, QuizState>,
    qid: Option<u64>,
) -> Result<DetailsView, String> {
    let chain = state.snapshot().await;
    pages::load_details(
        &chain.client,
        chain.quiz_contract,
        qid,
        chain.account,
        chain.warning,
    )
    .await
    .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_profile(state: State<'_, QuizState>) -> Result<ProfileView, String> {
    let chain = state.snapshot().await;
    pages::load_profile(
        &chain.client,
        chain.quiz_contract,
        chain.account,
        state.config.creation.token,
        state.config.max_questions,
        chain.warning,
    )
    .await
    .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_status_text(state: u64) -> String {
    aggregator::status_text(state).to_string()
}

#[tauri::command]
pub fn decode_question_content(content_uri: String) -> ParsedQuestionContent {
    parser::parse_content_uri(&content_uri)
}

#[tauri::command]
pub fn resolve_route(target: String) -> ResolvedRoute {
    routes::resolve(&target)
}
