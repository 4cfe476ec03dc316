//! StakeQuiz 桌面客户端后端
//! 链上题目浏览、出题提交与本地记录，前端通过 Tauri 命令调用

pub mod config;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

#[cfg(feature = "desktop")]
pub mod commands;

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use crate::config::AppConfig;
    use crate::services::database::SubmissionLedger;
    use tauri::Manager;

    tauri::Builder::default()
        .plugin(tauri_plugin_shell::init())
        .setup(|app| {
            let data_dir = app
                .path()
                .app_data_dir()
                .unwrap_or_else(|_| utils::default_data_dir());

            let config = AppConfig::load_or_init(&AppConfig::resolve_path(&data_dir))?;
            utils::setup_logging(&config.log_level, Some(&utils::log_path(&data_dir)))?;

            let ledger = SubmissionLedger::open(&utils::database_path(&data_dir))?;
            log::info!(
                "StakeQuiz {} 启动，数据目录 {}",
                env!("CARGO_PKG_VERSION"),
                data_dir.display()
            );

            app.manage(commands::QuizState::new(config, ledger));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // 钱包
            commands::wallet::connect_wallet,
            commands::wallet::disconnect_wallet,
            commands::wallet::switch_chain,
            commands::wallet::get_wallet_status,
            commands::wallet::get_network_warning,
            // 题目浏览
            commands::quiz::get_home,
            commands::quiz::get_question_details,
            commands::quiz::get_profile,
            commands::quiz::get_status_text,
            commands::quiz::decode_question_content,
            commands::quiz::resolve_route,
            // 出题
            commands::creation::new_question_draft,
            commands::creation::edit_question_draft,
            commands::creation::validate_question_draft,
            commands::creation::preview_question_draft,
            commands::creation::create_question,
            commands::creation::list_submissions,
            commands::creation::get_submission,
            commands::creation::refresh_submission,
            // QuizData
            commands::quiz_data::get_quiz_data,
            commands::quiz_data::get_user_data,
            commands::quiz_data::store_quiz_data,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
