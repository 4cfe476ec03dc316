//! 工具函数：数据目录、日志初始化、金额与时间格式化

use chrono::{Local, TimeZone};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const WEI_PER_UNIT: u128 = 1_000_000_000_000_000_000;
const DISPLAY_STEP: u128 = WEI_PER_UNIT / 10_000;

/// 非桌面环境下的默认数据目录
pub fn default_data_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => {
            let mut path = PathBuf::from(home);
            path.push(".local/share/stakequiz");
            path
        }
        None => PathBuf::from("data"),
    }
}

pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join("stakequiz.db")
}

pub fn log_path(data_dir: &Path) -> PathBuf {
    data_dir.join("stakequiz.log")
}

/// 初始化日志：输出到 stdout，可选同时写入文件
pub fn setup_logging(level: &str, log_file: Option<&Path>) -> Result<(), fern::InitError> {
    let level = level.parse().unwrap_or(log::LevelFilter::Info);

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("reqwest", log::LevelFilter::Warn)
        .level_for("hyper", log::LevelFilter::Warn)
        .chain(std::io::stdout());

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}

/// wei 转成 4 位小数的展示金额，零显示为 "0"
pub fn format_token_amount(amount: u128) -> String {
    if amount == 0 {
        return "0".to_string();
    }

    let steps = amount.saturating_add(DISPLAY_STEP / 2) / DISPLAY_STEP;
    format!("{}.{:04}", steps / 10_000, steps % 10_000)
}

/// 本地时区展示，零表示未设置
pub fn format_timestamp(ts: u64) -> String {
    format_timestamp_in(ts, &Local)
}

pub fn format_timestamp_in<Tz>(ts: u64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    if ts == 0 {
        return "未设置".to_string();
    }

    match i64::try_from(ts).ok().and_then(|secs| tz.timestamp_opt(secs, 0).single()) {
        Some(time) => time.format("%Y/%-m/%-d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_format_token_amount() {
        assert_eq!(format_token_amount(0), "0");
        assert_eq!(format_token_amount(10_000_000_000_000_000), "0.0100");
        assert_eq!(format_token_amount(1_860_000_000_000_000_000), "1.8600");
        // 四舍五入到第 4 位
        assert_eq!(format_token_amount(123_456_000_000_000_000), "0.1235");
        assert_eq!(format_token_amount(1), "0.0000");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "未设置");
        assert_eq!(format_timestamp_in(1_700_000_000, &Utc), "2023/11/14 22:13:20");
    }

    #[test]
    fn test_data_paths() {
        let dir = PathBuf::from("/tmp/stakequiz");
        assert_eq!(database_path(&dir), PathBuf::from("/tmp/stakequiz/stakequiz.db"));
        assert_eq!(log_path(&dir), PathBuf::from("/tmp/stakequiz/stakequiz.log"));
    }
}
