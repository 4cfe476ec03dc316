//! 应用配置
//! 从数据目录下的 config.json 读取；文件不存在时使用默认值

use crate::models::Address;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 覆盖配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "STAKEQUIZ_CONFIG";

const DEFAULT_QUIZ_CONTRACT: &str = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512";
const DEFAULT_QUIZ_DATA_CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

/// 单次批量读取的题目上限
pub const DEFAULT_MAX_QUESTIONS: u64 = 500;

/// u128 金额以十进制字符串存储
mod amount {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn default_address(raw: &str) -> Address {
    Address::from_str(raw).unwrap_or(Address::ZERO)
}

/// 单条链的连接信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub quiz_contract: Address,
    #[serde(default)]
    pub quiz_data_contract: Option<Address>,
}

/// 出题时使用的经济参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreationPolicy {
    /// 零地址表示原生币
    pub token: Address,
    #[serde(with = "amount")]
    pub reward_pool: u128,
    #[serde(with = "amount")]
    pub participation_fee: u128,
    pub duration_secs: u64,
}

impl Default for CreationPolicy {
    fn default() -> Self {
        Self {
            token: Address::ZERO,
            reward_pool: 10_000_000_000_000_000,      // 0.01 ETH
            participation_fee: 1_000_000_000_000_000, // 0.001 ETH
            duration_secs: 7 * 24 * 3600,
        }
    }
}

/// 交易回执轮询
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReceiptPolling {
    pub interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ReceiptPolling {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub default_chain_id: u64,
    pub networks: Vec<NetworkConfig>,
    pub creation: CreationPolicy,
    pub receipt: ReceiptPolling,
    /// questionCount 超过该值时只读取最新的这么多道题
    pub max_questions: u64,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let quiz_contract = default_address(DEFAULT_QUIZ_CONTRACT);
        let quiz_data_contract = Some(default_address(DEFAULT_QUIZ_DATA_CONTRACT));

        Self {
            default_chain_id: 31337,
            networks: vec![
                NetworkConfig {
                    chain_id: 31337,
                    name: "Hardhat".to_string(),
                    rpc_url: "http://127.0.0.1:8545".to_string(),
                    quiz_contract,
                    quiz_data_contract,
                },
                NetworkConfig {
                    chain_id: 1337,
                    name: "Localhost".to_string(),
                    rpc_url: "http://127.0.0.1:7545".to_string(),
                    quiz_contract,
                    quiz_data_contract,
                },
                NetworkConfig {
                    chain_id: 11155111,
                    name: "Sepolia".to_string(),
                    rpc_url: "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
                    quiz_contract,
                    quiz_data_contract: None,
                },
            ],
            creation: CreationPolicy::default(),
            receipt: ReceiptPolling::default(),
            max_questions: DEFAULT_MAX_QUESTIONS,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// 配置文件路径：环境变量优先，其次数据目录
    pub fn resolve_path(data_dir: &Path) -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("配置文件无效: {}", path.display()))
    }

    /// 读取配置；不存在时写出一份默认配置供用户修改
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).with_context(|| format!("写入配置文件失败: {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn network(&self, chain_id: u64) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.chain_id == chain_id)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for network in &self.networks {
            if !seen.insert(network.chain_id) {
                bail!("链 {} 重复配置", network.chain_id);
            }
            if network.rpc_url.trim().is_empty() {
                bail!("链 {} 缺少 rpcUrl", network.chain_id);
            }
        }
        if self.network(self.default_chain_id).is_none() {
            bail!("默认链 {} 未配置", self.default_chain_id);
        }
        if self.creation.duration_secs == 0 {
            bail!("creation.durationSecs 必须大于 0");
        }
        if self.receipt.interval_ms == 0 {
            bail!("receipt.intervalMs 必须大于 0");
        }
        if self.max_questions == 0 {
            bail!("maxQuestions 必须大于 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.creation.reward_pool, 10_000_000_000_000_000);
        assert!(!config.network(31337).unwrap().quiz_contract.is_zero());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AppConfig::from_json(
            r#"{ "creation": { "rewardPool": "50000000000000000", "durationSecs": 3600 } }"#,
        )
        .unwrap();

        assert_eq!(config.creation.reward_pool, 50_000_000_000_000_000);
        assert_eq!(config.creation.participation_fee, 1_000_000_000_000_000);
        assert_eq!(config.creation.duration_secs, 3600);
        assert_eq!(config.networks.len(), 3);
    }

    #[test]
    fn test_invalid_address_rejected() {
        let result = AppConfig::from_json(
            r#"{ "defaultChainId": 1, "networks": [
                { "chainId": 1, "name": "Ethereum", "rpcUrl": "http://x", "quizContract": "0x12" }
            ] }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_default_chain_must_exist() {
        let result = AppConfig::from_json(r#"{ "defaultChainId": 5 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_max_questions() {
        assert_eq!(AppConfig::default().max_questions, DEFAULT_MAX_QUESTIONS);

        let config = AppConfig::from_json(r#"{ "maxQuestions": 20 }"#).unwrap();
        assert_eq!(config.max_questions, 20);

        assert!(AppConfig::from_json(r#"{ "maxQuestions": 0 }"#).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("stakequiz-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.json");

        let created = AppConfig::load_or_init(&path).unwrap();
        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(created, loaded);

        fs::remove_dir_all(&dir).unwrap();
    }
}
