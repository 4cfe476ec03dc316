//! 网络守卫
//! 只有白名单内的链才解析合约地址，否则读取被抑制并提示切换网络

use crate::models::Address;
use serde::Serialize;

pub const LOCAL_CHAIN_ID: u64 = 31337;
pub const LOCALHOST_CHAIN_ID: u64 = 1337;
pub const SEPOLIA_CHAIN_ID: u64 = 11155111;

pub const SUPPORTED_CHAIN_IDS: [u64; 3] = [LOCAL_CHAIN_ID, LOCALHOST_CHAIN_ID, SEPOLIA_CHAIN_ID];

pub fn is_supported_chain(chain_id: Option<u64>) -> bool {
    chain_id.is_some_and(|id| SUPPORTED_CHAIN_IDS.contains(&id))
}

/// 不在白名单时返回 None，调用方据此不发起读取
pub fn guarded_address(chain_id: Option<u64>, address: Address) -> Option<Address> {
    is_supported_chain(chain_id).then_some(address)
}

/// 常见链名
pub fn known_chain_name(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        1 => Some("Ethereum"),
        LOCAL_CHAIN_ID => Some("Hardhat"),
        LOCALHOST_CHAIN_ID => Some("Localhost"),
        SEPOLIA_CHAIN_ID => Some("Sepolia"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchAction {
    pub chain_id: u64,
    pub label: String,
}

/// 网络警告横幅
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkWarning {
    pub chain_id: Option<u64>,
    pub chain_name: String,
    pub message: String,
    pub actions: Vec<SwitchAction>,
}

pub fn network_warning(chain_id: Option<u64>, chain_name: Option<&str>) -> Option<NetworkWarning> {
    if is_supported_chain(chain_id) {
        return None;
    }

    let chain_name = chain_name
        .map(str::to_string)
        .or_else(|| chain_id.and_then(known_chain_name).map(str::to_string))
        .unwrap_or_else(|| "未知网络".to_string());

    Some(NetworkWarning {
        chain_id,
        message: format!("当前连接的是 {}，请切换到合适的网络", chain_name),
        chain_name,
        actions: vec![
            SwitchAction {
                chain_id: LOCAL_CHAIN_ID,
                label: "切换到本地网络".to_string(),
            },
            SwitchAction {
                chain_id: SEPOLIA_CHAIN_ID,
                label: "切换到Sepolia".to_string(),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract() -> Address {
        "0x5FbDB2315678afecb367f032d93F642f64180aa3".parse().unwrap()
    }

    #[test]
    fn test_allow_list() {
        for id in [31337, 1337, 11155111] {
            assert_eq!(guarded_address(Some(id), contract()), Some(contract()));
            assert!(network_warning(Some(id), None).is_none());
        }
    }

    #[test]
    fn test_mainnet_is_guarded() {
        assert_eq!(guarded_address(Some(1), contract()), None);

        let warning = network_warning(Some(1), None).unwrap();
        assert_eq!(warning.chain_name, "Ethereum");
        let targets: Vec<u64> = warning.actions.iter().map(|a| a.chain_id).collect();
        assert_eq!(targets, vec![31337, 11155111]);
    }

    #[test]
    fn test_unknown_chain_name() {
        assert_eq!(guarded_address(None, contract()), None);
        let warning = network_warning(None, None).unwrap();
        assert_eq!(warning.chain_name, "未知网络");
        assert_eq!(warning.message, "当前连接的是 未知网络，请切换到合适的网络");
    }
}
