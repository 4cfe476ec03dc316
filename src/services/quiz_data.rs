//! QuizData 键值合约
//! 个人数据按 msg.sender 存取，另有一份全局数据

use crate::models::Address;
use crate::services::abi::{encode_call, AbiError, AbiReader, Token};
use crate::services::rpc::{ContractCall, ContractReader, ContractWriter, TransactionRequest};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const STORE_DATA: &str = "storeData(string)";
pub const STORE_GLOBAL_DATA: &str = "storeGlobalData(string)";
pub const GET_DATA: &str = "getData(address)";
pub const GET_MY_DATA: &str = "getMyData()";
pub const GET_GLOBAL_DATA: &str = "getGlobalData()";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataScope {
    Personal,
    Global,
}

pub fn store_call(scope: DataScope, value: &str) -> Vec<u8> {
    let signature = match scope {
        DataScope::Personal => STORE_DATA,
        DataScope::Global => STORE_GLOBAL_DATA,
    };
    encode_call(signature, &[Token::String(value.to_string())])
}

pub fn get_data_call(user: Address) -> Vec<u8> {
    encode_call(GET_DATA, &[Token::Address(user)])
}

pub fn get_my_data_call() -> Vec<u8> {
    encode_call(GET_MY_DATA, &[])
}

pub fn get_global_data_call() -> Vec<u8> {
    encode_call(GET_GLOBAL_DATA, &[])
}

pub fn decode_string(data: &[u8]) -> Result<String, AbiError> {
    AbiReader::new(data).string(0)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDataSnapshot {
    pub my_data: Option<String>,
    pub global_data: String,
}

/// 未连接账户时只读取全局数据
pub async fn load_quiz_data<R: ContractReader>(
    reader: &R,
    contract: Address,
    account: Option<Address>,
) -> Result<QuizDataSnapshot> {
    let global_call = ContractCall::new(contract, get_global_data_call());
    let global_data = decode_string(&reader.read(&global_call).await.context("读取全局数据失败")?)?;

    let my_data = match account {
        Some(account) => {
            let call = ContractCall::new(contract, get_my_data_call()).with_from(Some(account));
            Some(decode_string(&reader.read(&call).await.context("读取个人数据失败")?)?)
        }
        None => None,
    };

    Ok(QuizDataSnapshot {
        my_data,
        global_data,
    })
}

/// 读取任意地址的个人数据
pub async fn load_data_of<R: ContractReader>(
    reader: &R,
    contract: Address,
    user: Address,
) -> Result<String> {
    let call = ContractCall::new(contract, get_data_call(user));
    Ok(decode_string(&reader.read(&call).await?)?)
}

/// 写入数据，返回交易哈希
pub async fn store<W: ContractWriter>(
    writer: &W,
    contract: Address,
    from: Address,
    scope: DataScope,
    value: &str,
) -> Result<String> {
    if value.is_empty() {
        bail!("数据不能为空");
    }

    let tx = TransactionRequest {
        from,
        to: contract,
        data: store_call(scope, value),
        value: None,
    };
    let hash = writer.send_transaction(&tx).await?;
    log::info!("数据已提交 ({:?}): {}", scope, hash);
    Ok(hash)
}
