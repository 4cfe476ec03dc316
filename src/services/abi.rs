//! Solidity ABI 编解码
//! 只覆盖客户端用到的类型：address、uint、bool、bytes32、bytes/string、uint[]

use crate::models::Address;
use sha3::{Digest, Keccak256};
use thiserror::Error;

pub const WORD: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("return data truncated: need {needed} bytes, got {len}")]
    Truncated { needed: usize, len: usize },

    #[error("word {index} does not fit in {bits} bits")]
    Overflow { index: usize, bits: u32 },

    #[error("word {index} is not a valid bool")]
    InvalidBool { index: usize },

    #[error("invalid dynamic offset at word {index}")]
    InvalidOffset { index: usize },

    #[error("word {index} is not valid UTF-8")]
    InvalidUtf8 { index: usize },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid hex data: {0}")]
    InvalidHex(String),
}

/// 函数选择器：签名 Keccak-256 的前 4 字节
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// 编码参数
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Address(Address),
    Uint(u128),
    Bool(bool),
    FixedBytes([u8; 32]),
    Bytes(Vec<u8>),
    String(String),
    UintArray(Vec<u128>),
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn push_padded(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&uint_word(data.len() as u128));
    out.extend_from_slice(data);
    let rem = data.len() % WORD;
    if rem != 0 {
        out.extend(std::iter::repeat(0u8).take(WORD - rem));
    }
}

/// 按 head/tail 布局编码一组参数
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::Address(addr) => {
                let mut word = [0u8; WORD];
                word[12..].copy_from_slice(&addr.0);
                head.extend_from_slice(&word);
            }
            Token::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Token::Bool(value) => head.extend_from_slice(&uint_word(u128::from(*value))),
            Token::FixedBytes(bytes) => head.extend_from_slice(bytes),
            Token::Bytes(bytes) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
                push_padded(&mut tail, bytes);
            }
            Token::String(text) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
                push_padded(&mut tail, text.as_bytes());
            }
            Token::UintArray(values) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
                tail.extend_from_slice(&uint_word(values.len() as u128));
                for value in values {
                    tail.extend_from_slice(&uint_word(*value));
                }
            }
        }
    }

    head.extend(tail);
    head
}

/// 选择器 + 参数
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut data = selector(signature).to_vec();
    data.extend(encode(tokens));
    data
}

pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn from_hex(s: &str) -> Result<Vec<u8>, AbiError> {
    let body = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(body).map_err(|e| AbiError::InvalidHex(e.to_string()))
}

/// 按字（32 字节）读取返回数据
#[derive(Debug, Clone, Copy)]
pub struct AbiReader<'a> {
    data: &'a [u8],
}

impl<'a> AbiReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn slice(&self, start: usize, len: usize) -> Result<&'a [u8], AbiError> {
        let end = start.checked_add(len).ok_or(AbiError::Truncated {
            needed: usize::MAX,
            len: self.data.len(),
        })?;
        self.data.get(start..end).ok_or(AbiError::Truncated {
            needed: end,
            len: self.data.len(),
        })
    }

    fn u128_at(&self, position: usize, index: usize) -> Result<u128, AbiError> {
        let word = self.slice(position, WORD)?;
        if word[..16].iter().any(|b| *b != 0) {
            return Err(AbiError::Overflow { index, bits: 128 });
        }
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&word[16..]);
        Ok(u128::from_be_bytes(buf))
    }

    fn usize_at(&self, position: usize, index: usize) -> Result<usize, AbiError> {
        let value = self
            .u128_at(position, index)
            .map_err(|_| AbiError::InvalidOffset { index })?;
        usize::try_from(value).map_err(|_| AbiError::InvalidOffset { index })
    }

    pub fn word(&self, index: usize) -> Result<&'a [u8], AbiError> {
        self.slice(index * WORD, WORD)
    }

    pub fn uint(&self, index: usize) -> Result<u128, AbiError> {
        self.u128_at(index * WORD, index)
    }

    pub fn uint64(&self, index: usize) -> Result<u64, AbiError> {
        let value = self.uint(index)?;
        u64::try_from(value).map_err(|_| AbiError::Overflow { index, bits: 64 })
    }

    pub fn bool(&self, index: usize) -> Result<bool, AbiError> {
        match self.uint(index) {
            Ok(0) => Ok(false),
            Ok(1) => Ok(true),
            Ok(_) | Err(AbiError::Overflow { .. }) => Err(AbiError::InvalidBool { index }),
            Err(e) => Err(e),
        }
    }

    pub fn address(&self, index: usize) -> Result<Address, AbiError> {
        let word = self.word(index)?;
        if word[..12].iter().any(|b| *b != 0) {
            return Err(AbiError::Overflow { index, bits: 160 });
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word[12..]);
        Ok(Address(bytes))
    }

    pub fn bytes32(&self, index: usize) -> Result<[u8; 32], AbiError> {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.word(index)?);
        Ok(out)
    }

    /// 动态 `bytes`：第 index 个字是数据区偏移
    pub fn bytes(&self, index: usize) -> Result<Vec<u8>, AbiError> {
        let offset = self.usize_at(index * WORD, index)?;
        let len = self.usize_at(offset, index)?;
        let start = offset
            .checked_add(WORD)
            .ok_or(AbiError::InvalidOffset { index })?;
        Ok(self.slice(start, len)?.to_vec())
    }

    /// 动态元组（含 bytes/string 成员的结构体）：第 index 个字是元组起点偏移，
    /// 返回的读取器以该起点为基准，成员里的偏移也相对于它
    pub fn tuple(&self, index: usize) -> Result<AbiReader<'a>, AbiError> {
        let offset = self.usize_at(index * WORD, index)?;
        if offset % WORD != 0 || offset < (index + 1) * WORD || offset >= self.data.len() {
            return Err(AbiError::InvalidOffset { index });
        }
        Ok(AbiReader::new(&self.data[offset..]))
    }

    pub fn string(&self, index: usize) -> Result<String, AbiError> {
        String::from_utf8(self.bytes(index)?).map_err(|_| AbiError::InvalidUtf8 { index })
    }

    pub fn uint_array(&self, index: usize) -> Result<Vec<u128>, AbiError> {
        let offset = self.usize_at(index * WORD, index)?;
        let len = self.usize_at(offset, index)?;
        let body_len = len
            .checked_mul(WORD)
            .ok_or(AbiError::InvalidOffset { index })?;
        let start = offset
            .checked_add(WORD)
            .ok_or(AbiError::InvalidOffset { index })?;
        // 先确认整段数据存在，避免按伪造长度分配
        self.slice(start, body_len)?;

        (0..len)
            .map(|i| self.u128_at(start + i * WORD, index))
            .collect()
    }
}
