use alloy_primitives::{Address, B256, Bytes, U64, U256};
use alloy_rlp::{
    Buf, BufMut, Decodable, EMPTY_STRING_CODE, Encodable, RlpDecodable, RlpEncodable,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BLOB_TX_TYPE: u8 = 0x03;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionDecodeError {
    #[error("Transaction {0} is empty")]
    EmptyTransaction(usize),

    #[error("Failed to decode blob transaction {index}: {message}")]
    Rlp { index: usize, message: String },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TransactionType {
    LegacyTransaction,
    AccessListTransaction,
    FeeMarketTransaction,
    BlobTransaction,
    SetCodeTransaction,
}

impl TransactionType {
    /// Classify an opaque transaction by its EIP-2718 type byte. Anything that is not a known
    /// typed envelope is treated as a legacy RLP list.
    pub fn from_transaction(transaction: &[u8]) -> Option<Self> {
        let first_byte = *transaction.first()?;
        Some(match first_byte {
            0x01 => TransactionType::AccessListTransaction,
            0x02 => TransactionType::FeeMarketTransaction,
            BLOB_TX_TYPE => TransactionType::BlobTransaction,
            0x04 => TransactionType::SetCodeTransaction,
            _ => TransactionType::LegacyTransaction,
        })
    }
}

#[derive(Default, Eq, Debug, Clone, PartialEq)]
pub enum ToAddress {
    #[default]
    Empty,
    Exists(Address),
}

impl Encodable for ToAddress {
    fn encode(&self, out: &mut dyn BufMut) {
        match self {
            ToAddress::Empty => out.put_u8(EMPTY_STRING_CODE),
            ToAddress::Exists(address) => address.encode(out),
        }
    }

    fn length(&self) -> usize {
        match self {
            ToAddress::Empty => 1,
            ToAddress::Exists(address) => address.length(),
        }
    }
}

impl Decodable for ToAddress {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        match buf.first() {
            Some(&EMPTY_STRING_CODE) => {
                buf.advance(1);
                Ok(ToAddress::Empty)
            }
            Some(_) => Ok(ToAddress::Exists(Address::decode(buf)?)),
            None => Err(alloy_rlp::Error::InputTooShort),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Eq, Serialize, Deserialize, RlpDecodable, RlpEncodable)]
#[serde(rename_all = "camelCase")]
pub struct AccessListItem {
    pub address: Address,
    pub storage_keys: Vec<B256>,
}

#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct AccessList {
    pub list: Vec<AccessListItem>,
}

impl Encodable for AccessList {
    fn encode(&self, out: &mut dyn BufMut) {
        self.list.encode(out);
    }

    fn length(&self) -> usize {
        self.list.length()
    }
}

impl Decodable for AccessList {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        Ok(Self {
            list: Decodable::decode(buf)?,
        })
    }
}

/// EIP-4844 transaction payload, without the leading type byte.
#[derive(Eq, Debug, Clone, PartialEq, RlpDecodable, RlpEncodable)]
pub struct BlobTransaction {
    pub chain_id: U256,
    pub nonce: U256,
    pub max_priority_fee_per_gas: U256,
    pub max_fee_per_gas: U256,
    pub gas_limit: U256,
    pub to: ToAddress,
    pub value: U256,
    pub data: Bytes,
    pub access_list: AccessList,
    pub max_fee_per_blob_gas: U256,
    pub blob_versioned_hashes: Vec<B256>,
    pub y_parity: U64,
    pub r: U256,
    pub s: U256,
}

impl BlobTransaction {
    /// Encode as an opaque EIP-2718 envelope, `0x03 || rlp(tx)`.
    pub fn encode_typed(&self) -> Bytes {
        let mut out = Vec::with_capacity(self.length() + 1);
        out.push(BLOB_TX_TYPE);
        self.encode(&mut out);
        out.into()
    }

    pub fn decode_typed(index: usize, transaction: &[u8]) -> Result<Self, TransactionDecodeError> {
        let mut body = transaction
            .get(1..)
            .ok_or(TransactionDecodeError::EmptyTransaction(index))?;
        BlobTransaction::decode(&mut body).map_err(|err| TransactionDecodeError::Rlp {
            index,
            message: err.to_string(),
        })
    }
}

/// Versioned hashes referenced by the blob transactions in ``transactions``, in transaction
/// order and then in order within each transaction.
pub fn blob_versioned_hashes<'a>(
    transactions: impl IntoIterator<Item = &'a Bytes>,
) -> Result<Vec<B256>, TransactionDecodeError> {
    let mut hashes = vec![];
    for (index, transaction) in transactions.into_iter().enumerate() {
        match TransactionType::from_transaction(transaction) {
            None => return Err(TransactionDecodeError::EmptyTransaction(index)),
            Some(TransactionType::BlobTransaction) => hashes
                .extend(BlobTransaction::decode_typed(index, transaction)?.blob_versioned_hashes),
            Some(_) => {}
        }
    }
    Ok(hashes)
}
