use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Validator withdrawal as carried by execution payloads and payload attributes from Capella
/// onwards. `amount` is denominated in Gwei.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    #[serde(with = "serde_utils::u64_hex_be")]
    pub index: u64,
    #[serde(with = "serde_utils::u64_hex_be")]
    pub validator_index: u64,
    pub address: Address,
    #[serde(with = "serde_utils::u64_hex_be")]
    pub amount: u64,
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_withdrawal_json() {
        let withdrawal = Withdrawal {
            index: 1,
            validator_index: 42,
            address: address!("0x00000000000000000000000000000000000000aa"),
            amount: 32_000_000_000,
        };

        assert_eq!(
            serde_json::to_value(&withdrawal).expect("serialize"),
            json!({
                "index": "0x1",
                "validatorIndex": "0x2a",
                "address": "0x00000000000000000000000000000000000000aa",
                "amount": "0x773594000",
            })
        );
    }
}
