use serde::{Deserialize, Serialize};

use crate::types::{Address, Balance, Nonce};

/// On-chain account state. Created implicitly (zero balance, zero nonce) on
/// first reference by a transfer or patch-submit credit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    pub balance: Balance,
    pub nonce: Nonce,
}

impl Account {
    pub fn zero(address: Address) -> Self {
        Self {
            address,
            balance: 0,
            nonce: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_account_has_no_balance_or_nonce() {
        let a = Account::zero(Address::from_bytes([1u8; 20]));
        assert_eq!(a.balance, 0);
        assert_eq!(a.nonce, 0);
    }
}
