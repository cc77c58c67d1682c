// 💳 Account Entity - a balance linking one user to one bank
//
// accounts.user_id → users.id
// accounts.bank_id → banks.id

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ACCOUNT TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Checking account (debit card, daily transactions)
    Checking,

    /// Savings account (interest-bearing)
    Savings,

    /// Credit card (credit line)
    Credit,

    /// Investment account (brokerage, stocks, bonds)
    Investment,
}

impl AccountType {
    pub const ALL: [AccountType; 4] = [
        AccountType::Checking,
        AccountType::Savings,
        AccountType::Credit,
        AccountType::Investment,
    ];

    /// Column value in `accounts.account_type`
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
            AccountType::Credit => "credit",
            AccountType::Investment => "investment",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let wanted = input.trim().to_lowercase();
        AccountType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                Error::parse("account type", input, "expected checking, savings, credit or investment")
            })
    }
}

// ============================================================================
// ACCOUNT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub balance: f64,
    pub label: String,
    pub account_type: AccountType,
    pub user_id: i64,
    pub bank_id: i64,
}

impl Account {
    /// One-line description used by the bank's accounts summary
    pub fn summary(&self) -> String {
        format!(
            "{} ({}): ${:.2}",
            self.label, self.account_type, self.balance
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_parse() {
        assert_eq!("savings".parse::<AccountType>().unwrap(), AccountType::Savings);
        assert_eq!(" Checking ".parse::<AccountType>().unwrap(), AccountType::Checking);

        let err = "piggy bank".parse::<AccountType>().unwrap_err();
        assert!(matches!(err, Error::Parse { what: "account type", .. }));
    }

    #[test]
    fn test_account_summary() {
        let account = Account {
            id: 1,
            balance: 1234.5,
            label: "Rainy day".to_string(),
            account_type: AccountType::Savings,
            user_id: 1,
            bank_id: 1,
        };

        assert_eq!(account.summary(), "Rainy day (savings): $1234.50");
    }
}
