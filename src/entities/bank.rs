// 🏦 Bank Entity - where accounts are held
//
// A bank has many accounts and, through them, many (distinct) users.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bank {
    pub id: i64,
    pub name: String,

    /// Country the bank operates from (e.g. "USA", "Canada")
    pub country: String,
}
