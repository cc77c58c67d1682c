// 🏦 Ledger - users, banks and the accounts that join them
//
// User 1-N Account N-1 Bank. Every aggregate (totals, main banks,
// international funds, number one) is computed by SQL at query time.

use crate::config::BankingPolicy;
use crate::entities::{Account, AccountType, Bank, User};
use crate::error::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn bank_from_row(row: &Row) -> rusqlite::Result<Bank> {
    Ok(Bank {
        id: row.get(0)?,
        name: row.get(1)?,
        country: row.get(2)?,
    })
}

fn account_from_row(row: &Row) -> rusqlite::Result<Account> {
    let raw_type: String = row.get(3)?;
    let account_type = raw_type.parse::<AccountType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Account {
        id: row.get(0)?,
        balance: row.get(1)?,
        label: row.get(2)?,
        account_type,
        user_id: row.get(4)?,
        bank_id: row.get(5)?,
    })
}

fn required(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation(field, "must not be empty"))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Everything the bank report prints for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserReport {
    pub user: User,
    pub total_balance: f64,
    pub by_account_type: Vec<(AccountType, f64)>,
    pub main_banks: Vec<Bank>,
    pub international_funds: f64,
}

pub struct Ledger<'c> {
    conn: &'c Connection,
}

impl<'c> Ledger<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Ledger { conn }
    }

    // ========================================================================
    // USERS & BANKS
    // ========================================================================

    pub fn create_user(&self, name: &str) -> Result<User> {
        let name = required("name", name)?;
        self.conn
            .execute("INSERT INTO users (name) VALUES (?1)", params![name])?;

        let user = User {
            id: self.conn.last_insert_rowid(),
            name,
        };
        tracing::info!(user_id = user.id, "user created");
        Ok(user)
    }

    pub fn create_bank(&self, name: &str, country: &str) -> Result<Bank> {
        let name = required("name", name)?;
        let country = required("country", country)?;
        self.conn.execute(
            "INSERT INTO banks (name, country) VALUES (?1, ?2)",
            params![name, country],
        )?;

        let bank = Bank {
            id: self.conn.last_insert_rowid(),
            name,
            country,
        };
        tracing::info!(bank_id = bank.id, "bank created");
        Ok(bank)
    }

    pub fn find_user(&self, id: i64) -> Result<User> {
        self.conn
            .query_row("SELECT id, name FROM users WHERE id = ?1", params![id], user_from_row)
            .optional()?
            .ok_or_else(|| Error::not_found("user", id))
    }

    pub fn find_bank(&self, id: i64) -> Result<Bank> {
        self.conn
            .query_row(
                "SELECT id, name, country FROM banks WHERE id = ?1",
                params![id],
                bank_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("bank", id))
    }

    pub fn users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    pub fn banks(&self) -> Result<Vec<Bank>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, country FROM banks ORDER BY id")?;
        let banks = stmt
            .query_map([], bank_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(banks)
    }

    // ========================================================================
    // ACCOUNTS
    // ========================================================================

    pub fn open_account(
        &self,
        bank: &Bank,
        user: &User,
        label: &str,
        account_type: AccountType,
        opening_deposit: f64,
    ) -> Result<Account> {
        let label = required("label", label)?;
        if !opening_deposit.is_finite() {
            return Err(Error::validation("opening deposit", "must be a finite amount"));
        }

        // Surface a missing user / bank as NotFound rather than a constraint failure
        self.find_user(user.id)?;
        self.find_bank(bank.id)?;

        self.conn.execute(
            "INSERT INTO accounts (balance, label, account_type, user_id, bank_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![opening_deposit, label, account_type.as_str(), user.id, bank.id],
        )?;

        let account = Account {
            id: self.conn.last_insert_rowid(),
            balance: opening_deposit,
            label,
            account_type,
            user_id: user.id,
            bank_id: bank.id,
        };
        tracing::info!(
            account_id = account.id,
            user_id = user.id,
            bank_id = bank.id,
            "account opened"
        );
        Ok(account)
    }

    /// Write back an account's balance, label and type
    pub fn save_account(&self, account: &Account) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE accounts SET balance = ?1, label = ?2, account_type = ?3 WHERE id = ?4",
            params![
                account.balance,
                account.label,
                account.account_type.as_str(),
                account.id
            ],
        )?;

        if updated == 0 {
            return Err(Error::not_found("account", account.id));
        }
        Ok(())
    }

    pub fn accounts_for(&self, user: &User) -> Result<Vec<Account>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, balance, label, account_type, user_id, bank_id
             FROM accounts WHERE user_id = ?1 ORDER BY id",
        )?;
        let accounts = stmt
            .query_map(params![user.id], account_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(accounts)
    }

    /// One summary line per account the user holds at this bank
    pub fn accounts_summary(&self, bank: &Bank, user: &User) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, balance, label, account_type, user_id, bank_id
             FROM accounts WHERE user_id = ?1 AND bank_id = ?2 ORDER BY id",
        )?;
        let summaries = stmt
            .query_map(params![user.id, bank.id], account_from_row)?
            .map(|account| account.map(|a| a.summary()))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(summaries)
    }

    /// Delete every account this user holds at this bank. Balances are not refunded.
    pub fn blacklist(&self, bank: &Bank, user: &User) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM accounts WHERE user_id = ?1 AND bank_id = ?2",
            params![user.id, bank.id],
        )?;

        tracing::warn!(user_id = user.id, bank_id = bank.id, removed, "user blacklisted");
        Ok(removed)
    }

    // ========================================================================
    // ASSOCIATIONS (distinct through accounts)
    // ========================================================================

    pub fn banks_for(&self, user: &User) -> Result<Vec<Bank>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT b.id, b.name, b.country
             FROM banks b JOIN accounts a ON a.bank_id = b.id
             WHERE a.user_id = ?1
             ORDER BY b.id",
        )?;
        let banks = stmt
            .query_map(params![user.id], bank_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(banks)
    }

    pub fn users_for(&self, bank: &Bank) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT u.id, u.name
             FROM users u JOIN accounts a ON a.user_id = u.id
             WHERE a.bank_id = ?1
             ORDER BY u.id",
        )?;
        let users = stmt
            .query_map(params![bank.id], user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    // ========================================================================
    // AGGREGATES
    // ========================================================================

    pub fn total_balance(&self, user: &User) -> Result<f64> {
        let total: f64 = self.conn.query_row(
            "SELECT COALESCE(SUM(balance), 0.0) FROM accounts WHERE user_id = ?1",
            params![user.id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    pub fn balance_by_account_type(&self, user: &User, account_type: AccountType) -> Result<f64> {
        let total: f64 = self.conn.query_row(
            "SELECT COALESCE(SUM(balance), 0.0) FROM accounts
             WHERE user_id = ?1 AND account_type = ?2",
            params![user.id, account_type.as_str()],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Banks where the user's summed balance is strictly above `threshold`
    pub fn main_banks(&self, user: &User, threshold: f64) -> Result<Vec<Bank>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.name, b.country
             FROM banks b JOIN accounts a ON a.bank_id = b.id
             WHERE a.user_id = ?1
             GROUP BY b.id, b.name, b.country
             HAVING SUM(a.balance) > ?2
             ORDER BY b.id",
        )?;
        let banks = stmt
            .query_map(params![user.id, threshold], bank_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(banks)
    }

    /// Summed balance at banks outside `home_country`
    pub fn international_funds(&self, user: &User, home_country: &str) -> Result<f64> {
        let total: f64 = self.conn.query_row(
            "SELECT COALESCE(SUM(a.balance), 0.0)
             FROM accounts a JOIN banks b ON b.id = a.bank_id
             WHERE a.user_id = ?1 AND UPPER(TRIM(b.country)) <> UPPER(TRIM(?2))",
            params![user.id, home_country],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// The user with the largest summed balance across all accounts
    ///
    /// Ties go to the lowest user id. `None` when nobody holds an account.
    pub fn number_one(&self) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT u.id, u.name
                 FROM users u
                 JOIN (SELECT user_id, SUM(balance) AS total
                       FROM accounts GROUP BY user_id) t ON t.user_id = u.id
                 ORDER BY t.total DESC, u.id ASC
                 LIMIT 1",
                [],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn report_for(&self, user: &User, policy: &BankingPolicy) -> Result<UserReport> {
        let mut by_account_type = Vec::new();
        for account_type in AccountType::ALL {
            by_account_type.push((account_type, self.balance_by_account_type(user, account_type)?));
        }

        Ok(UserReport {
            user: user.clone(),
            total_balance: self.total_balance(user)?,
            by_account_type,
            main_banks: self.main_banks(user, policy.main_bank_threshold)?,
            international_funds: self.international_funds(user, &policy.home_country)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_main_banks_threshold() {
        let conn = setup();
        let ledger = Ledger::new(&conn);

        let user = ledger.create_user("Dakota").unwrap();
        let big = ledger.create_bank("Chase", "USA").unwrap();
        let small = ledger.create_bank("Wells Fargo", "USA").unwrap();

        ledger
            .open_account(&big, &user, "Checking", AccountType::Checking, 25_000.0)
            .unwrap();
        ledger
            .open_account(&big, &user, "Savings", AccountType::Savings, 15_000.0)
            .unwrap();
        ledger
            .open_account(&small, &user, "Checking", AccountType::Checking, 20_000.0)
            .unwrap();

        let main = ledger.main_banks(&user, 30_000.0).unwrap();
        assert_eq!(main, vec![big]);
    }

    #[test]
    fn test_main_banks_is_strictly_greater() {
        let conn = setup();
        let ledger = Ledger::new(&conn);

        let user = ledger.create_user("Dakota").unwrap();
        let bank = ledger.create_bank("Chase", "USA").unwrap();
        ledger
            .open_account(&bank, &user, "Checking", AccountType::Checking, 30_000.0)
            .unwrap();

        assert!(ledger.main_banks(&user, 30_000.0).unwrap().is_empty());
    }

    #[test]
    fn test_totals() {
        let conn = setup();
        let ledger = Ledger::new(&conn);

        let user = ledger.create_user("Dakota").unwrap();
        let other = ledger.create_user("Sam").unwrap();
        let bank = ledger.create_bank("Chase", "USA").unwrap();

        ledger
            .open_account(&bank, &user, "Everyday", AccountType::Checking, 1_500.0)
            .unwrap();
        ledger
            .open_account(&bank, &user, "Rainy day", AccountType::Savings, 3_000.0)
            .unwrap();
        ledger
            .open_account(&bank, &user, "Vacation", AccountType::Savings, 500.0)
            .unwrap();
        ledger
            .open_account(&bank, &other, "Everyday", AccountType::Checking, 9_999.0)
            .unwrap();

        assert_eq!(ledger.total_balance(&user).unwrap(), 5_000.0);
        assert_eq!(
            ledger.balance_by_account_type(&user, AccountType::Savings).unwrap(),
            3_500.0
        );
        assert_eq!(
            ledger.balance_by_account_type(&user, AccountType::Credit).unwrap(),
            0.0
        );

        let nobody = ledger.create_user("Nobody").unwrap();
        assert_eq!(ledger.total_balance(&nobody).unwrap(), 0.0);
    }

    #[test]
    fn test_international_funds() {
        let conn = setup();
        let ledger = Ledger::new(&conn);

        let user = ledger.create_user("Dakota").unwrap();
        let chase = ledger.create_bank("Chase", "USA").unwrap();
        let scotia = ledger.create_bank("Scotiabank", "Canada").unwrap();
        let hsbc = ledger.create_bank("HSBC", "UK").unwrap();

        ledger
            .open_account(&chase, &user, "Checking", AccountType::Checking, 10_000.0)
            .unwrap();
        ledger
            .open_account(&scotia, &user, "Checking", AccountType::Checking, 2_000.0)
            .unwrap();
        ledger
            .open_account(&hsbc, &user, "Savings", AccountType::Savings, 3_000.0)
            .unwrap();

        assert_eq!(ledger.international_funds(&user, "USA").unwrap(), 5_000.0);
        assert_eq!(ledger.international_funds(&user, "usa").unwrap(), 5_000.0);
        assert_eq!(ledger.international_funds(&user, "Canada").unwrap(), 13_000.0);
    }

    #[test]
    fn test_number_one() {
        let conn = setup();
        let ledger = Ledger::new(&conn);

        assert_eq!(ledger.number_one().unwrap(), None);

        let dakota = ledger.create_user("Dakota").unwrap();
        let sam = ledger.create_user("Sam").unwrap();
        let bank = ledger.create_bank("Chase", "USA").unwrap();

        ledger
            .open_account(&bank, &dakota, "Checking", AccountType::Checking, 100.0)
            .unwrap();
        ledger
            .open_account(&bank, &sam, "Checking", AccountType::Checking, 60.0)
            .unwrap();
        ledger
            .open_account(&bank, &sam, "Savings", AccountType::Savings, 50.0)
            .unwrap();

        assert_eq!(ledger.number_one().unwrap(), Some(sam.clone()));

        // Tie: the lower user id wins
        ledger
            .open_account(&bank, &dakota, "Savings", AccountType::Savings, 10.0)
            .unwrap();
        assert_eq!(ledger.number_one().unwrap(), Some(dakota));
    }

    #[test]
    fn test_blacklist_removes_only_that_pair() {
        let conn = setup();
        let ledger = Ledger::new(&conn);

        let user = ledger.create_user("Dakota").unwrap();
        let chase = ledger.create_bank("Chase", "USA").unwrap();
        let scotia = ledger.create_bank("Scotiabank", "Canada").unwrap();

        ledger
            .open_account(&chase, &user, "Checking", AccountType::Checking, 100.0)
            .unwrap();
        ledger
            .open_account(&chase, &user, "Savings", AccountType::Savings, 200.0)
            .unwrap();
        ledger
            .open_account(&scotia, &user, "Checking", AccountType::Checking, 300.0)
            .unwrap();

        assert_eq!(
            ledger.accounts_summary(&chase, &user).unwrap(),
            vec![
                "Checking (checking): $100.00".to_string(),
                "Savings (savings): $200.00".to_string()
            ]
        );

        assert_eq!(ledger.blacklist(&chase, &user).unwrap(), 2);
        assert!(ledger.accounts_summary(&chase, &user).unwrap().is_empty());
        assert_eq!(ledger.accounts_summary(&scotia, &user).unwrap().len(), 1);
        assert_eq!(ledger.banks_for(&user).unwrap(), vec![scotia]);
    }

    #[test]
    fn test_distinct_associations() {
        let conn = setup();
        let ledger = Ledger::new(&conn);

        let dakota = ledger.create_user("Dakota").unwrap();
        let sam = ledger.create_user("Sam").unwrap();
        let chase = ledger.create_bank("Chase", "USA").unwrap();

        ledger
            .open_account(&chase, &dakota, "Checking", AccountType::Checking, 1.0)
            .unwrap();
        ledger
            .open_account(&chase, &dakota, "Savings", AccountType::Savings, 1.0)
            .unwrap();
        ledger
            .open_account(&chase, &sam, "Checking", AccountType::Checking, 1.0)
            .unwrap();

        assert_eq!(ledger.banks_for(&dakota).unwrap(), vec![chase.clone()]);
        assert_eq!(ledger.users_for(&chase).unwrap(), vec![dakota, sam]);
    }

    #[test]
    fn test_open_account_errors() {
        let conn = setup();
        let ledger = Ledger::new(&conn);

        let user = ledger.create_user("Dakota").unwrap();
        let bank = ledger.create_bank("Chase", "USA").unwrap();
        let ghost = User {
            id: 404,
            name: "Ghost".to_string(),
        };

        assert!(matches!(
            ledger.open_account(&bank, &ghost, "Checking", AccountType::Checking, 1.0),
            Err(Error::NotFound { entity: "user", .. })
        ));
        assert!(matches!(
            ledger.open_account(&bank, &user, "  ", AccountType::Checking, 1.0),
            Err(Error::Validation { field: "label", .. })
        ));
        assert!(matches!(
            ledger.create_user(""),
            Err(Error::Validation { field: "name", .. })
        ));
    }

    #[test]
    fn test_save_account() {
        let conn = setup();
        let ledger = Ledger::new(&conn);

        let user = ledger.create_user("Dakota").unwrap();
        let bank = ledger.create_bank("Chase", "USA").unwrap();
        let mut account = ledger
            .open_account(&bank, &user, "Checking", AccountType::Checking, 100.0)
            .unwrap();

        account.balance = 250.0;
        ledger.save_account(&account).unwrap();
        assert_eq!(ledger.total_balance(&user).unwrap(), 250.0);
        assert_eq!(ledger.accounts_for(&user).unwrap(), vec![account.clone()]);

        ledger.blacklist(&bank, &user).unwrap();
        assert!(matches!(
            ledger.save_account(&account),
            Err(Error::NotFound { entity: "account", .. })
        ));
    }

    #[test]
    fn test_report_for() {
        let conn = setup();
        let ledger = Ledger::new(&conn);

        let user = ledger.create_user("Dakota").unwrap();
        let chase = ledger.create_bank("Chase", "USA").unwrap();
        let scotia = ledger.create_bank("Scotiabank", "Canada").unwrap();
        ledger
            .open_account(&chase, &user, "Checking", AccountType::Checking, 40_000.0)
            .unwrap();
        ledger
            .open_account(&scotia, &user, "Savings", AccountType::Savings, 20_000.0)
            .unwrap();

        let report = ledger.report_for(&user, &BankingPolicy::default()).unwrap();

        assert_eq!(report.total_balance, 60_000.0);
        assert_eq!(report.main_banks, vec![chase]);
        assert_eq!(report.international_funds, 20_000.0);
        assert!(report
            .by_account_type
            .contains(&(AccountType::Savings, 20_000.0)));
    }
}
