// 🌱 Sample data - two dogs with some history, a handful of bank accounts
//
// Seeding an already populated table is skipped, so running it twice is safe.

use crate::db::count_rows;
use crate::entities::{AccountType, NewDog};
use crate::error::Result;
use crate::ledger::Ledger;
use crate::repository::DogRepository;
use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub dogs: usize,
    pub walks: usize,
    pub feedings: usize,
    pub users: usize,
    pub banks: usize,
    pub accounts: usize,
}

pub fn seed(conn: &Connection, now: NaiveDateTime) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();
    seed_dogs(conn, now, &mut summary)?;
    seed_banking(conn, &mut summary)?;

    tracing::info!(?summary, "seed complete");
    Ok(summary)
}

fn seed_dogs(conn: &Connection, now: NaiveDateTime, summary: &mut SeedSummary) -> Result<()> {
    if count_rows(conn, "dogs")? > 0 {
        tracing::info!("dogs already present, skipping dog seeds");
        return Ok(());
    }

    let mut repo = DogRepository::new(conn);

    let mut lennon = repo.create(NewDog::new(
        "Lennon",
        "2020-08-31",
        "Pomeranian",
        "https://res.cloudinary.com/dnocv6uwb/image/upload/v1609370267/dakota-and-lennon-square-compressed_hoenfo.jpg",
    ))?;
    let mut olivia = repo.create(NewDog::new(
        "Olivia",
        "2018-03-31",
        "Terrier",
        "https://res.cloudinary.com/dnocv6uwb/image/upload/v1631229064/zx6CPsp_d_utkmww.webp",
    ))?;
    summary.dogs = 2;

    // Lennon: walked a while ago (needs a walk), fed recently
    repo.record_walk(&mut lennon, now - Duration::hours(7))?;
    repo.record_walk(&mut lennon, now - Duration::hours(10))?;
    repo.record_feeding(&mut lennon, now - Duration::minutes(30))?;

    // Olivia: just back from a walk, fed two hours ago
    repo.record_walk(&mut olivia, now - Duration::minutes(15))?;
    repo.record_feeding(&mut olivia, now - Duration::hours(2))?;

    summary.walks = 3;
    summary.feedings = 2;
    Ok(())
}

fn seed_banking(conn: &Connection, summary: &mut SeedSummary) -> Result<()> {
    if count_rows(conn, "users")? > 0 {
        tracing::info!("users already present, skipping banking seeds");
        return Ok(());
    }

    let ledger = Ledger::new(conn);

    let dakota = ledger.create_user("Dakota")?;
    let sam = ledger.create_user("Sam")?;

    let chase = ledger.create_bank("Chase", "USA")?;
    let wells = ledger.create_bank("Wells Fargo", "USA")?;
    let scotia = ledger.create_bank("Scotiabank", "Canada")?;

    let accounts = [
        (&chase, &dakota, "Everyday", AccountType::Checking, 12_500.0),
        (&chase, &dakota, "Rainy day", AccountType::Savings, 27_500.0),
        (&wells, &dakota, "Travel card", AccountType::Credit, -450.0),
        (&scotia, &dakota, "Toronto fund", AccountType::Savings, 8_000.0),
        (&wells, &sam, "Everyday", AccountType::Checking, 3_200.0),
        (&scotia, &sam, "Brokerage", AccountType::Investment, 31_000.0),
    ];

    for (bank, user, label, account_type, deposit) in accounts {
        ledger.open_account(bank, user, label, account_type, deposit)?;
    }

    summary.users = 2;
    summary.banks = 3;
    summary.accounts = accounts.len();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;
    use crate::freshness::FreshnessPolicy;
    use crate::temporal;

    #[test]
    fn test_seed_populates_and_is_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let now = temporal::parse_timestamp("2022-04-08 12:00:00").unwrap();

        let first = seed(&conn, now).unwrap();
        assert_eq!(first.dogs, 2);
        assert_eq!(first.accounts, 6);
        assert_eq!(count_rows(&conn, "dog_walks").unwrap(), 3);

        let second = seed(&conn, now).unwrap();
        assert_eq!(second, SeedSummary::default());
        assert_eq!(count_rows(&conn, "dogs").unwrap(), 2);
    }

    #[test]
    fn test_seeded_dogs_have_expected_status() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let now = temporal::parse_timestamp("2022-04-08 12:00:00").unwrap();
        seed(&conn, now).unwrap();

        let policy = FreshnessPolicy::default();
        let mut repo = DogRepository::new(&conn);

        let restless = repo.needs_walking(&policy, now).unwrap();
        assert_eq!(restless.len(), 1);
        assert_eq!(restless[0].name, "Lennon");
        assert!(repo.hungry(&policy, now).unwrap().is_empty());
    }

    #[test]
    fn test_seeded_bank_data() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let now = temporal::parse_timestamp("2022-04-08 12:00:00").unwrap();
        seed(&conn, now).unwrap();

        let ledger = Ledger::new(&conn);
        let number_one = ledger.number_one().unwrap().unwrap();
        assert_eq!(number_one.name, "Dakota");

        let main = ledger.main_banks(&number_one, 30_000.0).unwrap();
        assert_eq!(main.len(), 1);
        assert_eq!(main[0].name, "Chase");
    }
}
