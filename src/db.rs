use crate::entities::NewDog;
use crate::error::{Error, Result};
use crate::temporal;
use anyhow::Context;
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde::Deserialize;
use std::path::Path;

/// Open (creating if needed) the database file and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    setup_database(&conn)?;

    tracing::debug!(path = %path.display(), "database ready");
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Dog walker tables
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS dogs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            birthdate TEXT NOT NULL,
            breed TEXT NOT NULL DEFAULT '',
            image_url TEXT NOT NULL DEFAULT '',
            favorite_treats TEXT NOT NULL DEFAULT '[]'
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS walks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            time TEXT NOT NULL
        )",
        [],
    )?;

    // Many-to-many: a walk can take several dogs, a dog goes on many walks
    conn.execute(
        "CREATE TABLE IF NOT EXISTS dog_walks (
            dog_id INTEGER NOT NULL REFERENCES dogs(id) ON DELETE CASCADE,
            walk_id INTEGER NOT NULL REFERENCES walks(id) ON DELETE CASCADE,
            PRIMARY KEY (dog_id, walk_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS feedings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            time TEXT NOT NULL,
            dog_id INTEGER NOT NULL REFERENCES dogs(id) ON DELETE CASCADE
        )",
        [],
    )?;

    // ==========================================================================
    // Banking tables
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS banks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            country TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            balance REAL NOT NULL DEFAULT 0,
            label TEXT NOT NULL,
            account_type TEXT NOT NULL
                CHECK (account_type IN ('checking', 'savings', 'credit', 'investment')),
            user_id INTEGER NOT NULL REFERENCES users(id),
            bank_id INTEGER NOT NULL REFERENCES banks(id)
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_dog_walks_walk ON dog_walks(walk_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_feedings_dog ON feedings(dog_id, time)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_accounts_user_bank ON accounts(user_id, bank_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// ROW HELPERS
// ============================================================================

fn conversion_failure(idx: usize, err: Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    temporal::parse_timestamp(&raw).map_err(|e| conversion_failure(idx, e))
}

pub(crate) fn optional_timestamp_column(
    row: &Row,
    idx: usize,
) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| temporal::parse_timestamp(&s).map_err(|e| conversion_failure(idx, e)))
        .transpose()
}

pub(crate) fn treats_column(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_failure(idx, e.into()))
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    // Table names cannot be bound as parameters
    let known = ["dogs", "walks", "dog_walks", "feedings", "users", "banks", "accounts"];
    if !known.contains(&table) {
        return Err(Error::not_found("table", table));
    }

    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;

    Ok(count)
}

// ============================================================================
// CSV IMPORT
// ============================================================================

/// One row of a dog import file. Treats are `;`-separated.
#[derive(Debug, Deserialize)]
struct DogCsvRecord {
    name: String,
    birthdate: String,
    #[serde(default)]
    breed: String,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    favorite_treats: String,
}

impl From<DogCsvRecord> for NewDog {
    fn from(record: DogCsvRecord) -> Self {
        let mut attrs = NewDog::new(
            &record.name,
            &record.birthdate,
            &record.breed,
            &record.image_url,
        );
        attrs.favorite_treats = record
            .favorite_treats
            .split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        attrs
    }
}

pub fn load_dogs_csv(csv_path: &Path) -> anyhow::Result<Vec<NewDog>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .context("Failed to open CSV file")?;

    let mut dogs = Vec::new();

    for (line, result) in rdr.deserialize::<DogCsvRecord>().enumerate() {
        let record = result.with_context(|| format!("Failed to read dog on row {}", line + 1))?;
        dogs.push(NewDog::from(record));
    }

    Ok(dogs)
}
