// Dog Walker - Core Library
// Exposes all modules for use in the CLI, the board and tests

pub mod cli;        // Interactive menus
pub mod config;     // Environment-driven settings
pub mod db;         // Schema + row helpers + CSV import
pub mod entities;   // Dogs, walks, feedings, users, banks, accounts
pub mod error;
pub mod freshness;  // "Has it been too long?" rule
pub mod ledger;     // Banking queries
pub mod repository; // Cached dog store
pub mod seed;
pub mod temporal;   // Timestamps + age buckets

// Re-export commonly used types
pub use cli::DogWalkerCli;
pub use config::{BankingPolicy, Config, Environment};
pub use db::{count_rows, load_dogs_csv, open_database, setup_database};
pub use entities::{
    Account, AccountType,
    Bank, User,
    Dog, DogStatus, NewDog,
    Feeding, Walk,
};
pub use error::{Error, Result};
pub use freshness::{is_stale, FreshnessPolicy};
pub use ledger::{Ledger, UserReport};
pub use repository::DogRepository;
pub use seed::{seed, SeedSummary};
pub use temporal::Age;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
