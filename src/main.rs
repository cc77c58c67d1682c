// Only compile the board when the TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use dog_walker::{
    load_dogs_csv, open_database, seed, temporal, Config, DogRepository, DogWalkerCli, Ledger,
};
use rusqlite::Connection;
use std::env;
use std::io;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("Invalid configuration")?;

    // Logs go to stderr so they never interleave with the menus
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    tracing::info!(
        version = dog_walker::VERSION,
        environment = config.environment.as_str(),
        database = %config.database_path.display(),
        "starting dog walker"
    );

    let conn = open_database(&config.database_path)
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("seed") => run_seed(&conn)?,
        Some("import") => {
            let csv_path = args.get(2).context("Usage: dog-walker import <dogs.csv>")?;
            run_import(&conn, Path::new(csv_path))?;
        }
        Some("bank-report") => {
            let json = args.iter().any(|a| a == "--json");
            run_bank_report(&conn, &config, json)?;
        }
        Some("board") => run_board(&conn, &config)?,
        Some("menu") | None => run_menu(&conn, &config)?,
        Some(other) => {
            eprintln!("❌ Unknown command: {}", other);
            eprintln!("   Usage: dog-walker [menu | seed | import <dogs.csv> | bank-report [--json] | board]");
            std::process::exit(2);
        }
    }

    Ok(())
}

fn run_menu(conn: &Connection, config: &Config) -> Result<()> {
    let stdin = io::stdin();
    let mut cli = DogWalkerCli::new(conn, config, stdin.lock(), io::stdout());
    cli.run()?;
    Ok(())
}

fn run_seed(conn: &Connection) -> Result<()> {
    println!("🌱 Seeding sample data...");

    let summary = seed(conn, temporal::now_local())?;

    println!("✓ Dogs: {}", summary.dogs);
    println!("✓ Walks: {}", summary.walks);
    println!("✓ Feedings: {}", summary.feedings);
    println!("✓ Users: {}", summary.users);
    println!("✓ Banks: {}", summary.banks);
    println!("✓ Accounts: {}", summary.accounts);

    Ok(())
}

fn run_import(conn: &Connection, csv_path: &Path) -> Result<()> {
    println!("📂 Loading dogs from {}...", csv_path.display());
    let dogs = load_dogs_csv(csv_path)?;
    println!("✓ Loaded {} dogs from CSV", dogs.len());

    let mut repo = DogRepository::new(conn);
    let mut imported = 0;
    let mut skipped = 0;

    for attrs in dogs {
        let name = attrs.name.clone();
        match repo.create(attrs) {
            Ok(_) => imported += 1,
            Err(err) if err.is_input_error() => {
                tracing::warn!(dog = %name, error = %err, "skipping row");
                eprintln!("⚠️  Skipped {:?}: {}", name, err);
                skipped += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }

    println!("✓ Imported {} dogs ({} skipped)", imported, skipped);
    Ok(())
}

fn run_bank_report(conn: &Connection, config: &Config, json: bool) -> Result<()> {
    let ledger = Ledger::new(conn);

    let mut reports = Vec::new();
    for user in ledger.users()? {
        reports.push(ledger.report_for(&user, &config.banking)?);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!("🏦 Bank report");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for report in &reports {
        println!("\n👤 {}", report.user.name);
        println!("   Total balance: ${:.2}", report.total_balance);
        for (account_type, balance) in &report.by_account_type {
            println!("   {:<12} ${:.2}", account_type.to_string(), balance);
        }

        let main_banks: Vec<&str> = report.main_banks.iter().map(|b| b.name.as_str()).collect();
        println!(
            "   Main banks (over ${:.0}): {}",
            config.banking.main_bank_threshold,
            if main_banks.is_empty() { "none".to_string() } else { main_banks.join(", ") }
        );
        println!(
            "   Funds outside {}: ${:.2}",
            config.banking.home_country, report.international_funds
        );

        for bank in ledger.banks_for(&report.user)? {
            for line in ledger.accounts_summary(&bank, &report.user)? {
                println!("   • {}: {}", bank.name, line);
            }
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    match ledger.number_one()? {
        Some(user) => println!("🏆 Number one: {}", user.name),
        None => println!("No accounts yet. Run: dog-walker seed"),
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_board(conn: &Connection, config: &Config) -> Result<()> {
    println!("🐾 Loading dog board... (Press 'q' to quit)\n");

    let mut app = ui::App::new(conn, config.freshness)?;
    ui::run_ui(&mut app)?;

    println!("\n✅ Board closed");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_board(_conn: &Connection, _config: &Config) -> Result<()> {
    eprintln!("❌ Board not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the menus: dog-walker menu");
    std::process::exit(1);
}
