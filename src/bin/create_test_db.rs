use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use expense_tracker::{
    initialize_db,
    transaction::{NewTransaction, TransactionType, create_transaction},
};

/// A utility for creating a test database for the expense tracker server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The number of months of sample transactions to create.
    #[arg(long, short, default_value_t = 3)]
    months: u8,
}

const MONTHLY_EXPENSES: [(&str, f64, &str); 5] = [
    ("Rent", 1200.0, "Monthly rent"),
    ("Food", 95.5, "Groceries"),
    ("Food", 42.25, "Dinner, with friends"),
    ("Transport", 60.0, ""),
    ("Utilities", 130.8, "Power and internet"),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating sample transactions...");

    let today = OffsetDateTime::now_utc().date();
    let mut count = 0;

    for month in 0..args.months {
        let month_start = today - Duration::days(30 * i64::from(month));

        create_transaction(
            NewTransaction::build(TransactionType::Income, 4200.0)
                .category("Salary")
                .date(month_start)
                .note("Pay day"),
            today,
            &conn,
        )?;
        count += 1;

        for (offset, (category, amount, note)) in MONTHLY_EXPENSES.into_iter().enumerate() {
            create_transaction(
                NewTransaction::build(TransactionType::Expense, amount)
                    .category(category)
                    .date(month_start - Duration::days(offset as i64 * 3))
                    .note(note),
                today,
                &conn,
            )?;
            count += 1;
        }
    }

    println!("Created {count} transactions. Success!");

    Ok(())
}
