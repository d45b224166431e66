use std::{error::Error, fs, path::PathBuf, process::ExitCode};

use clap::{Args as ClapArgs, Parser, Subcommand};
use time::Date;
use tracing_subscriber::EnvFilter;

use expense_tracker::{
    TransactionId,
    client::{AddOutcome, ApiClient, ClientState, DashboardText, LocalSnapshot},
    date_format::parse_date,
    export::EXPORT_FILE_NAME,
    query::TransactionFilter,
    transaction::{NewTransaction, TransactionPatch, TransactionType},
};

/// A terminal client for the expense tracker.
///
/// Keeps a local snapshot of the transactions so that they can still be
/// listed, and new ones recorded, when the server cannot be reached.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The address of the expense tracker server.
    #[arg(long, env = "EXPENSE_SERVER", default_value = "http://localhost:5000")]
    server: String,

    /// File path to the local snapshot of the transactions.
    #[arg(long, env = "EXPENSE_SNAPSHOT", default_value = "transactions.json")]
    snapshot: PathBuf,

    /// The canonical name of the local timezone, e.g. "Pacific/Auckland".
    ///
    /// Used to date transactions saved while the server is unreachable.
    #[arg(long, env = "TIMEZONE", default_value = "Etc/UTC")]
    timezone: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the transactions with the summary and the expenses by category.
    List {
        /// `YYYY-MM` or `all`.
        #[arg(long)]
        month: Option<String>,
        /// A category name or `all`.
        #[arg(long)]
        category: Option<String>,
    },
    /// Record a new transaction.
    Add {
        /// `income` or `expense`.
        #[arg(long = "type", value_parser = parse_type)]
        transaction_type: TransactionType,
        /// The amount of money spent or earned.
        #[arg(long)]
        amount: f64,
        #[command(flatten)]
        details: Details,
    },
    /// Change some fields of a transaction.
    Edit {
        /// The ID of the transaction to change.
        id: TransactionId,
        /// `income` or `expense`.
        #[arg(long = "type", value_parser = parse_type)]
        transaction_type: Option<TransactionType>,
        /// The amount of money spent or earned.
        #[arg(long)]
        amount: Option<f64>,
        #[command(flatten)]
        details: Details,
    },
    /// Delete a transaction.
    Delete {
        /// The ID of the transaction to delete.
        id: TransactionId,
    },
    /// Download every transaction as a CSV file.
    Export {
        /// Where to save the CSV file.
        #[arg(long, short, default_value = EXPORT_FILE_NAME)]
        output: PathBuf,
    },
}

#[derive(ClapArgs, Debug)]
struct Details {
    /// Defaults to "Uncategorized".
    #[arg(long)]
    category: Option<String>,
    /// `YYYY-MM-DD`, defaults to today.
    #[arg(long, value_parser = parse_date_arg)]
    date: Option<Date>,
    /// A free text description.
    #[arg(long)]
    note: Option<String>,
}

fn parse_type(text: &str) -> Result<TransactionType, String> {
    text.parse().map_err(|error: expense_tracker::Error| error.to_string())
}

fn parse_date_arg(text: &str) -> Result<Date, String> {
    parse_date(text).map_err(|error| error.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut state = match ClientState::new(
        ApiClient::new(&args.server),
        LocalSnapshot::new(args.snapshot),
    )
    .with_timezone(&args.timezone)
    {
        Ok(state) => state,
        Err(error) => {
            eprintln!("Error: {error}");
            return ExitCode::FAILURE;
        }
    };

    match run(args.command, &mut state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, state: &mut ClientState) -> Result<(), Box<dyn Error>> {
    match command {
        Command::List { month, category } => {
            let filter = TransactionFilter::parse(month.as_deref(), category.as_deref())?;
            state.refresh().await?;
            state.set_filter(filter);

            let view = state.view();
            print!(
                "{}",
                DashboardText {
                    view: &view,
                    filter: state.filter(),
                    mode: state.mode(),
                }
            );
        }
        Command::Add {
            transaction_type,
            amount,
            details,
        } => {
            // Load the snapshot first so local IDs do not clash.
            state.refresh().await?;

            let new_transaction = NewTransaction {
                transaction_type,
                amount,
                category: details.category,
                date: details.date,
                note: details.note,
            };

            match state.add(new_transaction).await? {
                AddOutcome::Saved(transaction) => {
                    println!("Added transaction {}.", transaction.id)
                }
                AddOutcome::SavedLocally {
                    transaction,
                    reason,
                } => println!(
                    "Add failed ({reason}); saved locally instead as transaction {}.",
                    transaction.id
                ),
            }
        }
        Command::Edit {
            id,
            transaction_type,
            amount,
            details,
        } => {
            let patch = TransactionPatch {
                transaction_type,
                amount,
                category: details.category,
                date: details.date,
                note: details.note,
            };

            let transaction = state.update(id, &patch).await?;
            println!("Updated transaction {}.", transaction.id);
        }
        Command::Delete { id } => {
            state.delete(id).await?;
            println!("Deleted transaction {id}.");
        }
        Command::Export { output } => {
            let csv = state.export().await?;
            fs::write(&output, csv)?;
            println!("Saved {}.", output.display());
        }
    }

    Ok(())
}
