use clap::{Parser, Subcommand};
use kvledger::application::ledger::BalanceLedger;
use kvledger::config::StoreConfig;
use kvledger::domain::account::Username;
use kvledger::interfaces::csv::balance_writer::BalanceWriter;
use kvledger::interfaces::csv::operation_reader::{OperationKind, OperationReader};
use kvledger::interfaces::http;
use kvledger::observability;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    store: StoreConfig,

    /// Emit logs as JSON
    #[arg(long, env = "LEDGER_LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the ledger over HTTP
    Serve {
        #[arg(long, env = "LEDGER_BIND", default_value = "0.0.0.0:8080")]
        bind: SocketAddr,
    },
    /// Apply a CSV of `op,username,amount` rows and print the final balances
    Apply {
        /// Input operations CSV file
        input: PathBuf,
    },
    /// Create an account with a zero balance (no-op if it exists)
    Create { username: String },
    /// Print an account's balance (0 if it does not exist)
    Balance { username: String },
    /// Add to an existing account's balance
    Increase {
        username: String,
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
    /// Subtract from an existing account's balance
    Decrease {
        username: String,
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
    /// Print the sum of all balances
    Total,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    observability::init(cli.log_json);

    let store = cli.store.open_store().await.into_diagnostic()?;
    let ledger = Arc::new(BalanceLedger::new(store));

    match cli.command {
        Command::Serve { bind } => {
            // `serve` closes the store itself after draining connections.
            return http::serve(ledger, bind).await.into_diagnostic();
        }
        Command::Apply { input } => apply(&ledger, input).await?,
        Command::Create { username } => {
            let username = Username::new(username).into_diagnostic()?;
            let outcome = ledger.create_account(&username).await.into_diagnostic()?;
            println!("{} {}", username, if outcome.created() { "created" } else { "exists" });
        }
        Command::Balance { username } => {
            let username = Username::new(username).into_diagnostic()?;
            println!("{}", ledger.get_balance(&username).await.into_diagnostic()?);
        }
        Command::Increase { username, amount } => {
            let username = Username::new(username).into_diagnostic()?;
            println!("{}", ledger.increment(&username, amount).await.into_diagnostic()?);
        }
        Command::Decrease { username, amount } => {
            let username = Username::new(username).into_diagnostic()?;
            println!("{}", ledger.decrement(&username, amount).await.into_diagnostic()?);
        }
        Command::Total => {
            let (total, _) = ledger.total().await.into_diagnostic()?;
            println!("{}", total);
        }
    }

    ledger.close().await.into_diagnostic()
}

async fn apply(ledger: &BalanceLedger, input: PathBuf) -> Result<()> {
    let file = File::open(input).into_diagnostic()?;
    let reader = OperationReader::new(file);
    for op_result in reader.operations() {
        let op = match op_result {
            Ok(op) => op,
            Err(e) => {
                eprintln!("Error reading operation: {}", e);
                continue;
            }
        };

        let username = match Username::new(op.username) {
            Ok(username) => username,
            Err(e) => {
                eprintln!("Error processing operation: {}", e);
                continue;
            }
        };
        let result = match (op.op, op.amount) {
            (OperationKind::Create, _) => ledger.create_account(&username).await.map(|_| ()),
            (OperationKind::Balance, _) => ledger.get_balance(&username).await.map(|_| ()),
            (OperationKind::Increase, Some(amount)) => {
                ledger.increment(&username, amount).await.map(|_| ())
            }
            (OperationKind::Decrease, Some(amount)) => {
                ledger.decrement(&username, amount).await.map(|_| ())
            }
            (_, None) => {
                eprintln!("Error processing operation: missing amount for {}", username);
                continue;
            }
        };
        if let Err(e) = result {
            eprintln!("Error processing operation [{}]: {}", e.code(), e);
        }
    }

    let accounts = ledger.accounts().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = BalanceWriter::new(stdout.lock());
    writer.write_balances(accounts).into_diagnostic()?;
    Ok(())
}
