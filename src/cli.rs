use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::account::{self, AccountFilter};
use crate::engine::{self, SameColumns};
use crate::error::{Result, ToolError};
use crate::io::{self, CsvOptions};
use crate::lookup;
use crate::types::common::Dataset;

/// Collection of small CLI helpers for the accounting team.
#[derive(Parser, Debug)]
#[command(name = "toolbox", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Field delimiter used for reading and writing CSV.
    #[arg(long, global = true, default_value_t = ',')]
    pub delimiter: char,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log debug details such as every cancelling pair.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Remove cancelling in/out pairs from a CSV file.
    Dedup(DedupArgs),
    /// Find every row of the transactions that carry a given amount.
    #[command(name = "txlookup")]
    TxLookup(TxLookupArgs),
    /// Cancel duplicate transaction ids for one account over a date range.
    #[command(name = "dedupacct")]
    DedupAcct(DedupAcctArgs),
}

#[derive(Args, Debug)]
pub struct DedupArgs {
    /// CSV file to clean.
    pub input: PathBuf,

    /// Numeric column with debits (-) and credits (+).
    #[arg(long)]
    pub amount: String,

    /// Write the cleaned CSV here. An existing file is overwritten.
    #[arg(long)]
    pub out: PathBuf,

    /// Extra column whose values must be equal for two rows to cancel. May be repeated.
    #[arg(long = "match-on", value_name = "COLUMN")]
    pub match_on: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TxLookupArgs {
    /// CSV file, or directory of CSV files.
    pub path: PathBuf,

    /// Column that holds the numeric amount.
    #[arg(long)]
    pub amount_col: String,

    /// Column that holds the transaction identifier.
    #[arg(long)]
    pub tx_col: String,

    /// Exact amount to find (use a negative value for debits).
    #[arg(long, allow_negative_numbers = true)]
    pub lookup: Decimal,

    /// Write matching rows here. Defaults to stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DedupAcctArgs {
    /// CSV file, or directory of CSV files.
    pub path: PathBuf,

    /// Column holding the account number.
    #[arg(long)]
    pub acct_col: String,

    /// Account number to deduplicate.
    #[arg(long)]
    pub acct_num: String,

    /// Column with the posting date.
    #[arg(long)]
    pub date_col: String,

    /// Inclusive start date (YYYY-MM-DD).
    #[arg(long)]
    pub start: NaiveDate,

    /// Inclusive end date (YYYY-MM-DD).
    #[arg(long)]
    pub end: NaiveDate,

    /// Column with the transaction identifier.
    #[arg(long)]
    pub tx_col: String,

    /// Numeric column with debits (-) and credits (+).
    #[arg(long, default_value = "Amount")]
    pub amount_col: String,

    /// Write cleaned rows here. Defaults to stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl Cli {
    pub fn csv_options(&self) -> Result<CsvOptions> {
        if !self.delimiter.is_ascii() {
            return Err(ToolError::InvalidArgument(format!(
                "delimiter '{}' is not a single ASCII character",
                self.delimiter
            )));
        }
        Ok(CsvOptions {
            delimiter: self.delimiter as u8,
        })
    }

    /// Default log level when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    pub fn execute(self) -> Result<()> {
        let options = self.csv_options()?;
        match self.command {
            Command::Dedup(args) => execute_dedup(args, &options),
            Command::TxLookup(args) => execute_txlookup(args, &options),
            Command::DedupAcct(args) => execute_dedupacct(args, &options),
        }
    }
}

fn execute_dedup(args: DedupArgs, options: &CsvOptions) -> Result<()> {
    let dataset = io::read_dataset(&args.input, options)?;
    info!(path = %args.input.display(), rows = dataset.len(), "loaded input");

    let deduped = if args.match_on.is_empty() {
        engine::dedup(&dataset, &args.amount)?
    } else {
        let rule = SameColumns::new(&dataset, &args.match_on)?;
        engine::dedup_with(&dataset, &args.amount, &rule)?
    };
    info!(
        pairs = deduped.pairs.len(),
        removed = dataset.len() - deduped.dataset.len(),
        "found cancelling pairs"
    );

    io::write_dataset(&args.out, &deduped.dataset, options)?;
    info!(path = %args.out.display(), rows = deduped.dataset.len(), "wrote cleaned file");
    Ok(())
}

fn execute_txlookup(args: TxLookupArgs, options: &CsvOptions) -> Result<()> {
    info!(path = %args.path.display(), "scanning ledger files");
    let dataset = io::read_all(&args.path, options)?;
    let result = lookup::lookup(&dataset, &args.amount_col, &args.tx_col, args.lookup)?;
    emit(&result, args.out.as_deref(), options)
}

fn execute_dedupacct(args: DedupAcctArgs, options: &CsvOptions) -> Result<()> {
    info!(path = %args.path.display(), "loading ledger files");
    let dataset = io::read_all(&args.path, options)?;

    let filter = AccountFilter {
        acct_col: args.acct_col,
        acct_num: args.acct_num,
        date_col: args.date_col,
        start: args.start,
        end: args.end,
    };
    let result = account::dedup_account(&dataset, &filter, &args.tx_col, &args.amount_col)?;
    info!(
        matched = result.matched_rows,
        kept = result.dataset.len(),
        "filtered account rows"
    );
    debug!(dropped = ?result.dropped_tx, "dropped transactions");

    emit(&result.dataset, args.out.as_deref(), options)
}

fn emit(dataset: &Dataset, out: Option<&Path>, options: &CsvOptions) -> Result<()> {
    match out {
        Some(path) => {
            io::write_dataset(path, dataset, options)?;
            info!(path = %path.display(), rows = dataset.len(), "wrote output");
            Ok(())
        }
        None => io::write_stdout(dataset, options),
    }
}
