use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use reqwest::Url;

use crate::client::BASE_URL;
use crate::models::Reoccurrence;

/// Command-line client for the Kontist banking API
///
/// Credentials are read from KONTIST_USER / KONTIST_PASSWORD (a .env file in
/// the current directory works too).
///
/// Examples:
///   # List accounts
///   kontist account list
///
///   # Last 20 transactions of the first account
///   kontist transaction list --limit 20
///
///   # Transfer 12.50 EUR, then confirm with the SMS token
///   kontist transfer init "Jane Doe" DE89370400440532013000 1250 "Lunch"
///   kontist transfer confirm 123456
///
///   # Download the statement for February 2017
///   kontist statement export 2017 02 -o statement.pdf
#[derive(Parser, Debug)]
#[clap(version, author = "kontist-rs contributors")]
pub struct Cli {
    #[clap(flatten)]
    pub global: GlobalArgs,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Login email
    #[arg(long, env = "KONTIST_USER", global = true)]
    pub user: Option<String>,

    /// Login password
    #[arg(long, env = "KONTIST_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// API origin
    #[arg(long, env = "KONTIST_BASE_URL", default_value = BASE_URL, value_parser = parse_url, global = true)]
    pub base_url: String,

    /// Request timeout in seconds
    #[arg(long = "timeout", default_value = "30", global = true)]
    pub timeout: u64,

    /// Directory for pending confirmation files
    #[arg(long = "state-dir", default_value = ".", global = true)]
    pub state_dir: PathBuf,

    /// Verbose mode: log requests to stderr
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Account information
    #[command(subcommand)]
    Account(AccountCommand),

    /// Information about the current user
    #[command(subcommand)]
    User(UserCommand),

    /// Booked and upcoming transactions
    #[command(subcommand)]
    Transaction(TransactionCommand),

    /// List, init or confirm transfers
    #[command(subcommand)]
    Transfer(TransferCommand),

    /// List, init, confirm or cancel standing orders
    #[command(subcommand)]
    StandingOrder(StandingOrderCommand),

    /// Monthly statements
    #[command(subcommand)]
    Statement(StatementCommand),
}

#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// List all accounts for the current user
    List,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Return all user information
    Info,
}

#[derive(Subcommand, Debug)]
pub enum TransactionCommand {
    /// List transactions
    List(TransactionListArgs),
}

#[derive(Subcommand, Debug)]
pub enum TransferCommand {
    /// List all transfers
    List(ListArgs),

    /// Search saved recipients by name or IBAN
    Suggest {
        /// Part of a name or IBAN
        query: String,
    },

    /// Initiate a transfer, amount is EUR in cents
    Init(TransferInitArgs),

    /// Confirm a transfer, using values from the previous init call unless given explicitly
    Confirm(TransferConfirmArgs),
}

#[derive(Subcommand, Debug)]
pub enum StandingOrderCommand {
    /// List standing orders
    List(AccountArg),

    /// Initiate a standing order, amount is EUR in cents
    Init(StandingOrderInitArgs),

    /// Confirm a standing order or a cancellation
    Confirm(StandingOrderConfirmArgs),

    /// Cancel a standing order
    Cancel(StandingOrderCancelArgs),
}

#[derive(Subcommand, Debug)]
pub enum StatementCommand {
    /// Download a statement, e.g. export 2017 02
    Export(StatementArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AccountArg {
    /// Account id (defaults to the first account)
    pub account_id: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Account id (defaults to the first account)
    pub account_id: Option<u64>,

    /// Maximum number of entries
    #[arg(short = 'n', long = "limit")]
    pub limit: Option<usize>,
}

impl ListArgs {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(usize::MAX)
    }
}

#[derive(Args, Debug, Clone)]
pub struct TransactionListArgs {
    #[clap(flatten)]
    pub list: ListArgs,

    /// List scheduled future transactions instead
    #[arg(long = "future")]
    pub future: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TransferInitArgs {
    pub recipient: String,

    #[arg(value_parser = parse_iban)]
    pub iban: String,

    /// Amount in cents
    #[arg(value_parser = parse_amount)]
    pub amount: u64,

    pub note: String,

    /// Account id (defaults to the first account)
    pub account_id: Option<u64>,

    /// Wait for the SMS token on stdin and confirm right away
    #[arg(short = 'a', long = "auto")]
    pub auto: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TransferConfirmArgs {
    /// Token received by SMS
    pub token: String,

    pub transfer_id: Option<String>,

    pub recipient: Option<String>,

    #[arg(value_parser = parse_iban)]
    pub iban: Option<String>,

    /// Amount in cents
    #[arg(value_parser = parse_amount)]
    pub amount: Option<u64>,

    pub note: Option<String>,

    pub account_id: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct StandingOrderInitArgs {
    pub recipient: String,

    #[arg(value_parser = parse_iban)]
    pub iban: String,

    /// Amount in cents
    #[arg(value_parser = parse_amount)]
    pub amount: u64,

    pub note: String,

    /// MONTHLY, QUARTERLY, EVERY_SIX_MONTHS or ANNUALLY
    #[arg(value_parser = parse_reoccurrence)]
    pub reoccurrence: Reoccurrence,

    /// First execution date, e.g. 2018-08-29T00:00:00+00:00
    pub start: String,

    /// Account id (defaults to the first account)
    pub account_id: Option<u64>,

    /// Wait for the SMS token on stdin and confirm right away
    #[arg(short = 'a', long = "auto")]
    pub auto: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StandingOrderConfirmArgs {
    /// Token received by SMS
    pub token: String,

    pub request_id: Option<String>,

    pub account_id: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct StandingOrderCancelArgs {
    pub standing_order_id: String,

    /// Account id (defaults to the first account)
    pub account_id: Option<u64>,

    /// Wait for the SMS token on stdin and confirm right away
    #[arg(short = 'a', long = "auto")]
    pub auto: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatementArgs {
    #[arg(value_parser = parse_year)]
    pub year: String,

    /// Month, 1-12
    #[arg(value_parser = parse_month)]
    pub month: String,

    /// Output file path
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

// ============================================================================
// Parse Function
// ============================================================================

fn parse_url(s: &str) -> Result<String> {
    let _url: Url = s.parse()?;
    Ok(s.trim_end_matches('/').into())
}

/// Strips spaces and upper-cases; checks the basic IBAN shape only.
pub fn parse_iban(s: &str) -> Result<String> {
    let iban: String = s
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();

    let shaped = iban.len() >= 15
        && iban.len() <= 34
        && iban.chars().all(|c| c.is_ascii_alphanumeric())
        && iban.chars().take(2).all(|c| c.is_ascii_alphabetic())
        && iban.chars().skip(2).take(2).all(|c| c.is_ascii_digit());
    if !shaped {
        return Err(anyhow!("Invalid IBAN: '{}'", s));
    }
    Ok(iban)
}

fn parse_amount(s: &str) -> Result<u64> {
    let amount: u64 = s
        .parse()
        .map_err(|_| anyhow!("Amount must be a whole number of cents: '{}'", s))?;
    if amount == 0 {
        return Err(anyhow!("Amount must be greater than zero"));
    }
    Ok(amount)
}

fn parse_reoccurrence(s: &str) -> Result<Reoccurrence> {
    s.parse()
}

fn parse_year(s: &str) -> Result<String> {
    if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
        Ok(s.to_string())
    } else {
        Err(anyhow!("Year must have four digits: '{}'", s))
    }
}

fn parse_month(s: &str) -> Result<String> {
    match s.parse::<u8>() {
        Ok(m @ 1..=12) => Ok(format!("{:02}", m)),
        _ => Err(anyhow!("Month must be between 1 and 12: '{}'", s)),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_url_works() {
        assert!(parse_url("abc").is_err());
        assert_eq!(
            parse_url("https://api.kontist.com/").unwrap(),
            "https://api.kontist.com"
        );
    }

    #[test]
    fn parse_iban_normalizes() {
        assert_eq!(
            parse_iban("de89 3704 0044 0532 0130 00").unwrap(),
            "DE89370400440532013000"
        );
        assert!(parse_iban("DE89").is_err());
        assert!(parse_iban("1289370400440532013000").is_err());
        assert!(parse_iban("DE89-3704-0044-0532-0130-00").is_err());
    }

    #[test]
    fn parse_amount_works() {
        assert_eq!(parse_amount("1250").unwrap(), 1250);
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("12.50").is_err());
        assert!(parse_amount("-5").is_err());
    }

    #[test]
    fn parse_month_pads() {
        assert_eq!(parse_month("2").unwrap(), "02");
        assert_eq!(parse_month("02").unwrap(), "02");
        assert_eq!(parse_month("12").unwrap(), "12");
        assert!(parse_month("13").is_err());
        assert!(parse_month("0").is_err());
        assert!(parse_year("17").is_err());
        assert_eq!(parse_year("2017").unwrap(), "2017");
    }

    #[test]
    fn cli_transfer_init() {
        let cli = Cli::try_parse_from([
            "kontist",
            "transfer",
            "init",
            "Jane Doe",
            "DE89370400440532013000",
            "1250",
            "Lunch",
            "42",
            "--auto",
        ])
        .unwrap();

        match cli.command {
            Command::Transfer(TransferCommand::Init(args)) => {
                assert_eq!(args.recipient, "Jane Doe");
                assert_eq!(args.amount, 1250);
                assert_eq!(args.account_id, Some(42));
                assert!(args.auto);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn cli_transfer_confirm_optional_positionals() {
        let cli = Cli::try_parse_from(["kontist", "transfer", "confirm", "123456"]).unwrap();
        match cli.command {
            Command::Transfer(TransferCommand::Confirm(args)) => {
                assert_eq!(args.token, "123456");
                assert_eq!(args.transfer_id, None);
                assert_eq!(args.amount, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn cli_standing_order_init() {
        let cli = Cli::try_parse_from([
            "kontist",
            "standing-order",
            "init",
            "Landlord",
            "DE89370400440532013000",
            "90000",
            "Rent",
            "MONTHLY",
            "2018-08-29T00:00:00+00:00",
        ])
        .unwrap();
        match cli.command {
            Command::StandingOrder(StandingOrderCommand::Init(args)) => {
                assert_eq!(args.reoccurrence, Reoccurrence::Monthly);
                assert_eq!(args.account_id, None);
                assert!(!args.auto);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn cli_transaction_list_flags() {
        let cli = Cli::try_parse_from([
            "kontist",
            "transaction",
            "list",
            "7",
            "--limit",
            "20",
            "--future",
            "-v",
        ])
        .unwrap();
        assert!(cli.global.verbose);
        match cli.command {
            Command::Transaction(TransactionCommand::List(args)) => {
                assert_eq!(args.list.account_id, Some(7));
                assert_eq!(args.list.limit(), 20);
                assert!(args.future);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn cli_list_without_limit_is_unbounded() {
        let cli = Cli::try_parse_from(["kontist", "transfer", "list"]).unwrap();
        match cli.command {
            Command::Transfer(TransferCommand::List(args)) => {
                assert_eq!(args.limit(), usize::MAX)
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn cli_rejects_bad_input() {
        assert!(Cli::try_parse_from(["kontist", "statement", "export", "2017", "13"]).is_err());
        assert!(Cli::try_parse_from([
            "kontist",
            "standing-order",
            "init",
            "A",
            "DE89370400440532013000",
            "1",
            "n",
            "WEEKLY",
            "2018-01-01"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["kontist"]).is_err());
    }

    #[test]
    fn cli_global_options() {
        let cli = Cli::try_parse_from([
            "kontist",
            "--base-url",
            "http://localhost:8080/",
            "--timeout",
            "5",
            "--state-dir",
            "/tmp/kontist",
            "user",
            "info",
        ])
        .unwrap();
        assert_eq!(cli.global.base_url, "http://localhost:8080");
        assert_eq!(cli.global.timeout, 5);
        assert_eq!(cli.global.state_dir, PathBuf::from("/tmp/kontist"));
    }
}
