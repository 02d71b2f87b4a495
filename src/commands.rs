use std::time::Duration;

use anyhow::{anyhow, Result};
use log::{debug, warn};
use serde_json::Value;

use crate::auth::Credentials;
use crate::cli::{
    AccountCommand, Cli, Command, StandingOrderCancelArgs, StandingOrderCommand,
    StandingOrderConfirmArgs, StandingOrderInitArgs, StatementArgs, StatementCommand,
    TransactionCommand, TransactionListArgs, TransferCommand, TransferConfirmArgs,
    TransferInitArgs, UserCommand,
};
use crate::client::{transfer_id_from_links, ClientConfig, KontistClient, Payload};
use crate::download::{determine_filename, save_file};
use crate::models::{StandingOrderDraft, TransferDraft};
use crate::notifier::{wait_for_token, LineNotifier, Notifier, TokenFilter};
use crate::response::{spinner, Printer, Terminal};
use crate::state::{Pending, PendingStandingOrder, PendingTransfer, StateStore};
use crate::transport::Transport;

/// Logs in with the configured credentials and runs one command.
pub async fn run(cli: Cli) -> Result<()> {
    let global = &cli.global;
    let credentials = Credentials::from_parts(global.user.clone(), global.password.clone())?;

    let config = ClientConfig {
        base_url: global.base_url.clone(),
        timeout: Duration::from_secs(global.timeout),
    };
    let mut client = KontistClient::new(&config)?;
    client
        .login(&credentials.email, &credentials.password)
        .await?;

    let mut app = App {
        client,
        store: StateStore::new(&global.state_dir),
        notifier: LineNotifier::stdin(),
        printer: Terminal,
    };
    app.execute(cli.command).await
}

/// Everything a command needs: a logged-in client, the pending-state store,
/// a source of SMS tokens for `--auto` and somewhere to print to.
pub struct App<T, N, P> {
    pub client: KontistClient<T>,
    pub store: StateStore,
    pub notifier: N,
    pub printer: P,
}

impl<T: Transport, N: Notifier, P: Printer> App<T, N, P> {
    pub async fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Account(AccountCommand::List) => {
                let accounts = self.client.get_accounts().await?;
                self.printer.json(&accounts)
            }
            Command::User(UserCommand::Info) => {
                let user = self.client.get_user().await?;
                self.printer.json(&user)
            }
            Command::Transaction(TransactionCommand::List(args)) => {
                self.list_transactions(args).await
            }
            Command::Transfer(TransferCommand::List(args)) => {
                let account_id = self.account_id(args.account_id).await?;
                let pb = spinner("Fetching transfers");
                let transfers = self.client.get_transfers(account_id, args.limit()).await;
                pb.finish_and_clear();
                self.printer.json(&Value::from(transfers?))
            }
            Command::Transfer(TransferCommand::Suggest { query }) => {
                let suggestions = self.client.get_wire_transfer_suggestions(&query).await?;
                self.printer.json(&Value::from(suggestions))
            }
            Command::Transfer(TransferCommand::Init(args)) => self.init_transfer(args).await,
            Command::Transfer(TransferCommand::Confirm(args)) => {
                self.confirm_transfer(args).await
            }
            Command::StandingOrder(StandingOrderCommand::List(args)) => {
                let account_id = self.account_id(args.account_id).await?;
                let orders = self.client.get_standing_orders(account_id).await?;
                self.printer.json(&orders)
            }
            Command::StandingOrder(StandingOrderCommand::Init(args)) => {
                self.init_standing_order(args).await
            }
            Command::StandingOrder(StandingOrderCommand::Confirm(args)) => {
                self.confirm_standing_order(args).await
            }
            Command::StandingOrder(StandingOrderCommand::Cancel(args)) => {
                self.cancel_standing_order(args).await
            }
            Command::Statement(StatementCommand::Export(args)) => {
                self.export_statement(args).await
            }
        }
    }

    async fn account_id(&self, explicit: Option<u64>) -> Result<u64> {
        match explicit {
            Some(id) => Ok(id),
            None => Ok(self.client.default_account_id().await?),
        }
    }

    async fn list_transactions(&mut self, args: TransactionListArgs) -> Result<()> {
        let account_id = self.account_id(args.list.account_id).await?;
        let limit = args.list.limit();

        let pb = spinner("Fetching transactions");
        let transactions = if args.future {
            self.client.get_future_transactions(account_id, limit).await
        } else {
            self.client.get_transactions(account_id, limit).await
        };
        pb.finish_and_clear();

        self.printer.json(&Value::from(transactions?))
    }

    async fn init_transfer(&mut self, args: TransferInitArgs) -> Result<()> {
        let account_id = self.account_id(args.account_id).await?;
        let transfer = TransferDraft {
            recipient: args.recipient,
            iban: args.iban,
            amount: args.amount,
            note: args.note,
        };

        let result = self.client.initiate_transfer(account_id, &transfer).await?;
        self.printer.json(&result)?;

        let transfer_id = transfer_id_from_links(&result)
            .ok_or_else(|| anyhow!("Transfer response carries no links.self to confirm with"))?;

        if args.auto {
            let filter = TokenFilter::from_bank().mentioning(transfer.iban.clone());
            let token = self.wait_for_sms(&filter).await?;
            let confirmed = self
                .client
                .confirm_transfer(account_id, &transfer_id, &token, &transfer)
                .await?;
            return self.printer.json(&confirmed);
        }

        self.store
            .save(&PendingTransfer {
                account_id,
                transfer_id,
                transfer,
            })
            .await
    }

    async fn confirm_transfer(&mut self, args: TransferConfirmArgs) -> Result<()> {
        let saved = self.load_pending::<PendingTransfer>().await;
        let target = merge_transfer(&args, saved)?;
        let account_id = self.account_id(target.account_id).await?;

        let result = self
            .client
            .confirm_transfer(account_id, &target.transfer_id, &args.token, &target.transfer)
            .await?;
        self.printer.json(&result)?;
        self.store.remove::<PendingTransfer>().await
    }

    async fn init_standing_order(&mut self, args: StandingOrderInitArgs) -> Result<()> {
        let account_id = self.account_id(args.account_id).await?;
        let order = StandingOrderDraft {
            recipient: args.recipient,
            iban: args.iban,
            amount: args.amount,
            note: args.note,
            reoccurrence: args.reoccurrence,
            first_execution_date: args.start,
        };

        let result = self.client.initiate_standing_order(account_id, &order).await?;
        self.printer.json(&result)?;

        let filter = TokenFilter::from_bank().mentioning(order.iban.clone());
        self.finish_standing_order(account_id, &result, args.auto, &filter)
            .await
    }

    async fn cancel_standing_order(&mut self, args: StandingOrderCancelArgs) -> Result<()> {
        let account_id = self.account_id(args.account_id).await?;

        let result = self
            .client
            .init_cancel_standing_order(account_id, &args.standing_order_id)
            .await?;
        self.printer.json(&result)?;

        self.finish_standing_order(account_id, &result, args.auto, &TokenFilter::from_bank())
            .await
    }

    // Shared tail of init and cancel: confirm right away or park the request.
    async fn finish_standing_order(
        &mut self,
        account_id: u64,
        result: &Value,
        auto: bool,
        filter: &TokenFilter,
    ) -> Result<()> {
        let request_id = result
            .get("requestId")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Standing order response carries no requestId"))?
            .to_string();

        if auto {
            let token = self.wait_for_sms(filter).await?;
            let confirmed = self
                .client
                .confirm_standing_order(account_id, &request_id, &token)
                .await?;
            return self.printer.json(&confirmed);
        }

        self.store
            .save(&PendingStandingOrder {
                account_id,
                request_id,
            })
            .await
    }

    async fn confirm_standing_order(&mut self, args: StandingOrderConfirmArgs) -> Result<()> {
        let saved = self.load_pending::<PendingStandingOrder>().await;
        let (account_id, request_id) = merge_standing_order(&args, saved)?;
        let account_id = self.account_id(account_id).await?;

        let result = self
            .client
            .confirm_standing_order(account_id, &request_id, &args.token)
            .await?;
        self.printer.json(&result)?;
        self.store.remove::<PendingStandingOrder>().await
    }

    async fn export_statement(&mut self, args: StatementArgs) -> Result<()> {
        let pb = spinner("Downloading statement");
        let payload = self.client.get_statement(&args.year, &args.month).await;
        pb.finish_and_clear();

        match payload? {
            Payload::Json(value) => self.printer.json(&value),
            Payload::Binary {
                content_type,
                disposition,
                bytes,
            } => {
                let path = determine_filename(
                    args.output.as_deref(),
                    disposition.as_deref(),
                    &args.year,
                    &args.month,
                    &content_type,
                );
                save_file(&bytes, &path).await?;
                self.printer.saved(&path, bytes.len());
                Ok(())
            }
        }
    }

    async fn wait_for_sms(&mut self, filter: &TokenFilter) -> Result<String> {
        self.printer
            .notice("Waiting for the confirmation SMS, paste its text here...");
        let token = wait_for_token(&mut self.notifier, filter).await?;
        debug!("got confirmation token from SMS");
        Ok(token)
    }

    /// A missing or unreadable record is not fatal; explicit arguments may
    /// still be enough.
    async fn load_pending<R: Pending>(&self) -> Option<R> {
        match self.store.load::<R>().await {
            Ok(record) => {
                if record.is_none() {
                    debug!("no pending record in {}", self.store.path_of::<R>().display());
                }
                record
            }
            Err(e) => {
                warn!("{:#}; using command-line arguments only", e);
                None
            }
        }
    }
}

/// What `transfer confirm` will send once arguments and the saved record
/// are combined.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferTarget {
    pub account_id: Option<u64>,
    pub transfer_id: String,
    pub transfer: TransferDraft,
}

fn missing(what: &str, init: &str) -> anyhow::Error {
    anyhow!("Missing {}: pass it explicitly or run `{}` first", what, init)
}

/// Explicit arguments win over the saved record.
pub fn merge_transfer(
    args: &TransferConfirmArgs,
    saved: Option<PendingTransfer>,
) -> Result<TransferTarget> {
    let saved_draft = saved.as_ref().map(|p| &p.transfer);
    let pick = |explicit: &Option<String>, from_saved: Option<&String>, what: &str| {
        explicit
            .clone()
            .or_else(|| from_saved.cloned())
            .ok_or_else(|| missing(what, "transfer init"))
    };

    Ok(TransferTarget {
        account_id: args.account_id.or(saved.as_ref().map(|p| p.account_id)),
        transfer_id: pick(
            &args.transfer_id,
            saved.as_ref().map(|p| &p.transfer_id),
            "transfer id",
        )?,
        transfer: TransferDraft {
            recipient: pick(&args.recipient, saved_draft.map(|d| &d.recipient), "recipient")?,
            iban: pick(&args.iban, saved_draft.map(|d| &d.iban), "iban")?,
            amount: args
                .amount
                .or(saved_draft.map(|d| d.amount))
                .ok_or_else(|| missing("amount", "transfer init"))?,
            note: pick(&args.note, saved_draft.map(|d| &d.note), "note")?,
        },
    })
}

pub fn merge_standing_order(
    args: &StandingOrderConfirmArgs,
    saved: Option<PendingStandingOrder>,
) -> Result<(Option<u64>, String)> {
    let account_id = args.account_id.or(saved.as_ref().map(|p| p.account_id));
    let request_id = args
        .request_id
        .clone()
        .or(saved.map(|p| p.request_id))
        .ok_or_else(|| missing("request id", "standing-order init"))?;
    Ok((account_id, request_id))
}

// ============================================================================
// Tests
// ============================================================================
