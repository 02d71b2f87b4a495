//! Out-of-band delivery of confirmation tokens.
//!
//! The bank sends the token needed to confirm a transfer or standing order by
//! SMS. A [`Notifier`] is any source of such messages; the CLI plugs one in
//! for `--auto` and the client itself never knows about it.

use std::future::Future;
use std::sync::LazyLock;

use anyhow::{anyhow, Result};
use log::debug;
use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

/// Sender name the bank's SMS arrive from.
pub const BANK_SENDER: &str = "solarisbank";

// "...lautet: 123456." -> 123456
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r": ([0-9A-Za-z]+)\.").expect("token pattern is valid"));

#[derive(Debug, Clone, PartialEq)]
pub struct SmsMessage {
    /// Unknown for sources that only deliver the text.
    pub sender: Option<String>,
    pub text: String,
}

impl SmsMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            sender: None,
            text: text.into(),
        }
    }
}

pub fn extract_token(text: &str) -> Option<String> {
    TOKEN_PATTERN
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Decides which incoming message carries the token we wait for.
#[derive(Debug, Clone, Default)]
pub struct TokenFilter {
    sender: Option<String>,
    must_contain: Option<String>,
}

impl TokenFilter {
    pub fn from_bank() -> Self {
        Self {
            sender: Some(BANK_SENDER.to_string()),
            must_contain: None,
        }
    }

    /// Only accept messages that mention `needle`, e.g. the recipient IBAN.
    pub fn mentioning(mut self, needle: impl Into<String>) -> Self {
        self.must_contain = Some(needle.into());
        self
    }

    pub fn accepts(&self, msg: &SmsMessage) -> bool {
        let sender_ok = match (&self.sender, &msg.sender) {
            (Some(expected), Some(actual)) => expected.eq_ignore_ascii_case(actual),
            _ => true,
        };
        let text_ok = self
            .must_contain
            .as_deref()
            .is_none_or(|needle| msg.text.contains(needle));
        sender_ok && text_ok
    }

    pub fn token_from(&self, msg: &SmsMessage) -> Option<String> {
        if self.accepts(msg) {
            extract_token(&msg.text)
        } else {
            None
        }
    }
}

/// A source of incoming messages. `Ok(None)` means the source is closed.
pub trait Notifier {
    fn next_message(&mut self) -> impl Future<Output = Result<Option<SmsMessage>>> + Send;
}

/// Waits for the first message accepted by `filter` and returns its token.
pub async fn wait_for_token<N: Notifier>(notifier: &mut N, filter: &TokenFilter) -> Result<String> {
    while let Some(msg) = notifier.next_message().await? {
        match filter.token_from(&msg) {
            Some(token) => return Ok(token),
            None => debug!("ignoring message: {}", msg.text),
        }
    }
    Err(anyhow!("No confirmation token received before input ended"))
}

/// Reads one message per line, e.g. SMS texts pasted or piped into stdin.
pub struct LineNotifier<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin + Send> LineNotifier<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl LineNotifier<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> Notifier for LineNotifier<R> {
    async fn next_message(&mut self) -> Result<Option<SmsMessage>> {
        loop {
            match self.lines.next_line().await? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => return Ok(Some(SmsMessage::text(line.trim()))),
                None => return Ok(None),
            }
        }
    }
}
