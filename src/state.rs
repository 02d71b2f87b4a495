//! Pending confirmations saved between `init` and `confirm` invocations.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::TransferDraft;

pub const TRANSFER_FILE: &str = ".transfer-tmp.json";
pub const STANDING_ORDER_FILE: &str = ".standing-order-tmp.json";

/// A record that knows which file it lives in.
pub trait Pending: Serialize + DeserializeOwned {
    const FILE: &'static str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransfer {
    pub account_id: u64,
    pub transfer_id: String,
    #[serde(flatten)]
    pub transfer: TransferDraft,
}

impl Pending for PendingTransfer {
    const FILE: &'static str = TRANSFER_FILE;
}

/// Covers both a new standing order and a cancellation; either is
/// confirmed through its request id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingStandingOrder {
    pub account_id: u64,
    pub request_id: String,
}

impl Pending for PendingStandingOrder {
    const FILE: &'static str = STANDING_ORDER_FILE;
}

#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_of<P: Pending>(&self) -> PathBuf {
        self.dir.join(P::FILE)
    }

    pub async fn save<P: Pending>(&self, record: &P) -> Result<()> {
        let path = self.path_of::<P>();
        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        debug!("saved pending record to {}", path.display());
        Ok(())
    }

    /// `Ok(None)` when nothing is pending; an error when the file exists but
    /// cannot be read or parsed.
    pub async fn load<P: Pending>(&self) -> Result<Option<P>> {
        let path = self.path_of::<P>();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read '{}'", path.display()));
            }
        };
        let record = serde_json::from_str(&data)
            .with_context(|| format!("Corrupt pending record in '{}'", path.display()))?;
        Ok(Some(record))
    }

    pub async fn remove<P: Pending>(&self) -> Result<()> {
        remove_if_exists(&self.path_of::<P>()).await
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove '{}'", path.display())),
    }
}
