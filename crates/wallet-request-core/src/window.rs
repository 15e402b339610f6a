use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::confirmation::DisplayModel;
use crate::error::Error;
use crate::types::{DappRequest, GetPermissionResponse};

/// The four confirmation surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowRequestKind {
    Dapp,
    Lock,
    Permissions,
    Transactions,
}

/// Dapp request queue as the confirmation surface sees it.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProviderState {
    #[serde(rename = "activeRequest")]
    pub active_request: Option<u64>,

    #[serde(rename = "dappRequests")]
    pub dapp_requests: BTreeMap<u64, DappRequest>,

    /// Summary of the active request.
    pub confirmation: Option<DisplayModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LockState {
    #[serde(rename = "isAppUnlocked")]
    pub is_app_unlocked: bool,

    /// Unix time in milliseconds after which the wallet locks itself.
    #[serde(rename = "lockedByTimeoutAt")]
    pub locked_by_timeout_at: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PermissionsState {
    /// Granted permissions per origin.
    pub permissions: BTreeMap<String, Vec<GetPermissionResponse>>,

    /// Origins waiting for an account-access decision, by request id.
    #[serde(rename = "permissionRequests")]
    pub permission_requests: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TransactionsState {
    /// Unapproved transactions by id, opaque to this crate.
    #[serde(rename = "unapprovedTransactions")]
    pub unapproved_transactions: BTreeMap<String, Value>,
}

/// A request to bring one surface to the front, with its state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowRequest {
    Dapp(ProviderState),
    Lock(LockState),
    Permissions(PermissionsState),
    Transactions(TransactionsState),
}

impl WindowRequest {
    pub fn kind(&self) -> WindowRequestKind {
        match self {
            WindowRequest::Dapp(_) => WindowRequestKind::Dapp,
            WindowRequest::Lock(_) => WindowRequestKind::Lock,
            WindowRequest::Permissions(_) => WindowRequestKind::Permissions,
            WindowRequest::Transactions(_) => WindowRequestKind::Transactions,
        }
    }
}

/// Window-management collaborator. Shows exactly one surface at a time.
pub trait WindowRouter: Send + Sync {
    fn surface(&self, request: WindowRequest) -> Result<(), Error>;
}

/// Forwards window requests to a channel drained by the UI side.
#[derive(Debug, Clone)]
pub struct ChannelRouter {
    tx: mpsc::UnboundedSender<WindowRequest>,
}

impl ChannelRouter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WindowRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl WindowRouter for ChannelRouter {
    fn surface(&self, request: WindowRequest) -> Result<(), Error> {
        let kind = request.kind();
        self.tx
            .send(request)
            .map_err(|_| Error::Window(format!("{kind:?} surface receiver closed")))?;
        debug!(?kind, "window request sent");
        Ok(())
    }
}
