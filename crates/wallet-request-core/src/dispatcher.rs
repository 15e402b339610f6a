//! # Dapp Request Dispatcher
//!
//! Validates inbound provider calls and queues the ones that need the user.
//!
//! A queued request moves through `Queued -> {Approved | Rejected | Expired}`
//! and its dapp-facing result is settled exactly once: the oneshot sender is
//! owned by the queue entry, and every terminal path first removes the entry.
//!
//! ## Surfacing
//!
//! Requests are shown one at a time in arrival order. The front of the queue
//! is the active request; when it becomes active a timer is armed, and if the
//! UI does not report it shown within the configured timeout the request
//! expires with `RESOURCE_UNAVAILABLE`. Each entry carries a
//! `CancellationToken` that disarms its timer.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::address_book::AddressBook;
use crate::config::CoreConfig;
use crate::confirmation;
use crate::error::{Error, ProviderError};
use crate::methods::{JsonRpcMethod, MethodRoute};
use crate::signature::{self, SignaturePayload, SignatureRequest};
use crate::store::{PersistedState, StateStore};
use crate::token::{TokenRegistry, TokenSource};
use crate::types::{
    DappRequest, DappRequestParams, DappRequestType, SiteMetadata, SwitchEthereumChainParameters,
    WatchAssetConfirmParams, WatchAssetParameters,
};
use crate::window::{ProviderState, WindowRequest, WindowRouter};

/// Result delivered to the dapp.
pub type DappResponse = Result<Value, ProviderError>;

/// Chain state collaborator.
#[async_trait]
pub trait NetworkSource: Send + Sync {
    fn current_chain_id(&self) -> u64;

    fn is_known_chain(&self, chain_id: u64) -> bool;

    async fn switch_network(&self, chain_id: u64) -> Result<(), Error>;
}

/// Accounts an origin may use.
pub trait PermissionSource: Send + Sync {
    fn permitted_accounts(&self, origin: &str) -> Vec<Address>;
}

/// Keyring collaborator. Returns the hex-encoded signature.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, request: &SignatureRequest) -> Result<String, Error>;
}

/// Everything the dispatcher talks to outside this crate.
#[derive(Clone)]
pub struct Collaborators {
    pub network: Arc<dyn NetworkSource>,
    pub permissions: Arc<dyn PermissionSource>,
    pub signer: Arc<dyn Signer>,
    pub router: Arc<dyn WindowRouter>,
}

/// An inbound provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct DappCall {
    pub origin: String,
    pub site_metadata: SiteMetadata,
    pub method: String,
    pub params: Value,
}

impl DappCall {
    pub fn new(origin: &str, method: &str, params: Value) -> Self {
        Self {
            origin: origin.to_string(),
            site_metadata: SiteMetadata::default(),
            method: method.to_string(),
            params,
        }
    }

    pub fn with_site_metadata(mut self, site_metadata: SiteMetadata) -> Self {
        self.site_metadata = site_metadata;
        self
    }
}

/// Outcome of [`Dispatcher::submit`].
#[derive(Debug)]
pub enum Submission {
    /// Waiting for the user.
    Queued(RequestHandle),
    /// Not a confirmation; the caller hands it to the proxy or delegate.
    Forward {
        route: MethodRoute,
        method: JsonRpcMethod,
        params: Value,
    },
}

/// Correlated result of a queued request.
#[derive(Debug)]
pub struct RequestHandle {
    id: u64,
    rx: oneshot::Receiver<DappResponse>,
}

impl RequestHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the request to settle.
    pub async fn response(self) -> DappResponse {
        self.rx
            .await
            .unwrap_or(Err(ProviderError::ResourceUnavailable))
    }
}

struct PendingEntry {
    request: DappRequest,
    chain_id: u64,
    responder: oneshot::Sender<DappResponse>,
    timer: CancellationToken,
}

impl PendingEntry {
    /// Consumes the entry, so a request cannot be settled twice.
    fn settle(self, id: u64, response: DappResponse) {
        self.timer.cancel();
        if self.responder.send(response).is_err() {
            debug!(request_id = id, "dapp dropped its handle before settlement");
        }
    }
}

#[derive(Default)]
struct Queue {
    next_id: u64,
    order: VecDeque<u64>,
    pending: HashMap<u64, PendingEntry>,
    /// Front of `order` whose timer has been armed.
    active: Option<u64>,
}

struct Inner {
    queue: Mutex<Queue>,
    tokens: Arc<RwLock<TokenRegistry>>,
    address_book: Arc<RwLock<AddressBook>>,
    collaborators: Collaborators,
    config: CoreConfig,
}

/// Request queue shared between the provider side and the UI side.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// The address book's recent-addresses bound is taken from `config`.
    pub fn new(
        collaborators: Collaborators,
        tokens: TokenRegistry,
        mut address_book: AddressBook,
        config: CoreConfig,
    ) -> Self {
        address_book.set_recent_limit(config.recent_addresses_limit);
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(Queue::default()),
                tokens: Arc::new(RwLock::new(tokens)),
                address_book: Arc::new(RwLock::new(address_book)),
                collaborators,
                config,
            }),
        }
    }

    pub fn tokens(&self) -> Arc<RwLock<TokenRegistry>> {
        self.inner.tokens.clone()
    }

    pub fn address_book(&self) -> Arc<RwLock<AddressBook>> {
        self.inner.address_book.clone()
    }

    /// Validate `call` and either queue it or hand it back for forwarding.
    /// Invalid calls never reach the queue.
    pub async fn submit(&self, call: DappCall) -> Result<Submission, Error> {
        let method: JsonRpcMethod = call.method.parse()?;
        let route = method.route();
        let request_type = match route {
            MethodRoute::DappRequest(request_type) => request_type,
            MethodRoute::Proxy | MethodRoute::Delegated => {
                return Ok(Submission::Forward {
                    route,
                    method,
                    params: call.params,
                });
            }
            MethodRoute::Unsupported => {
                warn!(origin = %call.origin, %method, "unsupported method");
                return Err(Error::UnsupportedMethod(method.to_string()));
            }
        };

        let chain_id = self.inner.collaborators.network.current_chain_id();
        let params = match self.validate(request_type, method, &call, chain_id).await {
            Ok(params) => params,
            Err(err) => {
                warn!(origin = %call.origin, %method, error = %err, "dapp request rejected");
                return Err(err);
            }
        };

        let request = DappRequest::new(params, &call.origin, call.site_metadata);
        let handle = self.inner.enqueue(request, chain_id).await;
        Ok(Submission::Queued(handle))
    }

    async fn validate(
        &self,
        request_type: DappRequestType,
        method: JsonRpcMethod,
        call: &DappCall,
        chain_id: u64,
    ) -> Result<DappRequestParams, Error> {
        let collaborators = &self.inner.collaborators;
        match request_type {
            DappRequestType::Signing => {
                let sig_method = method
                    .signature_method()
                    .ok_or_else(|| Error::UnsupportedMethod(method.to_string()))?;
                let request = signature::normalize(sig_method, &call.params)?;

                let permitted = collaborators.permissions.permitted_accounts(&call.origin);
                if !permitted.contains(request.address()) {
                    return Err(Error::Unauthorized(format!(
                        "{} is not permitted for {}",
                        request.address(),
                        call.origin
                    )));
                }
                if let SignaturePayload::Typed(typed) = request.data() {
                    if let Some(domain_chain) = typed.domain.chain_id() {
                        if typed.domain.chain_id_u64() != Some(chain_id) {
                            return Err(Error::InvalidParams(format!(
                                "typed data chainId {domain_chain} does not match the active chain {chain_id}"
                            )));
                        }
                    }
                }
                Ok(DappRequestParams::Signing(request))
            }
            DappRequestType::Asset => {
                let params = WatchAssetParameters::from_rpc(&call.params)?;
                let account = collaborators
                    .permissions
                    .permitted_accounts(&call.origin)
                    .first()
                    .copied();
                let tokens = self.inner.tokens.read().await;
                Ok(DappRequestParams::Asset(params.validate(chain_id, &tokens, account)?))
            }
            DappRequestType::SwitchNetwork => {
                let params = SwitchEthereumChainParameters::from_rpc(&call.params)?.normalize()?;
                if params.chain_id == chain_id {
                    return Err(Error::InvalidParams(format!(
                        "chain {chain_id} is already active"
                    )));
                }
                if !collaborators.network.is_known_chain(params.chain_id) {
                    return Err(Error::InvalidParams(format!(
                        "chain {} is not a known network",
                        params.chain_id
                    )));
                }
                Ok(DappRequestParams::SwitchNetwork(params))
            }
        }
    }

    /// Approve request `id`, running its action. The dapp receives `true`
    /// for assets, `null` for network switches and the signature for
    /// signing requests; a failed action settles it with the translated
    /// error, which is also returned.
    pub async fn approve(
        &self,
        id: u64,
        confirm: Option<WatchAssetConfirmParams>,
    ) -> Result<(), Error> {
        let entry = self.inner.take(id).await.ok_or(Error::RequestNotFound(id))?;
        let collaborators = &self.inner.collaborators;

        let outcome = match &entry.request.params {
            DappRequestParams::Asset(req) => {
                let mut tokens = self.inner.tokens.write().await;
                let name = tokens
                    .lookup(entry.chain_id, &req.params.address)
                    .map(|t| t.name);
                req.to_token(name.as_deref(), confirm.as_ref())
                    .and_then(|token| tokens.add_custom_token(entry.chain_id, token))
                    .map(|()| Value::Bool(true))
            }
            DappRequestParams::SwitchNetwork(params) => collaborators
                .network
                .switch_network(params.chain_id)
                .await
                .map(|()| Value::Null),
            DappRequestParams::Signing(req) => {
                collaborators.signer.sign(req).await.map(Value::String)
            }
        };

        match outcome {
            Ok(value) => {
                info!(request_id = id, origin = %entry.request.origin, "dapp request approved");
                entry.settle(id, Ok(value));
                Ok(())
            }
            Err(err) => {
                warn!(request_id = id, error = %err, "approved dapp request failed");
                entry.settle(id, Err(ProviderError::from(&err)));
                Err(err)
            }
        }
    }

    /// The user declined request `id`.
    pub async fn reject(&self, id: u64) -> Result<(), Error> {
        let entry = self.inner.take(id).await.ok_or(Error::RequestNotFound(id))?;
        info!(request_id = id, origin = %entry.request.origin, "dapp request rejected by user");
        entry.settle(id, Err(ProviderError::UserRejectedRequest));
        Ok(())
    }

    /// The UI is showing request `id`; disarm its timeout. Only the active
    /// request can be shown, so a queued one keeps its timer for when it
    /// reaches the front.
    pub async fn surface_shown(&self, id: u64) -> Result<(), Error> {
        let queue = self.inner.queue.lock().await;
        let entry = queue.pending.get(&id).ok_or(Error::RequestNotFound(id))?;
        if queue.active != Some(id) {
            return Err(Error::RequestNotActive(id));
        }
        entry.timer.cancel();
        debug!(request_id = id, "confirmation shown");
        Ok(())
    }

    /// Expire every pending request from `origin`. Returns how many.
    pub async fn end_session(&self, origin: &str) -> usize {
        let expired = {
            let mut queue = self.inner.queue.lock().await;
            let Queue { order, pending, .. } = &mut *queue;
            let mut expired = Vec::new();
            order.retain(|id| {
                let from_origin = pending.get(id).is_some_and(|e| e.request.origin == origin);
                if from_origin {
                    if let Some(entry) = pending.remove(id) {
                        expired.push((*id, entry));
                    }
                }
                !from_origin
            });
            if !expired.is_empty() {
                self.inner.promote(&mut queue);
                self.inner.surface(&queue).await;
            }
            expired
        };

        let count = expired.len();
        for (id, entry) in expired {
            entry.settle(id, Err(ProviderError::ResourceUnavailable));
        }
        if count > 0 {
            info!(origin, count, "session ended, pending requests expired");
        }
        count
    }

    /// Pending requests in arrival order.
    pub async fn pending_requests(&self) -> Vec<(u64, DappRequest)> {
        let queue = self.inner.queue.lock().await;
        queue
            .order
            .iter()
            .filter_map(|id| queue.pending.get(id).map(|e| (*id, e.request.clone())))
            .collect()
    }

    pub async fn active_request(&self) -> Option<(u64, DappRequest)> {
        let queue = self.inner.queue.lock().await;
        let id = queue.order.front()?;
        queue.pending.get(id).map(|e| (*id, e.request.clone()))
    }

    /// Save the registries' mutable state.
    pub async fn persist(&self, store: &dyn StateStore) -> Result<(), Error> {
        let state = {
            let book = self.inner.address_book.read().await;
            let tokens = self.inner.tokens.read().await;
            PersistedState::capture(&book, &tokens)
        };
        store.save(&state).await
    }
}

impl Inner {
    async fn enqueue(self: &Arc<Self>, request: DappRequest, chain_id: u64) -> RequestHandle {
        let (tx, rx) = oneshot::channel();
        let mut queue = self.queue.lock().await;
        queue.next_id += 1;
        let id = queue.next_id;

        info!(
            request_id = id,
            origin = %request.origin,
            request_type = ?request.request_type(),
            chain_id,
            "dapp request queued"
        );
        queue.order.push_back(id);
        queue.pending.insert(
            id,
            PendingEntry {
                request,
                chain_id,
                responder: tx,
                timer: CancellationToken::new(),
            },
        );
        self.promote(&mut queue);
        self.surface(&queue).await;

        RequestHandle { id, rx }
    }

    /// Remove `id` from the queue and bring the next request forward.
    async fn take(self: &Arc<Self>, id: u64) -> Option<PendingEntry> {
        let mut queue = self.queue.lock().await;
        let entry = queue.pending.remove(&id)?;
        entry.timer.cancel();
        queue.order.retain(|queued| *queued != id);
        self.promote(&mut queue);
        self.surface(&queue).await;
        Some(entry)
    }

    /// Arm the timer of a newly active front request.
    fn promote(self: &Arc<Self>, queue: &mut Queue) {
        let front = queue.order.front().copied();
        if queue.active == front {
            return;
        }
        queue.active = front;
        if let Some(id) = front {
            if let Some(entry) = queue.pending.get(&id) {
                self.arm_timer(id, entry.timer.clone());
            }
        }
    }

    fn arm_timer(self: &Arc<Self>, id: u64, token: CancellationToken) {
        let inner: Weak<Self> = Arc::downgrade(self);
        let timeout = self.config.confirmation_timeout;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    if let Some(inner) = inner.upgrade() {
                        inner.expire(id).await;
                    }
                }
                _ = token.cancelled() => {}
            }
        });
    }

    async fn expire(self: &Arc<Self>, id: u64) {
        if let Some(entry) = self.take(id).await {
            warn!(
                request_id = id,
                origin = %entry.request.origin,
                timeout_secs = self.config.confirmation_timeout.as_secs(),
                "confirmation was never shown, request expired"
            );
            entry.settle(id, Err(ProviderError::ResourceUnavailable));
        }
    }

    /// Push the current queue to the dapp confirmation surface.
    async fn surface(&self, queue: &Queue) {
        let dapp_requests: BTreeMap<u64, DappRequest> = queue
            .pending
            .iter()
            .map(|(id, e)| (*id, e.request.clone()))
            .collect();
        let active = queue.order.front().and_then(|id| queue.pending.get(id));
        let confirmation = match active {
            Some(entry) => {
                let book = self.address_book.read().await;
                let tokens = self.tokens.read().await;
                Some(confirmation::describe(&entry.request, &book, &tokens, entry.chain_id))
            }
            None => None,
        };

        let state = ProviderState {
            active_request: queue.order.front().copied(),
            dapp_requests,
            confirmation,
        };
        if let Err(err) = self.collaborators.router.surface(WindowRequest::Dapp(state)) {
            warn!(error = %err, "failed to surface dapp requests");
        }
    }
}
