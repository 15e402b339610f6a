//! Validation, normalization and registries behind a wallet's dapp-facing
//! provider.
//!
//! Inbound calls go through [`Dispatcher::submit`], which checks them
//! against the shared address rule, the [`TokenRegistry`] and the signature
//! normalizer before queueing them for the user. The [`AddressBook`] and
//! token registry are also usable on their own.

pub mod address;
pub mod address_book;
pub mod config;
pub mod confirmation;
pub mod dispatcher;
pub mod eip712;
pub mod error;
pub mod methods;
pub mod signature;
pub mod store;
pub mod token;
pub mod types;
pub mod window;

// Re-exports for convenience
pub use address::Address;
pub use address_book::{AddressBook, AddressBookEntry};
pub use config::CoreConfig;
pub use confirmation::{DisplayItem, DisplayModel};
pub use dispatcher::{
    Collaborators, DappCall, DappResponse, Dispatcher, NetworkSource, PermissionSource,
    RequestHandle, Signer, Submission,
};
pub use error::{Error, MissingParam, ProviderError};
pub use methods::{JsonRpcMethod, MethodRoute};
pub use signature::{SignatureMethod, SignaturePayload, SignatureRequest, SignatureVersion};
pub use store::{MemoryStore, PersistedState, StateStore};
pub use token::{Token, TokenCatalog, TokenRegistry, TokenSource};
pub use window::{ChannelRouter, WindowRequest, WindowRequestKind, WindowRouter};
