pub mod asset;
pub mod chain;
pub mod permission;
pub mod request;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;

pub use asset::{WatchAssetConfirmParams, WatchAssetParameters, WatchAssetReq, WatchAssetReqParams};
pub use chain::{
    AddEthereumChainParameter, NativeCurrency, NormalizedSwitchChainParameters,
    SwitchEthereumChainParameters,
};
pub use permission::GetPermissionResponse;
pub use request::{DappRequest, DappRequestParams, DappRequestType, SiteMetadata};

/// Read the single object parameter of a call that accepts either
/// `{...}` or `[{...}]`.
pub(crate) fn object_param<T: DeserializeOwned>(method: &str, params: &Value) -> Result<T, Error> {
    let value = match params {
        Value::Array(items) => items
            .first()
            .ok_or_else(|| Error::InvalidParams(format!("{method} expects 1 param, got 0")))?,
        other => other,
    };
    serde_json::from_value(value.clone())
        .map_err(|e| Error::InvalidParams(format!("{method}: {e}")))
}
