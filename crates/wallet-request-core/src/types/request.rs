use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::asset::WatchAssetReq;
use super::chain::NormalizedSwitchChainParameters;
use crate::signature::SignatureRequest;

/// Kind of confirmation a dapp request needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DappRequestType {
    Asset,
    Signing,
    SwitchNetwork,
}

/// Requesting site as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SiteMetadata {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Type-specific validated parameters, serialized as `{type, params}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "params", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DappRequestParams {
    Asset(WatchAssetReq),
    Signing(SignatureRequest),
    SwitchNetwork(NormalizedSwitchChainParameters),
}

impl DappRequestParams {
    pub fn request_type(&self) -> DappRequestType {
        match self {
            DappRequestParams::Asset(_) => DappRequestType::Asset,
            DappRequestParams::Signing(_) => DappRequestType::Signing,
            DappRequestParams::SwitchNetwork(_) => DappRequestType::SwitchNetwork,
        }
    }
}

/// A validated request waiting for the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DappRequest {
    #[serde(flatten)]
    pub params: DappRequestParams,

    pub origin: String,

    #[serde(rename = "siteMetadata")]
    pub site_metadata: SiteMetadata,

    /// Unix time in milliseconds at which the request arrived.
    pub time: u64,
}

impl DappRequest {
    /// Stamp `params` with the current time.
    pub fn new(params: DappRequestParams, origin: &str, site_metadata: SiteMetadata) -> Self {
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        Self {
            params,
            origin: origin.to_string(),
            site_metadata,
            time: u64::try_from(millis).unwrap_or_default(),
        }
    }

    pub fn request_type(&self) -> DappRequestType {
        self.params.request_type()
    }

    pub fn requested_at(&self) -> Option<OffsetDateTime> {
        let nanos = i128::from(self.time) * 1_000_000;
        OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
    }
}
