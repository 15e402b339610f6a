//! Human-readable summary of a pending dapp request.

use serde::Serialize;
use serde_json::Value;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::address::Address;
use crate::address_book::AddressBook;
use crate::eip712::{TypedMessage, V1TypedData};
use crate::signature::{SignaturePayload, SignatureRequest};
use crate::token::{native_token, TokenRegistry, TokenSource};
use crate::types::{DappRequest, DappRequestParams, NormalizedSwitchChainParameters, WatchAssetReq};

/// What the user is asked to confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayModel {
    pub intent: String,
    pub entries: Vec<DisplayItem>,
    pub warnings: Vec<String>,
}

/// A single label+value pair for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayItem {
    pub label: String,
    pub value: String,
}

/// Known chain IDs → human-readable names.
pub fn chain_name(chain_id: u64) -> String {
    match chain_id {
        1 => "Ethereum".to_string(),
        5 => "Goerli".to_string(),
        10 => "Optimism".to_string(),
        56 => "BNB Chain".to_string(),
        100 => "Gnosis".to_string(),
        137 => "Polygon".to_string(),
        250 => "Fantom".to_string(),
        8453 => "Base".to_string(),
        42161 => "Arbitrum One".to_string(),
        43114 => "Avalanche".to_string(),
        11155111 => "Sepolia".to_string(),
        _ => format!("Chain {chain_id}"),
    }
}

/// Rendering context passed through the builders.
struct RenderContext<'a> {
    chain_id: u64,
    address_book: &'a AddressBook,
    tokens: &'a TokenRegistry,
    entries: Vec<DisplayItem>,
    warnings: Vec<String>,
}

impl RenderContext<'_> {
    fn push(&mut self, label: &str, value: impl Into<String>) {
        self.entries.push(DisplayItem {
            label: label.to_string(),
            value: value.into(),
        });
    }

    /// Checksummed address with its address-book name or token symbol.
    fn address_label(&self, address: &Address) -> Option<String> {
        let checksum = address.to_checksum();
        if let Some(name) = self.address_book.resolve_name(address) {
            return Some(format!("{name} ({checksum})"));
        }
        self.tokens
            .lookup(self.chain_id, address)
            .map(|token| format!("{} ({checksum})", token.symbol))
    }

    fn push_address(&mut self, label: &str, address: &Address, warn_unknown: bool) {
        match self.address_label(address) {
            Some(value) => self.push(label, value),
            None => {
                let checksum = address.to_checksum();
                if warn_unknown {
                    self.warnings.push(format!("{label}: unrecognized address {checksum}"));
                }
                self.push(label, checksum);
            }
        }
    }
}

/// Build the confirmation payload for `request` on the current `chain_id`.
pub fn describe(
    request: &DappRequest,
    address_book: &AddressBook,
    tokens: &TokenRegistry,
    chain_id: u64,
) -> DisplayModel {
    let mut ctx = RenderContext {
        chain_id,
        address_book,
        tokens,
        entries: Vec::new(),
        warnings: Vec::new(),
    };

    let site = if request.site_metadata.name.is_empty() {
        request.origin.clone()
    } else {
        request.site_metadata.name.clone()
    };
    ctx.push("Site", site);
    ctx.push("Origin", request.origin.as_str());
    if let Some(at) = request.requested_at() {
        ctx.push("Requested", format_time(at));
    }

    let intent = match &request.params {
        DappRequestParams::Asset(req) => describe_asset(&mut ctx, req),
        DappRequestParams::SwitchNetwork(params) => describe_switch(&mut ctx, params),
        DappRequestParams::Signing(req) => describe_signature(&mut ctx, req),
    };

    DisplayModel {
        intent,
        entries: ctx.entries,
        warnings: ctx.warnings,
    }
}

fn format_time(at: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");
    at.format(&format)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

fn describe_asset(ctx: &mut RenderContext<'_>, req: &WatchAssetReq) -> String {
    let params = &req.params;
    ctx.push("Network", chain_name(ctx.chain_id));
    ctx.push("Token", params.symbol.as_str());
    ctx.push("Contract", params.address.to_checksum());
    ctx.push("Decimals", params.decimals.to_string());
    if let Some(image) = &params.image {
        ctx.push("Image", image.as_str());
    }
    if let Some(account) = req.account_address {
        ctx.push_address("Account", &account, false);
    }

    if ctx.tokens.get_tokens(ctx.chain_id).get(&params.address).is_none() {
        ctx.warnings
            .push(format!("{} is not in the known token list", params.symbol));
    }

    match &req.saved_token {
        Some(saved) => {
            if saved.symbol != params.symbol {
                ctx.push("Current symbol", saved.symbol.as_str());
            }
            if saved.decimals != params.decimals {
                ctx.push("Current decimals", saved.decimals.to_string());
            }
            format!("Update {}", saved.symbol)
        }
        None => format!("Add {}", params.symbol),
    }
}

fn describe_switch(ctx: &mut RenderContext<'_>, params: &NormalizedSwitchChainParameters) -> String {
    ctx.push("From", chain_name(ctx.chain_id));
    ctx.push("To", chain_name(params.chain_id));
    ctx.push("Currency", native_token(params.chain_id).symbol);
    format!("Switch to {}", chain_name(params.chain_id))
}

fn describe_signature(ctx: &mut RenderContext<'_>, req: &SignatureRequest) -> String {
    ctx.push_address("Account", req.address(), false);
    match req.data() {
        SignaturePayload::Message(message) => {
            ctx.push("Message", render_message(req.data(), message));
            "Sign message".to_string()
        }
        SignaturePayload::TypedDataV1(entries) => {
            describe_v1(ctx, entries);
            "Sign typed data".to_string()
        }
        SignaturePayload::Typed(typed) => describe_typed(ctx, typed),
    }
}

/// UTF-8 text when the message decodes to it, the raw string otherwise.
fn render_message(payload: &SignaturePayload, raw: &str) -> String {
    payload
        .message_bytes()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| raw.to_string())
}

fn describe_v1(ctx: &mut RenderContext<'_>, entries: &[V1TypedData]) {
    for entry in entries {
        render_field(ctx, &entry.name, &entry.field_type, &entry.value);
    }
}

fn describe_typed(ctx: &mut RenderContext<'_>, typed: &TypedMessage) -> String {
    let domain = &typed.domain;
    if let Some(name) = domain.name() {
        ctx.push("Domain", name);
    }
    if domain.chain_id().is_some() {
        match domain.chain_id_u64() {
            Some(id) => {
                ctx.push("Network", chain_name(id));
                if id != ctx.chain_id {
                    ctx.warnings.push(format!(
                        "domain chain id {id} does not match the current network {}",
                        ctx.chain_id
                    ));
                }
            }
            None => ctx.warnings.push("domain chain id is not a number".to_string()),
        }
    }
    if let Some(contract) = domain.verifying_contract_address() {
        ctx.push_address("Contract", &contract, true);
    }

    for field in typed.primary_fields() {
        if let Some(value) = typed.message.get(&field.name) {
            render_field(ctx, &field.name, &field.field_type, value);
        }
    }

    match domain.name() {
        Some(name) => format!("Sign {} for {name}", typed.primary_type),
        None => format!("Sign {}", typed.primary_type),
    }
}

fn render_field(ctx: &mut RenderContext<'_>, label: &str, field_type: &str, value: &Value) {
    if field_type == "address" {
        if let Some(address) = value.as_str().and_then(|s| s.parse::<Address>().ok()) {
            ctx.push_address(label, &address, true);
            return;
        }
    }
    ctx.push(label, render_value(value));
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::signature::{self, SignatureMethod};
    use crate::token::TokenCatalog;
    use crate::types::SiteMetadata;
    use crate::types::WatchAssetParameters;

    const ACCOUNT: &str = "0x2231234435344D865C8966f4945844843EDAff91";
    const DAI: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";

    fn request(params: DappRequestParams) -> DappRequest {
        DappRequest {
            params,
            origin: "https://app.example.org".to_string(),
            site_metadata: SiteMetadata {
                name: "Example".to_string(),
                icon: None,
            },
            time: 1_700_000_000_000,
        }
    }

    fn value_of<'a>(model: &'a DisplayModel, label: &str) -> Option<&'a str> {
        model
            .entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.value.as_str())
    }

    #[test]
    fn test_personal_sign() {
        let mut book = AddressBook::empty();
        book.set(ACCOUNT, "Main", None).unwrap();
        let tokens = TokenRegistry::new(TokenCatalog::bundled().unwrap());

        let sig = signature::normalize(
            SignatureMethod::PersonalSign,
            &json!(["0x48656c6c6f20776f726c64", ACCOUNT]),
        )
        .unwrap();
        let model = describe(&request(DappRequestParams::Signing(sig)), &book, &tokens, 1);

        assert_eq!(model.intent, "Sign message");
        assert_eq!(value_of(&model, "Message"), Some("Hello world"));
        let checksum = ACCOUNT.parse::<Address>().unwrap().to_checksum();
        assert_eq!(value_of(&model, "Account"), Some(format!("Main ({checksum})").as_str()));
        assert_eq!(value_of(&model, "Requested"), Some("2023-11-14 22:13:20 UTC"));
        assert_eq!(value_of(&model, "Site"), Some("Example"));
    }

    #[test]
    fn test_typed_data_labels_and_warnings() {
        let book = AddressBook::empty();
        let tokens = TokenRegistry::new(TokenCatalog::bundled().unwrap());

        let payload = json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" }
                ],
                "Permit": [
                    { "name": "spender", "type": "address" },
                    { "name": "value", "type": "uint256" }
                ]
            },
            "primaryType": "Permit",
            "domain": { "name": "Dai Stablecoin", "chainId": "5", "verifyingContract": DAI },
            "message": { "spender": ACCOUNT, "value": "1000" }
        });
        let sig = signature::normalize(SignatureMethod::SignTypedDataV4, &json!([ACCOUNT, payload]))
            .unwrap();
        let model = describe(&request(DappRequestParams::Signing(sig)), &book, &tokens, 1);

        assert_eq!(model.intent, "Sign Permit for Dai Stablecoin");
        assert_eq!(value_of(&model, "Contract"), Some(format!("DAI ({DAI})").as_str()));
        let spender = ACCOUNT.parse::<Address>().unwrap().to_checksum();
        assert_eq!(value_of(&model, "spender"), Some(spender.as_str()));
        assert_eq!(value_of(&model, "value"), Some("1000"));
        assert_eq!(value_of(&model, "Network"), Some("Goerli"));

        // chain mismatch and the unknown spender
        assert_eq!(model.warnings.len(), 2);
        assert!(model.warnings[0].contains("does not match"));
        assert!(model.warnings[1].starts_with("spender"));

        // declared order is kept
        let labels: Vec<_> = model.entries.iter().map(|e| e.label.as_str()).collect();
        let spender = labels.iter().position(|l| *l == "spender").unwrap();
        let value = labels.iter().position(|l| *l == "value").unwrap();
        assert!(spender < value);
    }

    #[test]
    fn test_watch_asset() {
        let book = AddressBook::empty();
        let tokens = TokenRegistry::new(TokenCatalog::bundled().unwrap());
        let req = WatchAssetParameters::from_rpc(&json!({
            "type": "ERC20",
            "options": { "address": ACCOUNT, "symbol": "FOO", "decimals": 6 }
        }))
        .unwrap()
        .validate(1, &tokens, None)
        .unwrap();

        let model = describe(&request(DappRequestParams::Asset(req)), &book, &tokens, 1);
        assert_eq!(model.intent, "Add FOO");
        let contract = ACCOUNT.parse::<Address>().unwrap().to_checksum();
        assert_eq!(value_of(&model, "Contract"), Some(contract.as_str()));
        assert_eq!(model.warnings, vec!["FOO is not in the known token list".to_string()]);
    }

    #[test]
    fn test_switch_network() {
        let model = describe(
            &request(DappRequestParams::SwitchNetwork(NormalizedSwitchChainParameters {
                chain_id: 137,
            })),
            &AddressBook::empty(),
            &TokenRegistry::new(TokenCatalog::new()),
            1,
        );
        assert_eq!(model.intent, "Switch to Polygon");
        assert_eq!(value_of(&model, "From"), Some("Ethereum"));
        assert_eq!(value_of(&model, "To"), Some("Polygon"));
        assert_eq!(value_of(&model, "Currency"), Some("MATIC"));
        assert!(model.warnings.is_empty());
    }
}
