//! Inbound JSON-RPC method surface and its routing table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::signature::SignatureMethod;
use crate::types::DappRequestType;

macro_rules! json_rpc_methods {
    ($($variant:ident => $name:literal,)+) => {
        /// Every method a dapp may invoke through the injected provider.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum JsonRpcMethod {
            $(
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl JsonRpcMethod {
            pub const ALL: &'static [JsonRpcMethod] = &[$(JsonRpcMethod::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(JsonRpcMethod::$variant => $name,)+
                }
            }
        }

        impl FromStr for JsonRpcMethod {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(JsonRpcMethod::$variant),)+
                    _ => Err(Error::UnsupportedMethod(s.to_string())),
                }
            }
        }
    };
}

json_rpc_methods! {
    DbGetHex => "db_getHex",
    DbGetString => "db_getString",
    DbPutHex => "db_putHex",
    DbPutString => "db_putString",
    EthAccounts => "eth_accounts",
    EthBlockNumber => "eth_blockNumber",
    EthCall => "eth_call",
    EthChainId => "eth_chainId",
    EthCoinbase => "eth_coinbase",
    EthCompileLll => "eth_compileLLL",
    EthCompileSerpent => "eth_compileSerpent",
    EthCompileSolidity => "eth_compileSolidity",
    EthEstimateGas => "eth_estimateGas",
    EthFeeHistory => "eth_feeHistory",
    EthGasPrice => "eth_gasPrice",
    EthGetBalance => "eth_getBalance",
    EthGetBlockByHash => "eth_getBlockByHash",
    EthGetBlockByNumber => "eth_getBlockByNumber",
    EthGetBlockTransactionCountByHash => "eth_getBlockTransactionCountByHash",
    EthGetBlockTransactionCountByNumber => "eth_getBlockTransactionCountByNumber",
    EthGetCode => "eth_getCode",
    EthGetCompilers => "eth_getCompilers",
    EthGetFilterChanges => "eth_getFilterChanges",
    EthGetFilterLogs => "eth_getFilterLogs",
    EthGetLogs => "eth_getLogs",
    EthGetStorageAt => "eth_getStorageAt",
    EthGetTransactionByBlockHashAndIndex => "eth_getTransactionByBlockHashAndIndex",
    EthGetTransactionByBlockNumberAndIndex => "eth_getTransactionByBlockNumberAndIndex",
    EthGetTransactionByHash => "eth_getTransactionByHash",
    EthGetTransactionCount => "eth_getTransactionCount",
    EthGetTransactionReceipt => "eth_getTransactionReceipt",
    EthGetUncleByBlockHashAndIndex => "eth_getUncleByBlockHashAndIndex",
    EthGetUncleByBlockNumberAndIndex => "eth_getUncleByBlockNumberAndIndex",
    EthGetUncleCountByBlockHash => "eth_getUncleCountByBlockHash",
    EthGetUncleCountByBlockNumber => "eth_getUncleCountByBlockNumber",
    EthGetWork => "eth_getWork",
    EthMining => "eth_mining",
    EthNewBlockFilter => "eth_newBlockFilter",
    EthNewFilter => "eth_newFilter",
    EthProtocolVersion => "eth_protocolVersion",
    EthRequestAccounts => "eth_requestAccounts",
    EthSendRawTransaction => "eth_sendRawTransaction",
    EthSendTransaction => "eth_sendTransaction",
    EthSign => "eth_sign",
    EthSignTransaction => "eth_signTransaction",
    EthSignTypedData => "eth_signTypedData",
    EthSignTypedDataV1 => "eth_signTypedData_v1",
    EthSignTypedDataV3 => "eth_signTypedData_v3",
    EthSignTypedDataV4 => "eth_signTypedData_v4",
    EthSubmitWork => "eth_submitWork",
    EthUninstallFilter => "eth_uninstallFilter",
    NetListening => "net_listening",
    NetPeerCount => "net_peerCount",
    NetVersion => "net_version",
    PersonalEcRecover => "personal_ecRecover",
    PersonalSign => "personal_sign",
    ShhAddToGroup => "shh_addToGroup",
    ShhGetFilterChanges => "shh_getFilterChanges",
    ShhGetMessages => "shh_getMessages",
    ShhHasIdentity => "shh_hasIdentity",
    ShhNewFilter => "shh_newFilter",
    ShhNewGroup => "shh_newGroup",
    ShhNewIdentity => "shh_newIdentity",
    ShhPost => "shh_post",
    ShhUninstallFilter => "shh_uninstallFilter",
    ShhVersion => "shh_version",
    WalletAddEthereumChain => "wallet_addEthereumChain",
    WalletSwitchEthereumChain => "wallet_switchEthereumChain",
    WalletGetPermissions => "wallet_getPermissions",
    WalletRequestPermissions => "wallet_requestPermissions",
    WalletWatchAsset => "wallet_watchAsset",
    Web3ClientVersion => "web3_clientVersion",
    Web3Sha3 => "web3_sha3",
    EthSubscribe => "eth_subscribe",
}

/// Where an inbound call goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MethodRoute {
    /// Read-only; forwarded untouched to the node.
    Proxy,
    /// Needs user confirmation through the dapp request queue.
    DappRequest(DappRequestType),
    /// Handled by account, permission, transaction or chain collaborators.
    Delegated,
    Unsupported,
}

impl JsonRpcMethod {
    pub fn route(&self) -> MethodRoute {
        use JsonRpcMethod::*;

        match self {
            EthBlockNumber
            | EthCall
            | EthEstimateGas
            | EthFeeHistory
            | EthGasPrice
            | EthGetBalance
            | EthGetBlockByHash
            | EthGetBlockByNumber
            | EthGetBlockTransactionCountByHash
            | EthGetBlockTransactionCountByNumber
            | EthGetCode
            | EthGetLogs
            | EthGetStorageAt
            | EthGetTransactionByBlockHashAndIndex
            | EthGetTransactionByBlockNumberAndIndex
            | EthGetTransactionByHash
            | EthGetTransactionCount
            | EthGetTransactionReceipt
            | EthGetUncleByBlockHashAndIndex
            | EthGetUncleByBlockNumberAndIndex
            | EthGetUncleCountByBlockHash
            | EthGetUncleCountByBlockNumber
            | EthGetWork
            | EthMining
            | EthProtocolVersion
            | EthSendRawTransaction
            | EthSubmitWork
            | NetListening
            | NetPeerCount
            | NetVersion
            | Web3ClientVersion
            | EthSubscribe => MethodRoute::Proxy,

            PersonalSign | EthSignTypedData | EthSignTypedDataV1 | EthSignTypedDataV3
            | EthSignTypedDataV4 => MethodRoute::DappRequest(DappRequestType::Signing),
            WalletWatchAsset => MethodRoute::DappRequest(DappRequestType::Asset),
            WalletSwitchEthereumChain => MethodRoute::DappRequest(DappRequestType::SwitchNetwork),

            EthAccounts
            | EthRequestAccounts
            | EthChainId
            | EthCoinbase
            | EthSendTransaction
            | EthGetFilterChanges
            | EthGetFilterLogs
            | EthNewBlockFilter
            | EthNewFilter
            | EthUninstallFilter
            | WalletAddEthereumChain
            | WalletGetPermissions
            | WalletRequestPermissions => MethodRoute::Delegated,

            DbGetHex | DbGetString | DbPutHex | DbPutString | EthCompileLll
            | EthCompileSerpent | EthCompileSolidity | EthGetCompilers | EthSign
            | EthSignTransaction | PersonalEcRecover | ShhAddToGroup | ShhGetFilterChanges
            | ShhGetMessages | ShhHasIdentity | ShhNewFilter | ShhNewGroup | ShhNewIdentity
            | ShhPost | ShhUninstallFilter | ShhVersion | Web3Sha3 => MethodRoute::Unsupported,
        }
    }

    /// The signing variant, when this is one of the five signing methods.
    pub fn signature_method(&self) -> Option<SignatureMethod> {
        match self {
            JsonRpcMethod::PersonalSign => Some(SignatureMethod::PersonalSign),
            JsonRpcMethod::EthSignTypedData => Some(SignatureMethod::SignTypedData),
            JsonRpcMethod::EthSignTypedDataV1 => Some(SignatureMethod::SignTypedDataV1),
            JsonRpcMethod::EthSignTypedDataV3 => Some(SignatureMethod::SignTypedDataV3),
            JsonRpcMethod::EthSignTypedDataV4 => Some(SignatureMethod::SignTypedDataV4),
            _ => None,
        }
    }
}

impl fmt::Display for JsonRpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
