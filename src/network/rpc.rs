// src/network/rpc.rs
use crate::network::abi;
use crate::network::ledger::Ledger;
use crate::types::{GasParams, TxReceipt};
use crate::utils::error::{MinerError, from_http};
use alloy_consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, B256, Bytes, TxKind, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use futures::{SinkExt, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, OnceCell};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tungstenite::protocol::Message;
use url::Url;

/// Configuration for connecting to the ledger's JSON-RPC interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint (`http(s)://` or `ws(s)://`)
    pub rpc_url: String,
    /// Mining contract address
    pub contract_address: Address,
    /// Account that mines; derived from `private_key` when left unset
    #[serde(default)]
    pub miner_address: Address,
    /// Hex private key used to sign `mine` transactions
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,
    /// Per-request timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Delay between receipt polls
    #[serde(default = "default_receipt_poll_interval")]
    pub receipt_poll_interval_ms: u64,
    /// Give up waiting for a receipt after this long
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    10
}

fn default_receipt_poll_interval() -> u64 {
    500
}

fn default_confirmation_timeout() -> u64 {
    120
}

impl LedgerConfig {
    /// Parses `private_key`; an absent or empty key yields `None`
    pub fn signer(&self) -> Result<Option<PrivateKeySigner>, MinerError> {
        match self.private_key.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(key) => key
                .parse::<PrivateKeySigner>()
                .map(Some)
                .map_err(|e| MinerError::ConfigError(format!("invalid private_key: {}", e))),
        }
    }
}

/// Facts logged at startup
#[derive(Debug, Clone, Copy)]
pub struct ChainInfo {
    /// Chain id reported by the node
    pub chain_id: u64,
    /// Native balance of the miner account, in wei
    pub balance: U256,
}

/// Contract-wide and per-miner counters
#[derive(Debug, Clone, Copy)]
pub struct ContractStatus {
    /// Successful mines across all miners
    pub total_mines: U256,
    /// Successful mines of this miner
    pub miner_mines: U256,
    /// Tokens left to mine
    pub remaining_supply: U256,
    /// Current difficulty in percent
    pub difficulty_percent: U256,
    /// Base difficulty in percent
    pub base_difficulty_percent: U256,
    /// Token balance of this miner
    pub token_balance: U256,
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Request/response channel to the node
enum Transport {
    /// One POST per request
    Http(Client),
    /// A single long-lived WebSocket, opened lazily and reopened after a
    /// failure
    Ws(Mutex<Option<WsStream>>),
}

/// JSON-RPC client for the mining contract
pub struct RpcLedger {
    /// Configuration for the node connection
    config: LedgerConfig,
    /// HTTP or WebSocket transport, chosen by the URL scheme
    transport: Transport,
    /// Signs `mine` transactions; reads work without it
    signer: Option<PrivateKeySigner>,
    /// Chain id, fetched once for transaction signing
    chain_id: OnceCell<u64>,
    /// JSON-RPC request id counter
    next_id: AtomicU64,
}

impl RpcLedger {
    /// Creates a new client; no request is made yet
    pub fn new(config: LedgerConfig) -> Result<Self, MinerError> {
        let url = Url::parse(&config.rpc_url)?;
        let transport = match url.scheme() {
            "http" | "https" => Transport::Http(
                Client::builder()
                    .timeout(Duration::from_secs(config.request_timeout_secs))
                    .build()?,
            ),
            "ws" | "wss" => Transport::Ws(Mutex::new(None)),
            other => {
                return Err(MinerError::ConfigError(format!(
                    "unsupported rpc_url scheme '{}'",
                    other
                )));
            }
        };
        let signer = config.signer()?;

        Ok(RpcLedger {
            config,
            transport,
            signer,
            chain_id: OnceCell::new(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Connection configuration
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Address of the signing key, if one is configured
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    /// Queries chain id and miner balance
    ///
    /// Used as the startup reachability check; any failure is fatal there.
    pub async fn chain_info(&self) -> Result<ChainInfo, MinerError> {
        let miner = format!("{:#x}", self.config.miner_address);
        let (chain_id, balance) = futures::try_join!(
            self.chain_id(),
            self.rpc_call("eth_getBalance", json!([miner, "latest"]))
        )?;

        Ok(ChainInfo {
            chain_id,
            balance: parse_quantity(&balance)?,
        })
    }

    /// Asks the contract to validate a candidate solution
    pub async fn check_hash(&self, nonce: U256, timestamp: u64) -> Result<(B256, bool), MinerError> {
        let ret = self
            .call(abi::checkHashCall {
                nonce,
                timestamp: U256::from(timestamp),
            })
            .await?;
        Ok((ret.hash, ret.valid))
    }

    /// Reads the contract counters shown by the `status` command
    pub async fn contract_status(&self) -> Result<ContractStatus, MinerError> {
        let miner = self.config.miner_address;
        let (total, mines, supply, percent, base, balance) = futures::try_join!(
            self.call(abi::totalMinesCall {}),
            self.call(abi::minerStatsCall(miner)),
            self.call(abi::remainingSupplyCall {}),
            self.call(abi::getDifficultyPercentCall {}),
            self.call(abi::getBaseDifficultyPercentCall {}),
            self.call(abi::balanceOfCall(miner))
        )?;

        Ok(ContractStatus {
            total_mines: total,
            miner_mines: mines,
            remaining_supply: supply,
            difficulty_percent: percent,
            base_difficulty_percent: base,
            token_balance: balance,
        })
    }

    async fn chain_id(&self) -> Result<u64, MinerError> {
        self.chain_id
            .get_or_try_init(|| async {
                let id = self.rpc_call("eth_chainId", json!([])).await?;
                parse_u64(&id)
            })
            .await
            .copied()
    }

    /// Executes a read-only contract call at the latest block
    ///
    /// Sent from the miner account since `checkHash` hashes `msg.sender`.
    async fn call<C: SolCall>(&self, call: C) -> Result<C::Return, MinerError> {
        let data = call.abi_encode();
        let result = self
            .rpc_call(
                "eth_call",
                json!([
                    {
                        "from": format!("{:#x}", self.config.miner_address),
                        "to": format!("{:#x}", self.config.contract_address),
                        "data": format!("0x{}", hex::encode(data)),
                    },
                    "latest"
                ]),
            )
            .await?;
        abi::decode_returns::<C>(&parse_data(&result)?)
    }

    async fn fetch_receipt(&self, tx: B256) -> Result<Option<TxReceipt>, MinerError> {
        let result = self
            .rpc_call("eth_getTransactionReceipt", json!([format!("{:#x}", tx)]))
            .await?;
        parse_receipt(tx, &result)
    }

    /// Makes an RPC call to the node
    ///
    /// # Returns
    /// * `Ok(Value)` - The `result` member of the response
    /// * `Err(MinerError)` - Transport failure, or the node's `error` object
    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, MinerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });

        let response = match &self.transport {
            Transport::Http(client) => client
                .post(&self.config.rpc_url)
                .json(&request)
                .send()
                .await
                .map_err(from_http)?
                .json::<Value>()
                .await
                .map_err(from_http)?,
            Transport::Ws(connection) => self.ws_request(connection, &request, id).await?,
        };

        if let Some(error) = response.get("error") {
            return Err(MinerError::Rpc {
                code: error["code"].as_i64().unwrap_or(0),
                message: error["message"]
                    .as_str()
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| MinerError::ProtocolError(format!("{}: missing result", method)))
    }

    /// Sends one request over the WebSocket and waits for the matching id
    ///
    /// Requests are serialized by the connection lock. Any failure drops
    /// the connection so the next request reconnects.
    async fn ws_request(
        &self,
        connection: &Mutex<Option<WsStream>>,
        request: &Value,
        id: u64,
    ) -> Result<Value, MinerError> {
        let mut conn = connection.lock().await;
        if conn.is_none() {
            let (stream, _) = tokio_tungstenite::connect_async(self.config.rpc_url.as_str()).await?;
            log::debug!("WebSocket connected to {}", self.config.rpc_url);
            *conn = Some(stream);
        }
        let ws = conn
            .as_mut()
            .ok_or_else(|| MinerError::ConnectionError("Not connected".into()))?;

        let timeout = Duration::from_secs(self.config.request_timeout_secs);
        let outcome = match tokio::time::timeout(timeout, exchange(ws, request, id)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(MinerError::ConnectionError(format!(
                "no response to request {} within {:?}",
                id, timeout
            ))),
        };
        if outcome.is_err() {
            *conn = None;
        }
        outcome
    }
}

async fn exchange(ws: &mut WsStream, request: &Value, id: u64) -> Result<Value, MinerError> {
    ws.send(Message::Text(request.to_string().into())).await?;

    while let Some(message) = ws.next().await {
        match message? {
            Message::Text(text) => {
                let response: Value = serde_json::from_str(text.as_str())?;
                if response["id"].as_u64() == Some(id) {
                    return Ok(response);
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err(MinerError::ConnectionError(
        "WebSocket closed by the node".into(),
    ))
}

impl Ledger for RpcLedger {
    async fn block_timestamp(&self) -> Result<u64, MinerError> {
        let block = self
            .rpc_call("eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        parse_u64(&block["timestamp"])
    }

    async fn last_hash(&self) -> Result<B256, MinerError> {
        self.call(abi::lastHashCall {}).await
    }

    async fn effective_difficulty(&self, timestamp: u64) -> Result<U256, MinerError> {
        self.call(abi::getEffectiveDifficultyCall {
            _timestamp: U256::from(timestamp),
        })
        .await
    }

    async fn time_since_last_mine(&self) -> Result<u64, MinerError> {
        let seconds = self.call(abi::getTimeSinceLastMineCall {}).await?;
        u64::try_from(seconds).map_err(|_| {
            MinerError::ProtocolError(format!("time since last mine {} does not fit in u64", seconds))
        })
    }

    async fn submit_mine(
        &self,
        nonce: U256,
        timestamp: u64,
        gas: &GasParams,
    ) -> Result<B256, MinerError> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            MinerError::ConfigError("no private_key configured, cannot sign transactions".into())
        })?;
        let chain_id = self.chain_id().await?;
        let account_nonce = parse_u64(
            &self
                .rpc_call(
                    "eth_getTransactionCount",
                    json!([format!("{:#x}", signer.address()), "pending"]),
                )
                .await?,
        )?;

        let input = abi::mineCall {
            nonce,
            timestamp: U256::from(timestamp),
        }
        .abi_encode();
        let (tx, raw) = sign_transaction(
            signer,
            chain_id,
            account_nonce,
            self.config.contract_address,
            input,
            gas,
        )?;

        let result = self
            .rpc_call(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;
        let accepted = parse_b256(&result)?;
        if accepted != tx {
            log::warn!("Node reported {} for locally signed {}", accepted, tx);
        }
        Ok(accepted)
    }

    async fn await_receipt(&self, tx: B256) -> Result<TxReceipt, MinerError> {
        let poll = Duration::from_millis(self.config.receipt_poll_interval_ms);
        let deadline = Instant::now() + Duration::from_secs(self.config.confirmation_timeout_secs);

        loop {
            match self.fetch_receipt(tx).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {}
                Err(e) if e.is_transient() => log::debug!("Receipt poll for {} failed: {}", tx, e),
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Err(MinerError::ConfirmationTimeout(tx));
            }
            tokio::time::sleep(poll).await;
        }
    }
}

/// Builds and signs an EIP-1559 call to `to`
///
/// Returns the transaction hash and the EIP-2718 encoded bytes for
/// `eth_sendRawTransaction`.
pub fn sign_transaction(
    signer: &PrivateKeySigner,
    chain_id: u64,
    nonce: u64,
    to: Address,
    input: Vec<u8>,
    gas: &GasParams,
) -> Result<(B256, Vec<u8>), MinerError> {
    let tx = TxEip1559 {
        chain_id,
        nonce,
        gas_limit: gas.gas_limit,
        max_fee_per_gas: u128::from(gas.max_fee_per_gas),
        max_priority_fee_per_gas: u128::from(gas.max_priority_fee_per_gas),
        to: TxKind::Call(to),
        value: U256::ZERO,
        access_list: Default::default(),
        input: Bytes::from(input),
    };
    let signature = signer.sign_hash_sync(&tx.signature_hash())?;
    let envelope = TxEnvelope::from(tx.into_signed(signature));
    Ok((*envelope.tx_hash(), envelope.encoded_2718()))
}

fn as_hex_str(value: &Value) -> Result<&str, MinerError> {
    value
        .as_str()
        .and_then(|s| s.strip_prefix("0x"))
        .ok_or_else(|| MinerError::ProtocolError(format!("expected 0x-prefixed string, got {}", value)))
}

/// Parses a hex quantity (`"0x1a"`)
fn parse_quantity(value: &Value) -> Result<U256, MinerError> {
    let digits = as_hex_str(value)?;
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| MinerError::ProtocolError(format!("bad quantity {}: {}", value, e)))
}

fn parse_u64(value: &Value) -> Result<u64, MinerError> {
    let quantity = parse_quantity(value)?;
    u64::try_from(quantity)
        .map_err(|_| MinerError::ProtocolError(format!("quantity {} does not fit in u64", value)))
}

/// Parses unformatted data (`"0xdeadbeef"`)
fn parse_data(value: &Value) -> Result<Vec<u8>, MinerError> {
    Ok(hex::decode(as_hex_str(value)?)?)
}

fn parse_b256(value: &Value) -> Result<B256, MinerError> {
    let bytes = parse_data(value)?;
    if bytes.len() != 32 {
        return Err(MinerError::ProtocolError(format!(
            "expected 32-byte hash, got {} bytes",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

/// `null` means the transaction is still pending
fn parse_receipt(tx: B256, value: &Value) -> Result<Option<TxReceipt>, MinerError> {
    if value.is_null() {
        return Ok(None);
    }

    let success = parse_u64(&value["status"])? == 1;
    let block_number = match &value["blockNumber"] {
        Value::Null => None,
        number => Some(parse_u64(number)?),
    };

    Ok(Some(TxReceipt {
        tx_hash: tx,
        success,
        block_number,
    }))
}
