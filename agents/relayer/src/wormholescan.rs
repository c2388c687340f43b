use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use mrl_core::{
    Bytes, ChainCommunicationError, ChainId, ChainResult, MrlProtocolError, SignedVaa,
    TokenBridgePayload, TokenBridgePayloadType, TransferFetcher, H256, U256,
};

/// Fetches signed VAAs and their parsed token bridge payloads from the
/// Wormholescan API.
#[derive(Debug, Clone)]
pub struct WormholeScanClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct VaaResponse {
    data: Option<VaaDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VaaDoc {
    vaa: String,
    #[serde(default)]
    tx_hash: Option<String>,
    #[serde(default)]
    payload: Option<ParsedTransfer>,
}

/// The token bridge fields of a `parsedPayload=true` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParsedTransfer {
    payload_type: u8,
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default)]
    fee: Option<Value>,
    #[serde(default)]
    from_address: Option<String>,
    to_address: String,
    to_chain: u16,
    #[serde(default)]
    token_address: Option<String>,
    #[serde(default)]
    token_chain: Option<u16>,
}

impl WormholeScanClient {
    pub fn new(base_url: Url, request_timeout: Duration) -> ChainResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(ChainCommunicationError::from_other)?;
        Ok(Self { client, base_url })
    }

    fn vaa_url(&self, chain: ChainId, emitter: H256, sequence: u64) -> ChainResult<Url> {
        let mut url = self
            .base_url
            .join(&format!(
                "api/v1/vaas/{}/{}/{}",
                chain.0,
                hex::encode(emitter.as_bytes()),
                sequence
            ))
            .map_err(ChainCommunicationError::from_other)?;
        url.query_pairs_mut().append_pair("parsedPayload", "true");
        Ok(url)
    }

    async fn get_vaa(&self, chain: ChainId, emitter: H256, sequence: u64) -> ChainResult<Option<VaaDoc>> {
        let url = self.vaa_url(chain, emitter, sequence)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ChainCommunicationError::from_other)?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Attestation not found");
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(ChainCommunicationError::from_other)?;
        let body: VaaResponse = response
            .json()
            .await
            .map_err(ChainCommunicationError::from_other)?;
        Ok(body.data)
    }
}

#[async_trait]
impl TransferFetcher for WormholeScanClient {
    #[instrument(err, skip(self))]
    async fn fetch_by_sequence(
        &self,
        chain: ChainId,
        emitter: H256,
        sequence: u64,
    ) -> ChainResult<Option<TokenBridgePayload>> {
        match self.get_vaa(chain, emitter, sequence).await? {
            Some(VaaDoc {
                payload: Some(parsed),
                ..
            }) => Ok(Some(parsed.try_into()?)),
            _ => Ok(None),
        }
    }

    #[instrument(err, skip(self))]
    async fn fetch_signed_vaa(
        &self,
        chain: ChainId,
        emitter: H256,
        sequence: u64,
    ) -> ChainResult<Option<SignedVaa>> {
        let Some(doc) = self.get_vaa(chain, emitter, sequence).await? else {
            return Ok(None);
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(doc.vaa.as_bytes())
            .map_err(ChainCommunicationError::from_other)?;
        Ok(Some(SignedVaa::parse(bytes, doc.tx_hash)?))
    }
}

impl TryFrom<ParsedTransfer> for TokenBridgePayload {
    type Error = ChainCommunicationError;

    fn try_from(parsed: ParsedTransfer) -> Result<Self, Self::Error> {
        let payload_type = TokenBridgePayloadType::from_repr(parsed.payload_type)
            .ok_or(MrlProtocolError::UnknownPayloadType(parsed.payload_type))?;
        if payload_type == TokenBridgePayloadType::AttestMeta {
            return Err(MrlProtocolError::NotATransfer(parsed.payload_type).into());
        }
        let fee = parsed.fee.as_ref().map(|fee| parse_amount("fee", fee)).transpose()?;
        Ok(Self {
            payload_type,
            amount: parsed
                .amount
                .as_ref()
                .map(|amount| parse_amount("amount", amount))
                .transpose()?
                .unwrap_or_default(),
            token_address: parsed
                .token_address
                .as_deref()
                .map(|address| parse_address("tokenAddress", address))
                .transpose()?
                .unwrap_or_default(),
            token_chain: ChainId(parsed.token_chain.unwrap_or_default()),
            to: parse_address("toAddress", &parsed.to_address)?,
            to_chain: ChainId(parsed.to_chain),
            from_address: parsed
                .from_address
                .as_deref()
                .map(|address| parse_address("fromAddress", address))
                .transpose()?,
            fee: match payload_type {
                TokenBridgePayloadType::Transfer => fee,
                _ => None,
            },
            // the API does not return the payload for the recipient
            transfer_payload: Bytes::default(),
        })
    }
}

/// Parse a hex address of up to 32 bytes, left padding it.
fn parse_address(field: &'static str, address: &str) -> Result<H256, MrlProtocolError> {
    let invalid = |reason: String| MrlProtocolError::InvalidField { field, reason };
    let bytes = hex::decode(address.trim_start_matches("0x")).map_err(|e| invalid(e.to_string()))?;
    if bytes.len() > 32 {
        return Err(invalid(format!("{} bytes is longer than 32", bytes.len())));
    }
    let mut padded = [0u8; 32];
    padded[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(H256(padded))
}

/// Amounts come back as decimal strings, or as numbers for small values.
fn parse_amount(field: &'static str, value: &Value) -> Result<U256, MrlProtocolError> {
    let invalid = |reason: String| MrlProtocolError::InvalidField { field, reason };
    match value {
        Value::String(s) => U256::from_dec_str(s).map_err(|e| invalid(e.to_string())),
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| invalid(format!("{n} is not an unsigned integer"))),
        other => Err(invalid(format!("unexpected value {other}"))),
    }
}
