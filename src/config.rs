//! Run configuration and key decoding
//!
//! [`InitConfig`] holds the operator's inputs exactly as typed. Nothing is
//! decoded until [`InitConfig::resolve`] runs as the first pipeline stage, so
//! malformed input always fails before any network traffic.

use crate::error::{GravityError, Result};
use crate::gravity::MAX_CONSULS;
use clap::Args;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_RPC_URL: &str = "http://localhost:8899";

/// Parameters of one `init-gravity` run
#[derive(Args, Clone)]
pub struct InitConfig {
    /// Gravity program ID
    #[arg(short = 'p', long = "program", env = "GRAVITY_PROGRAM")]
    pub program_id: String,

    /// Gravity data account
    #[arg(short = 'd', long = "data-account", env = "GRAVITY_DATA_ACCOUNT")]
    pub data_account: String,

    /// Gravity multisig account
    #[arg(short = 'm', long = "multisig-account", env = "GRAVITY_MULTISIG_ACCOUNT")]
    pub multisig_account: String,

    /// Payer private key in base58 encoding (64 bytes)
    #[arg(short = 'k', long = "private-key", env = "GRAVITY_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    /// JSON-RPC endpoint of the node
    #[arg(long, env = "GRAVITY_RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// Minimum number of agreeing consuls
    #[arg(long = "bft", env = "GRAVITY_BFT", default_value_t = 1)]
    pub bft_threshold: u8,

    /// Initial consul round
    #[arg(long, env = "GRAVITY_ROUND", default_value_t = 0)]
    pub round: u64,

    /// Extra consul public key, appended after the payer (repeatable)
    #[arg(long = "consul", value_name = "PUBKEY")]
    pub consuls: Vec<String>,
}

impl fmt::Debug for InitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitConfig")
            .field("program_id", &self.program_id)
            .field("data_account", &self.data_account)
            .field("multisig_account", &self.multisig_account)
            .field("private_key", &"<redacted>")
            .field("rpc_url", &self.rpc_url)
            .field("bft_threshold", &self.bft_threshold)
            .field("round", &self.round)
            .field("consuls", &self.consuls)
            .finish()
    }
}

/// Decoded configuration ready for the pipeline
pub struct ResolvedConfig {
    pub payer: Keypair,
    pub program_id: Pubkey,
    pub data_account: Pubkey,
    pub multisig_account: Pubkey,
    /// Consul set, payer first
    pub consuls: Vec<Pubkey>,
    pub bft_threshold: u8,
    pub round: u64,
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("payer", &self.payer.pubkey())
            .field("program_id", &self.program_id)
            .field("data_account", &self.data_account)
            .field("multisig_account", &self.multisig_account)
            .field("consuls", &self.consuls)
            .field("bft_threshold", &self.bft_threshold)
            .field("round", &self.round)
            .finish()
    }
}

impl InitConfig {
    /// Decode every key, failing on the first malformed one
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let payer = decode_keypair(&self.private_key)?;
        let program_id = parse_pubkey("program", &self.program_id)?;
        let data_account = parse_pubkey("data-account", &self.data_account)?;
        let multisig_account = parse_pubkey("multisig-account", &self.multisig_account)?;

        if self.consuls.len() >= MAX_CONSULS {
            return Err(GravityError::Config(format!(
                "at most {} extra consuls fit next to the payer, got {}",
                MAX_CONSULS - 1,
                self.consuls.len()
            )));
        }
        let mut consuls = Vec::with_capacity(1 + self.consuls.len());
        consuls.push(payer.pubkey());
        for consul in &self.consuls {
            consuls.push(parse_pubkey("consul", consul)?);
        }

        Ok(ResolvedConfig {
            payer,
            program_id,
            data_account,
            multisig_account,
            consuls,
            bft_threshold: self.bft_threshold,
            round: self.round,
        })
    }
}

/// Decode a base58 64-byte secret key (secret half followed by public half)
pub fn decode_keypair(encoded: &str) -> Result<Keypair> {
    let bytes = bs58::decode(encoded.trim()).into_vec()?;
    if bytes.len() != 64 {
        return Err(GravityError::DecodingError(format!(
            "private key must be 64 bytes, got {}",
            bytes.len()
        )));
    }
    Keypair::from_bytes(&bytes).map_err(|e| GravityError::DecodingError(e.to_string()))
}

/// Parse a base58 public key, naming the offending flag on failure
pub fn parse_pubkey(name: &str, encoded: &str) -> Result<Pubkey> {
    Pubkey::from_str(encoded.trim())
        .map_err(|e| GravityError::DecodingError(format!("{}: {} ({})", name, e, encoded)))
}
