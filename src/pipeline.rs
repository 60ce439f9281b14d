//! The `init-gravity` run: decode, encode, build, fetch blockhash, assemble,
//! sign, serialize, submit. Each step runs once, in order, and the first
//! failure ends the run tagged with the stage it happened in.

use crate::config::InitConfig;
use crate::error::GravityError;
use crate::gravity::{
    new_init_contract_instruction, InitContractAccounts, InitContractPayload, INIT_CONTRACT_OPCODE,
};
use crate::rpc::RpcTransport;
use crate::transaction::{SignedTransaction, TransactionBuilder};
use solana_sdk::signature::Signer;
use std::fmt;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Encode,
    Build,
    FetchBlockhash,
    Assemble,
    Sign,
    Serialize,
    Submit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decode => "decode",
            Stage::Encode => "encode",
            Stage::Build => "build",
            Stage::FetchBlockhash => "fetch-blockhash",
            Stage::Assemble => "assemble",
            Stage::Sign => "sign",
            Stage::Serialize => "serialize",
            Stage::Submit => "submit",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: GravityError,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, StageError>;
}

impl<T> AtStage<T> for crate::error::Result<T> {
    fn at(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|source| StageError { stage, source })
    }
}

/// Signed transaction ready for submission, with every byte artifact that goes
/// on the wire
#[derive(Debug, Clone)]
pub struct PreparedInit {
    pub instruction_data: Vec<u8>,
    pub message: Vec<u8>,
    pub transaction: Vec<u8>,
    fetched_at: Instant,
}

impl PreparedInit {
    pub fn instruction_data_hex(&self) -> String {
        hex::encode(&self.instruction_data)
    }

    pub fn message_hex(&self) -> String {
        hex::encode(&self.message)
    }

    pub fn transaction_hex(&self) -> String {
        hex::encode(&self.transaction)
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct InitReport {
    pub artifacts: PreparedInit,
    pub signature: String,
}

/// Build, sign and submit the Gravity init transaction
pub async fn run_init<T: RpcTransport + ?Sized>(
    config: &InitConfig,
    transport: &T,
) -> Result<InitReport, StageError> {
    let artifacts = prepare_init(config, transport).await?;
    let signature = submit_init(&artifacts, transport).await?;
    Ok(InitReport {
        artifacts,
        signature,
    })
}

/// Every stage up to and including serialization. The only network call made
/// is the blockhash fetch.
pub async fn prepare_init<T: RpcTransport + ?Sized>(
    config: &InitConfig,
    transport: &T,
) -> Result<PreparedInit, StageError> {
    let resolved = config.resolve().at(Stage::Decode)?;
    let payer = resolved.payer.pubkey();
    info!(
        payer = %payer,
        program = %resolved.program_id,
        data_account = %resolved.data_account,
        multisig_account = %resolved.multisig_account,
        "Initializing Gravity contract"
    );

    let payload = InitContractPayload::new(
        INIT_CONTRACT_OPCODE,
        resolved.bft_threshold,
        resolved.consuls,
        resolved.round,
    )
    .at(Stage::Encode)?;
    let instruction_data = payload.encode().at(Stage::Encode)?;
    let decoded = InitContractPayload::decode(&instruction_data).at(Stage::Encode)?;
    debug!(
        payload = ?decoded,
        bytes = instruction_data.len(),
        "Encoded init payload"
    );

    let accounts = InitContractAccounts {
        payer,
        data_account: resolved.data_account,
        multisig_account: resolved.multisig_account,
    };
    let instruction =
        new_init_contract_instruction(&accounts, resolved.program_id, instruction_data.clone());
    debug!(accounts = instruction.accounts.len(), "Built init instruction");

    let latest = transport
        .get_latest_blockhash()
        .await
        .at(Stage::FetchBlockhash)?;
    let fetched_at = Instant::now();
    info!(
        blockhash = %latest.blockhash,
        last_valid_block_height = latest.last_valid_block_height,
        "Fetched recent blockhash"
    );

    let message = TransactionBuilder::new()
        .payer(payer)
        .recent_blockhash(latest.blockhash)
        .add_instruction(instruction)
        .compile()
        .at(Stage::Assemble)?;
    let message_bytes = message.serialize().at(Stage::Assemble)?;

    let signed = SignedTransaction::sign(message, &[&resolved.payer]).at(Stage::Sign)?;
    let transaction = signed.serialize().at(Stage::Serialize)?;
    debug!(
        message_bytes = message_bytes.len(),
        transaction_bytes = transaction.len(),
        signatures = signed.signatures.len(),
        "Serialized transaction"
    );

    Ok(PreparedInit {
        instruction_data,
        message: message_bytes,
        transaction,
        fetched_at,
    })
}

/// Send the prepared transaction once, returning the node's signature string
pub async fn submit_init<T: RpcTransport + ?Sized>(
    prepared: &PreparedInit,
    transport: &T,
) -> Result<String, StageError> {
    // The blockhash expiry is enforced by the node, not here
    let elapsed_ms = || prepared.fetched_at.elapsed().as_millis() as u64;
    match transport.send_raw_transaction(&prepared.transaction).await {
        Ok(signature) => {
            info!(signature = %signature, elapsed_ms = elapsed_ms(), "Transaction submitted");
            Ok(signature)
        }
        Err(e) => {
            warn!(
                endpoint = transport.endpoint(),
                elapsed_ms = elapsed_ms(),
                "Submission rejected"
            );
            Err(StageError {
                stage: Stage::Submit,
                source: e,
            })
        }
    }
}
