//! gravity-init - Gravity contract initialization for Solana
//!
//! Encodes the Gravity `init` instruction, compiles it into a legacy message,
//! signs it with the payer key and submits the raw transaction over JSON-RPC.
//! The wire encoding is done by hand so every byte can be printed and checked.

pub mod serialization;
pub mod instruction;
pub mod gravity;
pub mod transaction;
pub mod rpc;
pub mod config;
pub mod pipeline;
pub mod error;

pub use error::GravityError;
pub use config::InitConfig;
pub use pipeline::{prepare_init, run_init, submit_init, InitReport, PreparedInit, Stage, StageError};
pub use rpc::{JsonRpcClient, RpcTransport};
pub use transaction::{SignedTransaction, TransactionBuilder};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::gravity::{
        new_init_contract_instruction, InitContractAccounts, InitContractPayload,
        INIT_CONTRACT_OPCODE, MAX_CONSULS,
    };
    pub use crate::instruction::{AccountMeta, Instruction, InstructionEncoder};
    pub use crate::transaction::{Message, SignedTransaction, TransactionBuilder};
    pub use crate::error::GravityError;
}
