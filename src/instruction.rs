//! Instruction construction
//!
//! An [`Instruction`] names the program it invokes, the accounts it touches in
//! positional order, and an opaque data blob the program decodes itself.

use solana_sdk::pubkey::Pubkey;

/// Account metadata for an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn new(pubkey: Pubkey, is_signer: bool, is_writable: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable,
        }
    }

    pub fn new_writable(pubkey: Pubkey, is_signer: bool) -> Self {
        Self::new(pubkey, is_signer, true)
    }
}

/// A program invocation before its accounts are resolved into message indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Program ID that this instruction invokes
    pub program_id: Pubkey,
    /// Accounts in the order the program indexes them
    pub accounts: Vec<AccountMeta>,
    /// Instruction data (opaque bytes)
    pub data: Vec<u8>,
}

impl Instruction {
    pub fn new(program_id: Pubkey, accounts: Vec<AccountMeta>, data: Vec<u8>) -> Self {
        Self {
            program_id,
            accounts,
            data,
        }
    }
}

/// Builder for [`Instruction`] that keeps accounts in insertion order
pub struct InstructionEncoder {
    program_id: Pubkey,
    accounts: Vec<AccountMeta>,
    data: Vec<u8>,
}

impl InstructionEncoder {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            accounts: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Add an account to the instruction
    pub fn account(mut self, meta: AccountMeta) -> Self {
        self.accounts.push(meta);
        self
    }

    /// Add a signer account
    pub fn signer(self, pubkey: Pubkey, is_writable: bool) -> Self {
        self.account(AccountMeta::new(pubkey, true, is_writable))
    }

    /// Add a writable account
    pub fn writable(self, pubkey: Pubkey, is_signer: bool) -> Self {
        self.account(AccountMeta::new_writable(pubkey, is_signer))
    }

    /// Set instruction data directly
    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    pub fn build(self) -> Instruction {
        Instruction::new(self.program_id, self.accounts, self.data)
    }
}
