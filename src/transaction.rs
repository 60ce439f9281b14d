//! Message compilation, signing and wire serialization
//!
//! Produces legacy (unversioned) messages. Account keys are ordered the same
//! way the SDK orders them: fee payer first, then writable signers, readonly
//! signers, writable non-signers and readonly non-signers, each group sorted
//! by key bytes. Validators reject anything whose signatures don't cover these
//! exact bytes, so the encoding here must not drift.

use crate::error::{GravityError, Result};
use crate::instruction::Instruction;
use crate::serialization::{
    compact_u16_size, decode_array, decode_compact_u16, decode_length_prefixed, decode_pubkey,
    decode_u8, encode_compact_u16, encode_length_prefixed, encode_pubkey, encode_u8,
    helpers::{serialize_vec, vec_byte_size},
    ByteSerialize,
};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;

/// Message header containing account metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

impl MessageHeader {
    pub fn new(
        num_required_signatures: u8,
        num_readonly_signed_accounts: u8,
        num_readonly_unsigned_accounts: u8,
    ) -> Self {
        Self {
            num_required_signatures,
            num_readonly_signed_accounts,
            num_readonly_unsigned_accounts,
        }
    }
}

impl ByteSerialize for MessageHeader {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()> {
        encode_u8(self.num_required_signatures, writer)?;
        encode_u8(self.num_readonly_signed_accounts, writer)?;
        encode_u8(self.num_readonly_unsigned_accounts, writer)?;
        Ok(())
    }

    fn byte_size(&self) -> usize {
        3
    }
}

/// Compiled instruction with resolved account indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

impl ByteSerialize for CompiledInstruction {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()> {
        encode_u8(self.program_id_index, writer)?;
        encode_length_prefixed(&self.account_indices, writer)?;
        encode_length_prefixed(&self.data, writer)?;
        Ok(())
    }

    fn byte_size(&self) -> usize {
        1 + compact_u16_size(self.account_indices.len())
            + self.account_indices.len()
            + compact_u16_size(self.data.len())
            + self.data.len()
    }
}

/// Compiled legacy message, the exact payload that gets signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// The fee payer always occupies the first account slot
    pub fn fee_payer(&self) -> Option<&Pubkey> {
        self.account_keys.first()
    }

    /// Keys that must sign, in the order their signatures go on the wire
    pub fn signer_keys(&self) -> &[Pubkey] {
        let end = (self.header.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..end]
    }

    /// Canonical message bytes
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.byte_size());
        self.serialize_bytes(&mut bytes)?;
        Ok(bytes)
    }

    fn deserialize_from(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let header = MessageHeader::new(decode_u8(cursor)?, decode_u8(cursor)?, decode_u8(cursor)?);

        let num_account_keys = decode_compact_u16(cursor)?;
        let account_keys = (0..num_account_keys)
            .map(|_| decode_pubkey(cursor))
            .collect::<Result<Vec<_>>>()?;

        let recent_blockhash = Hash::new_from_array(decode_array::<32>(cursor)?);

        let num_instructions = decode_compact_u16(cursor)?;
        let instructions = (0..num_instructions)
            .map(|_| -> Result<CompiledInstruction> {
                Ok(CompiledInstruction {
                    program_id_index: decode_u8(cursor)?,
                    account_indices: decode_length_prefixed(cursor)?,
                    data: decode_length_prefixed(cursor)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Message {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }
}

impl ByteSerialize for Message {
    fn serialize_bytes(&self, writer: &mut Vec<u8>) -> Result<()> {
        self.header.serialize_bytes(writer)?;

        encode_compact_u16(self.account_keys.len(), writer)?;
        for key in &self.account_keys {
            encode_pubkey(key, writer)?;
        }

        writer.extend_from_slice(self.recent_blockhash.as_ref());

        serialize_vec(&self.instructions, writer)
    }

    fn byte_size(&self) -> usize {
        self.header.byte_size()
            + compact_u16_size(self.account_keys.len())
            + self.account_keys.len() * 32
            + 32
            + vec_byte_size(&self.instructions)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct KeyFlags {
    is_signer: bool,
    is_writable: bool,
}

/// Transaction builder with fluent API
#[derive(Default)]
pub struct TransactionBuilder {
    instructions: Vec<Instruction>,
    payer: Option<Pubkey>,
    recent_blockhash: Option<Hash>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fee payer
    pub fn payer(mut self, payer: Pubkey) -> Self {
        self.payer = Some(payer);
        self
    }

    /// Set the recent blockhash
    pub fn recent_blockhash(mut self, blockhash: Hash) -> Self {
        self.recent_blockhash = Some(blockhash);
        self
    }

    pub fn add_instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    /// Compile the instructions into a message
    pub fn compile(self) -> Result<Message> {
        let payer = self
            .payer
            .ok_or_else(|| GravityError::InvalidTransaction("Payer not set".to_string()))?;

        let recent_blockhash = self.recent_blockhash.ok_or_else(|| {
            GravityError::InvalidTransaction("Recent blockhash not set".to_string())
        })?;

        if self.instructions.is_empty() {
            return Err(GravityError::InvalidTransaction(
                "No instructions provided".to_string(),
            ));
        }

        let mut key_flags: BTreeMap<Pubkey, KeyFlags> = BTreeMap::new();
        for instruction in &self.instructions {
            key_flags.entry(instruction.program_id).or_default();
            for account in &instruction.accounts {
                let flags = key_flags.entry(account.pubkey).or_default();
                flags.is_signer |= account.is_signer;
                flags.is_writable |= account.is_writable;
            }
        }
        // Payer is placed first as a writable signer regardless of its metas
        key_flags.remove(&payer);

        let group = |signer: bool, writable: bool| {
            key_flags
                .iter()
                .filter(move |(_, f)| f.is_signer == signer && f.is_writable == writable)
                .map(|(key, _)| *key)
                .collect::<Vec<_>>()
        };
        let writable_signers = group(true, true);
        let readonly_signers = group(true, false);
        let writable_unsigned = group(false, true);
        let readonly_unsigned = group(false, false);

        let try_into_u8 = |count: usize| {
            u8::try_from(count).map_err(|_| {
                GravityError::InvalidTransaction(format!("{} accounts overflow a u8 index", count))
            })
        };

        let header = MessageHeader::new(
            try_into_u8(1 + writable_signers.len() + readonly_signers.len())?,
            try_into_u8(readonly_signers.len())?,
            try_into_u8(readonly_unsigned.len())?,
        );

        let account_keys: Vec<Pubkey> = std::iter::once(payer)
            .chain(writable_signers)
            .chain(readonly_signers)
            .chain(writable_unsigned)
            .chain(readonly_unsigned)
            .collect();
        if account_keys.len() > u8::MAX as usize + 1 {
            return Err(GravityError::InvalidTransaction(format!(
                "{} account keys exceed the 256 addressable slots",
                account_keys.len()
            )));
        }

        let index_of: HashMap<Pubkey, u8> = account_keys
            .iter()
            .enumerate()
            .map(|(i, key)| (*key, i as u8))
            .collect();
        let lookup = |key: &Pubkey| {
            index_of.get(key).copied().ok_or_else(|| {
                GravityError::InvalidInstruction(format!("account {} not found in message", key))
            })
        };

        let instructions = self
            .instructions
            .iter()
            .map(|instruction| -> Result<CompiledInstruction> {
                Ok(CompiledInstruction {
                    program_id_index: lookup(&instruction.program_id)?,
                    account_indices: instruction
                        .accounts
                        .iter()
                        .map(|account| lookup(&account.pubkey))
                        .collect::<Result<Vec<_>>>()?,
                    data: instruction.data.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Message {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }
}

/// A message together with the signatures of its required signers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub message: Message,
    pub signatures: HashMap<Pubkey, Signature>,
}

impl SignedTransaction {
    /// Sign the canonical message bytes with every keypair.
    ///
    /// Each keypair must belong to a required signer and every required signer
    /// must be covered.
    pub fn sign(message: Message, signers: &[&Keypair]) -> Result<Self> {
        let message_bytes = message.serialize()?;
        let required = message.signer_keys();

        let mut signatures = HashMap::with_capacity(signers.len());
        for signer in signers {
            let pubkey = signer.pubkey();
            if !required.contains(&pubkey) {
                return Err(GravityError::SignatureError(format!(
                    "{} is not a required signer of this message",
                    pubkey
                )));
            }
            let signature = signer
                .try_sign_message(&message_bytes)
                .map_err(|e| GravityError::SignatureError(e.to_string()))?;
            signatures.insert(pubkey, signature);
        }

        if let Some(missing) = required.iter().find(|key| !signatures.contains_key(key)) {
            return Err(GravityError::SignatureError(format!(
                "missing signer {}",
                missing
            )));
        }

        Ok(Self {
            message,
            signatures,
        })
    }

    /// Signatures in wire order
    pub fn ordered_signatures(&self) -> Result<Vec<Signature>> {
        self.message
            .signer_keys()
            .iter()
            .map(|key| {
                self.signatures.get(key).copied().ok_or_else(|| {
                    GravityError::SerializationError(format!("no signature for signer {}", key))
                })
            })
            .collect()
    }

    /// Wire format: compact-u16 signature count, signatures, message bytes
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let signatures = self.ordered_signatures()?;
        let mut bytes = Vec::with_capacity(
            compact_u16_size(signatures.len()) + signatures.len() * 64 + self.message.byte_size(),
        );

        encode_compact_u16(signatures.len(), &mut bytes)?;
        for signature in &signatures {
            bytes.extend_from_slice(signature.as_ref());
        }
        self.message.serialize_bytes(&mut bytes)?;

        Ok(bytes)
    }

    /// Decode a transaction from wire bytes
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);

        let num_signatures = decode_compact_u16(&mut cursor)?;
        let signatures = (0..num_signatures)
            .map(|_| decode_array::<64>(&mut cursor).map(Signature::from))
            .collect::<Result<Vec<_>>>()?;

        let message = Message::deserialize_from(&mut cursor)?;
        if (cursor.position() as usize) != bytes.len() {
            return Err(GravityError::DeserializationError(format!(
                "{} trailing bytes after message",
                bytes.len() - cursor.position() as usize
            )));
        }

        let signer_keys = message.signer_keys();
        if signer_keys.len() != signatures.len() {
            return Err(GravityError::DeserializationError(format!(
                "{} signatures for {} required signers",
                signatures.len(),
                signer_keys.len()
            )));
        }
        let signatures = signer_keys.iter().copied().zip(signatures).collect();

        Ok(Self {
            message,
            signatures,
        })
    }

    /// Check every signature against the canonical message bytes
    pub fn verify(&self) -> Result<bool> {
        let message_bytes = self.message.serialize()?;
        Ok(self.ordered_signatures()?.iter().zip(self.message.signer_keys()).all(
            |(signature, key)| signature.verify(key.as_ref(), &message_bytes),
        ))
    }
}
