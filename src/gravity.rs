//! Gravity contract initialization instruction
//!
//! The Gravity program reads its init payload positionally:
//!
//! ```text
//! opcode (u8) | bft (u8) | consul_0 .. consul_n (32 bytes each) | round (u64 LE)
//! ```
//!
//! There is no length prefix in front of the consuls. The program derives their
//! count from the payload length, so the encoded size is always
//! `10 + 32 * consuls.len()`.

use crate::error::{GravityError, Result};
use crate::instruction::{Instruction, InstructionEncoder};
use crate::serialization::{decode_pubkey, decode_u64, decode_u8};
use borsh::BorshSerialize;
use solana_sdk::pubkey::Pubkey;
use std::io::{Cursor, Write};

/// Opcode the Gravity program dispatches to its init handler
pub const INIT_CONTRACT_OPCODE: u8 = 0;

/// Upper bound on the consul set accepted by the program
pub const MAX_CONSULS: usize = 5;

/// Payload size without any consul
const FIXED_PAYLOAD_LEN: usize = 1 + 1 + 8;

/// Init payload for the Gravity contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitContractPayload {
    pub opcode: u8,
    pub bft_threshold: u8,
    consuls: Vec<Pubkey>,
    pub round: u64,
}

impl InitContractPayload {
    pub fn new(opcode: u8, bft_threshold: u8, consuls: Vec<Pubkey>, round: u64) -> Result<Self> {
        if consuls.is_empty() || consuls.len() > MAX_CONSULS {
            return Err(GravityError::EncodingError(format!(
                "consul set must hold 1..={} keys, got {}",
                MAX_CONSULS,
                consuls.len()
            )));
        }

        Ok(Self {
            opcode,
            bft_threshold,
            consuls,
            round,
        })
    }

    pub fn consuls(&self) -> &[Pubkey] {
        &self.consuls
    }

    pub fn encoded_len(&self) -> usize {
        FIXED_PAYLOAD_LEN + 32 * self.consuls.len()
    }

    /// Encode into the byte layout the program expects
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(self.encoded_len());
        BorshSerialize::serialize(self, &mut data)
            .map_err(|e| GravityError::EncodingError(e.to_string()))?;
        Ok(data)
    }

    /// Parse an encoded payload, inferring the consul count from its length
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let consul_bytes = bytes.len().checked_sub(FIXED_PAYLOAD_LEN).ok_or_else(|| {
            GravityError::DeserializationError(format!(
                "payload of {} bytes is shorter than {}",
                bytes.len(),
                FIXED_PAYLOAD_LEN
            ))
        })?;
        if consul_bytes % 32 != 0 {
            return Err(GravityError::DeserializationError(format!(
                "consul block of {} bytes is not a multiple of 32",
                consul_bytes
            )));
        }

        let mut cursor = Cursor::new(bytes);
        let opcode = decode_u8(&mut cursor)?;
        let bft_threshold = decode_u8(&mut cursor)?;
        let consuls = (0..consul_bytes / 32)
            .map(|_| decode_pubkey(&mut cursor))
            .collect::<Result<Vec<_>>>()?;
        let round = decode_u64(&mut cursor)?;

        Self::new(opcode, bft_threshold, consuls, round)
            .map_err(|e| GravityError::DeserializationError(e.to_string()))
    }
}

impl BorshSerialize for InitContractPayload {
    fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        BorshSerialize::serialize(&self.opcode, writer)?;
        BorshSerialize::serialize(&self.bft_threshold, writer)?;
        for consul in &self.consuls {
            writer.write_all(consul.as_ref())?;
        }
        BorshSerialize::serialize(&self.round, writer)
    }
}

/// Accounts touched by the init instruction
#[derive(Debug, Clone, Copy)]
pub struct InitContractAccounts {
    pub payer: Pubkey,
    pub data_account: Pubkey,
    pub multisig_account: Pubkey,
}

/// Build the init instruction around an already encoded payload.
///
/// The program indexes accounts positionally: payer (signer, read-only), then
/// the contract data account and the multisig account (both writable). Callers
/// are responsible for passing distinct accounts.
pub fn new_init_contract_instruction(
    accounts: &InitContractAccounts,
    program_id: Pubkey,
    data: Vec<u8>,
) -> Instruction {
    InstructionEncoder::new(program_id)
        .signer(accounts.payer, false)
        .writable(accounts.data_account, false)
        .writable(accounts.multisig_account, false)
        .data(data)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::AccountMeta;

    fn payer_only(consul: Pubkey) -> InitContractPayload {
        InitContractPayload::new(INIT_CONTRACT_OPCODE, 1, vec![consul], 0).unwrap()
    }

    #[test]
    fn test_single_consul_layout() {
        let consul = Pubkey::new_from_array([0xAB; 32]);
        let data = payer_only(consul).encode().unwrap();

        assert_eq!(data.len(), 1 + 1 + 32 + 8);
        assert_eq!(data[0], 0x00);
        assert_eq!(data[1], 0x01);
        assert_eq!(&data[2..34], consul.as_ref());
        assert_eq!(&data[34..42], &0u64.to_le_bytes());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let payload = payer_only(Pubkey::new_unique());
        let first = payload.encode().unwrap();
        assert_eq!(first, payload.encode().unwrap());
        assert_eq!(first, payload.clone().encode().unwrap());
    }

    #[test]
    fn test_layout_scales_with_consuls() {
        let consuls: Vec<Pubkey> = (0..MAX_CONSULS).map(|_| Pubkey::new_unique()).collect();
        let payload = InitContractPayload::new(0, 3, consuls.clone(), 0x0102_0304_0506_0708).unwrap();
        let data = payload.encode().unwrap();

        assert_eq!(data.len(), 2 + 32 * MAX_CONSULS + 8);
        assert_eq!(data.len(), payload.encoded_len());
        for (i, consul) in consuls.iter().enumerate() {
            assert_eq!(&data[2 + 32 * i..2 + 32 * (i + 1)], consul.as_ref());
        }
        assert_eq!(&data[data.len() - 8..], &[8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_consul_set_bounds() {
        assert!(matches!(
            InitContractPayload::new(0, 1, vec![], 0),
            Err(GravityError::EncodingError(_))
        ));
        let too_many: Vec<Pubkey> = (0..MAX_CONSULS + 1).map(|_| Pubkey::new_unique()).collect();
        assert!(InitContractPayload::new(0, 1, too_many, 0).is_err());
    }

    #[test]
    fn test_decode_encoded_payload() {
        let payload = InitContractPayload::new(
            INIT_CONTRACT_OPCODE,
            2,
            vec![Pubkey::new_unique(), Pubkey::new_unique()],
            9,
        )
        .unwrap();
        let decoded = InitContractPayload::decode(&payload.encode().unwrap()).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_decode_rejects_bad_lengths() {
        assert!(InitContractPayload::decode(&[0u8; 9]).is_err());
        assert!(InitContractPayload::decode(&[0u8; 10]).is_err());
        assert!(InitContractPayload::decode(&[0u8; 43]).is_err());
        assert!(InitContractPayload::decode(&[0u8; 10 + 32 * 6]).is_err());
    }

    #[test]
    fn test_account_ordering() {
        let accounts = InitContractAccounts {
            payer: Pubkey::new_from_array([9; 32]),
            data_account: Pubkey::new_from_array([1; 32]),
            multisig_account: Pubkey::new_from_array([5; 32]),
        };
        let program_id = Pubkey::new_unique();
        let instruction = new_init_contract_instruction(&accounts, program_id, vec![0, 1]);

        assert_eq!(instruction.program_id, program_id);
        assert_eq!(
            instruction.accounts,
            vec![
                AccountMeta::new(accounts.payer, true, false),
                AccountMeta::new(accounts.data_account, false, true),
                AccountMeta::new(accounts.multisig_account, false, true),
            ]
        );
        assert_eq!(instruction.data, vec![0, 1]);
    }
}
