//! Wire encoding of a system-program transfer.
//!
//! Legacy message layout:
//!
//! ```text
//! header        [num_required_signatures, num_readonly_signed, num_readonly_unsigned]
//! account_keys  compact-u16 length, then 32-byte keys
//! blockhash     32 bytes
//! instructions  compact-u16 length, then per instruction:
//!               program_id_index u8, compact accounts, compact data
//! ```
//!
//! A transaction is a compact-u16 signature count, the signatures, then the message.

use bos_types::{Blockhash, ChainAddress, Lamports, Signature};

/// System program instruction discriminant for `Transfer`.
pub const SYSTEM_TRANSFER: u32 = 2;

/// Encoded length of a transfer message.
pub const TRANSFER_MESSAGE_LEN: usize = 150;

/// The signable content of a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferMessage {
    pub from: ChainAddress,
    pub to: ChainAddress,
    pub lamports: Lamports,
    pub recent_blockhash: Blockhash,
}

impl TransferMessage {
    /// Serialize to the legacy message format.
    ///
    /// Account order: sender (signer, writable), recipient (writable), system
    /// program (read-only). Sender and recipient must differ.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(TRANSFER_MESSAGE_LEN);
        out.extend_from_slice(&[1, 0, 1]);

        encode_compact_u16(3, &mut out);
        out.extend_from_slice(self.from.as_bytes());
        out.extend_from_slice(self.to.as_bytes());
        out.extend_from_slice(ChainAddress::SYSTEM_PROGRAM.as_bytes());

        out.extend_from_slice(self.recent_blockhash.as_bytes());

        encode_compact_u16(1, &mut out);
        out.push(2);
        encode_compact_u16(2, &mut out);
        out.extend_from_slice(&[0, 1]);
        let data = transfer_instruction_data(self.lamports);
        encode_compact_u16(data.len() as u16, &mut out);
        out.extend_from_slice(&data);
        out
    }
}

/// `Transfer { lamports }` instruction data: u32 discriminant then u64 amount, little endian.
pub fn transfer_instruction_data(lamports: Lamports) -> [u8; 12] {
    let mut data = [0u8; 12];
    data[..4].copy_from_slice(&SYSTEM_TRANSFER.to_le_bytes());
    data[4..].copy_from_slice(&lamports.raw().to_le_bytes());
    data
}

/// Append a compact-u16 (7 bits per byte, high bit = continuation).
pub fn encode_compact_u16(mut value: u16, out: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// Assemble a single-signer transaction from its signature and message bytes.
pub fn encode_transaction(signature: &Signature, message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + Signature::LEN + message.len());
    encode_compact_u16(1, &mut out);
    out.extend_from_slice(signature.as_bytes());
    out.extend_from_slice(message);
    out
}
