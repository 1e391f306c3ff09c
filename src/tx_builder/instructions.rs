//! Instruction planning for the launch's own instructions
//!
//! The pool and swap services produce the program instructions. The
//! launcher only adds two of its own: the relay tip transfer and the
//! associated-token-account creation of the pre-step.

use crate::compat;
use crate::tx_builder::errors::TransactionBuilderError;
use solana_sdk::{
    instruction::Instruction, pubkey::Pubkey, system_program,
    transaction::VersionedTransaction,
};
#[allow(deprecated)]
use solana_sdk::system_instruction;
use spl_associated_token_account::{
    get_associated_token_address_with_program_id,
    instruction::create_associated_token_account_idempotent,
};

/// Transfer of the relay tip from `payer` to `tip_account`
pub fn tip_instruction(
    payer: &Pubkey,
    tip_account: &Pubkey,
    lamports: u64,
) -> Result<Instruction, TransactionBuilderError> {
    if lamports == 0 {
        return Err(TransactionBuilderError::instruction_failed(
            "system",
            "tip amount must be positive",
        ));
    }
    if payer == tip_account {
        return Err(TransactionBuilderError::instruction_failed(
            "system",
            "tip account equals payer",
        ));
    }
    Ok(system_instruction::transfer(payer, tip_account, lamports))
}

/// Associated token account of `owner` for `mint`
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> Pubkey {
    get_associated_token_address_with_program_id(owner, mint, token_program)
}

/// Idempotent creation of `owner`'s associated token account, paid by `owner`
pub fn create_token_account_instruction(
    owner: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
) -> Instruction {
    create_associated_token_account_idempotent(owner, owner, mint, token_program)
}

/// Whether `tx` carries a system transfer of at least `lamports` to `account`
pub fn pays_to(tx: &VersionedTransaction, account: &Pubkey, lamports: u64) -> bool {
    let keys = compat::static_keys(&tx.message);
    let Some(target) = keys.iter().position(|k| k == account) else {
        return false;
    };

    tx.message.instructions().iter().any(|ix| {
        let program = keys.get(ix.program_id_index as usize);
        if program != Some(&system_program::id()) {
            return false;
        }
        // System transfer: u32 tag 2 followed by u64 lamports
        if ix.data.len() != 12 || ix.data[..4] != 2u32.to_le_bytes() {
            return false;
        }
        let mut amount = [0u8; 8];
        amount.copy_from_slice(&ix.data[4..12]);
        ix.accounts.get(1).map(|i| *i as usize) == Some(target)
            && u64::from_le_bytes(amount) >= lamports
    })
}
