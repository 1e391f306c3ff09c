//! Signer slots across message versions
//!
//! Pool and swap services may return Legacy or V0 messages. Partial signing
//! only needs the static keys and the signature count from either.

use solana_sdk::{message::VersionedMessage, pubkey::Pubkey};

/// Static account keys; V0 lookup-table addresses are not included
#[inline]
#[must_use]
pub fn static_keys(message: &VersionedMessage) -> &[Pubkey] {
    message.static_account_keys()
}

/// Number of signature slots the message expects
#[inline]
#[must_use]
pub fn signature_count(message: &VersionedMessage) -> usize {
    message.header().num_required_signatures as usize
}

/// Keys that must sign, in slot order
#[must_use]
pub fn signers(message: &VersionedMessage) -> &[Pubkey] {
    let keys = static_keys(message);
    &keys[..signature_count(message).min(keys.len())]
}

/// Slot `signer` signs into, or `None` if it is not asked to sign
#[must_use]
pub fn signer_slot(message: &VersionedMessage, signer: &Pubkey) -> Option<usize> {
    signers(message).iter().position(|key| key == signer)
}
