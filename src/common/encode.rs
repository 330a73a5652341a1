// SPDX-License-Identifier: MIT

//! Low-level byte builders shared by the record encoders. All multi-byte
//! fields on the executor wire are big-endian.

use crate::domain::constants::{SELECTOR_APPROVE, SELECTOR_TRANSFER};
use alloy::primitives::{Address, U256};

pub fn put_u16_be(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub fn put_u32_be(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub fn put_u64_be(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub fn put_u128_be(out: &mut Vec<u8>, v: u128) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// Offset of the first occurrence of `needle` inside `haystack`.
pub fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Offset of the 20-byte `address` inside `payload`.
pub fn find_address(payload: &[u8], address: Address) -> Option<usize> {
    find_subslice(payload, address.as_slice())
}

/// Offset of the 32-byte big-endian encoding of `amount` inside `payload`.
/// Zero amounts are never searched for: a run of 32 zero bytes matches ABI
/// padding everywhere.
pub fn find_amount(payload: &[u8], amount: U256) -> Option<usize> {
    if amount.is_zero() {
        return None;
    }
    find_subslice(payload, &amount.to_be_bytes::<32>())
}

fn abi_call(selector: [u8; 4], address_arg: Address, amount_arg: U256) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 64);
    out.extend_from_slice(&selector);
    out.extend_from_slice(&[0u8; 12]);
    out.extend_from_slice(address_arg.as_slice());
    out.extend_from_slice(&amount_arg.to_be_bytes::<32>());
    out
}

/// approve(spender, amount) calldata.
pub fn approve_calldata(spender: Address, amount: U256) -> Vec<u8> {
    abi_call(SELECTOR_APPROVE, spender, amount)
}

/// transfer(to, amount) calldata. The amount argument starts at byte 36,
/// which is where the executor patches residual balances.
pub fn transfer_calldata(to: Address, amount: U256) -> Vec<u8> {
    abi_call(SELECTOR_TRANSFER, to, amount)
}

/// Byte offset of the amount argument inside [`transfer_calldata`] /
/// [`approve_calldata`] output.
pub const ABI_CALL_AMOUNT_POS: u16 = 36;
