// SPDX-License-Identifier: MIT

use alloy::primitives::{address, Address};
use lazy_static::lazy_static;
use std::collections::HashMap;

// =============================================================================
// NATIVE / WRAPPED ASSETS
// =============================================================================

/// Placeholder address plans use for the chain's native asset.
pub const NATIVE_TOKEN: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

pub const WETH_MAINNET: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const WETH_OPTIMISM: Address = address!("4200000000000000000000000000000000000006");
pub const WETH_ARBITRUM: Address = address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1");
pub const WETH_POLYGON: Address = address!("7ceB23fD6bC0adD59E62ac25578270cFf1b9f619");
pub const WBNB_BSC: Address = address!("BB4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c");

pub const CHAIN_ETHEREUM: u64 = 1;
pub const CHAIN_OPTIMISM: u64 = 10;
pub const CHAIN_BSC: u64 = 56;
pub const CHAIN_POLYGON: u64 = 137;
pub const CHAIN_ARBITRUM: u64 = 42161;

lazy_static! {
    pub static ref WRAPPED_NATIVE_BY_CHAIN: HashMap<u64, Address> = {
        let mut m = HashMap::new();
        m.insert(CHAIN_ETHEREUM, WETH_MAINNET);
        m.insert(CHAIN_OPTIMISM, WETH_OPTIMISM);
        m.insert(CHAIN_BSC, WBNB_BSC);
        m.insert(CHAIN_POLYGON, WETH_POLYGON);
        m.insert(CHAIN_ARBITRUM, WETH_ARBITRUM);
        m
    };
}

pub fn wrapped_native_for_chain(chain_id: u64) -> Option<Address> {
    WRAPPED_NATIVE_BY_CHAIN.get(&chain_id).copied()
}

pub fn is_native(token: Address) -> bool {
    token == NATIVE_TOKEN || token == Address::ZERO
}

// =============================================================================
// PERCENTAGES
// =============================================================================

/// 100% expressed in basis points.
pub const BPS_FULL: u64 = 10_000;

/// Default tolerance for fan-out percentage sums.
pub const DEFAULT_PERCENT_TOLERANCE_BPS: u64 = 1;

// =============================================================================
// RECORD LAYOUT
// =============================================================================

/// Fixed header bytes of an `AssembledCallRecord`:
/// target 20 + calldataLength 4 + fromAmountPos 2 + destTokenPos 2
/// + returnAmountPos 1 + specialFlag 1 + flag 2.
pub const CALL_RECORD_HEADER_LEN: usize = 32;

/// Fixed header bytes of a `VerticalBranchRecord`:
/// totalSize 16 + srcTokenPos 8 + percentageBps 8.
pub const BRANCH_RECORD_HEADER_LEN: usize = 32;

/// Byte length of the outermost envelope's size prefix.
pub const ENVELOPE_PREFIX_LEN: usize = 4;

/// srcTokenPos value meaning "no offset; this branch consumes 100% of its input".
pub const SRC_TOKEN_POS_UNUSED: u64 = u64::MAX;

/// returnAmountPos value meaning "no return amount".
pub const RETURN_AMOUNT_POS_UNUSED: u8 = u8::MAX;

/// fromAmountPos / destTokenPos value meaning "unused". Offset 0 is never a
/// valid argument position because calldata starts with a 4-byte selector.
pub const CALLDATA_POS_UNUSED: u16 = 0;

// =============================================================================
// WIRE FLAG TABLE
// =============================================================================
// The deployed executor only inspects flag mod 4 (amount handling) and
// flag mod 3 (post-call balance check), but these exact representatives are
// the wire contract shared with it. Changing a value here is a breaking
// protocol change, not a refactor.

pub const FLAG_DONT_INSERT_DONT_CHECK: u16 = 0;
pub const FLAG_INSERT_DONT_CHECK: u16 = 3;
pub const FLAG_DONT_INSERT_CHECK_NATIVE: u16 = 4;
pub const FLAG_SEND_NATIVE_CHECK_SRC_BALANCE: u16 = 5;
pub const FLAG_INSERT_CHECK_NATIVE: u16 = 7;
pub const FLAG_DONT_INSERT_CHECK_SRC_BALANCE: u16 = 8;
pub const FLAG_SEND_NATIVE_DONT_CHECK: u16 = 9;
pub const FLAG_INSERT_CHECK_SRC_BALANCE: u16 = 11;
pub const FLAG_SEND_NATIVE_PLUS_INSERT_CHECK_SRC_BALANCE: u16 = 14;
pub const FLAG_SEND_NATIVE_PLUS_INSERT_DONT_CHECK: u16 = 18;

// =============================================================================
// ERC-20 SELECTORS
// =============================================================================

/// approve(address,uint256)
pub const SELECTOR_APPROVE: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];
/// transfer(address,uint256)
pub const SELECTOR_TRANSFER: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_table_residues_are_consistent() {
        // (flag, amount-mode, balance-mode)
        let table = [
            (FLAG_DONT_INSERT_DONT_CHECK, 0, 0),
            (FLAG_INSERT_DONT_CHECK, 3, 0),
            (FLAG_DONT_INSERT_CHECK_NATIVE, 0, 1),
            (FLAG_SEND_NATIVE_CHECK_SRC_BALANCE, 1, 2),
            (FLAG_INSERT_CHECK_NATIVE, 3, 1),
            (FLAG_DONT_INSERT_CHECK_SRC_BALANCE, 0, 2),
            (FLAG_SEND_NATIVE_DONT_CHECK, 1, 0),
            (FLAG_INSERT_CHECK_SRC_BALANCE, 3, 2),
            (FLAG_SEND_NATIVE_PLUS_INSERT_CHECK_SRC_BALANCE, 2, 2),
            (FLAG_SEND_NATIVE_PLUS_INSERT_DONT_CHECK, 2, 0),
        ];
        for (flag, amount, balance) in table {
            assert_eq!(flag % 4, amount, "amount residue for flag {flag}");
            assert_eq!(flag % 3, balance, "balance residue for flag {flag}");
        }
    }

    #[test]
    fn native_placeholder_detection() {
        assert!(is_native(NATIVE_TOKEN));
        assert!(is_native(Address::ZERO));
        assert!(!is_native(WETH_MAINNET));
    }

    #[test]
    fn wrapped_native_lookup() {
        assert_eq!(wrapped_native_for_chain(CHAIN_ETHEREUM), Some(WETH_MAINNET));
        assert_eq!(wrapped_native_for_chain(999), None);
    }
}
