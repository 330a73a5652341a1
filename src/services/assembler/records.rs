// SPDX-License-Identifier: MIT

//! Wire encoders for the two record shapes the executor understands. All
//! fields are big-endian; every offset must point inside the record's own
//! payload or encoding fails.

use crate::common::encode::{
    find_address, find_amount, put_u128_be, put_u16_be, put_u32_be, put_u64_be,
};
use crate::domain::constants::{
    BPS_FULL, CALLDATA_POS_UNUSED, CALL_RECORD_HEADER_LEN, RETURN_AMOUNT_POS_UNUSED,
    SRC_TOKEN_POS_UNUSED,
};
use crate::domain::descriptor::ResolvedDexCall;
use crate::domain::error::BuildError;
use crate::services::flags::{BalanceMode, Flag};
use alloy::primitives::Address;

/// One low-level call, serialized as a 32-byte header followed by calldata:
/// target 20B | calldataLength 4B | fromAmountPos 2B | destTokenPos 2B |
/// returnAmountPos 1B | specialFlag 1B | flag 2B | calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledCallRecord {
    pub target: Address,
    pub from_amount_pos: u16,
    pub dest_token_pos: u16,
    pub return_amount_pos: u8,
    pub special_flag: u8,
    pub flag: Flag,
    pub calldata: Vec<u8>,
}

impl AssembledCallRecord {
    /// Plain record with no offsets; used for approval/transfer/wrap calls.
    pub fn simple(target: Address, calldata: Vec<u8>, flag: Flag) -> Self {
        Self {
            target,
            from_amount_pos: CALLDATA_POS_UNUSED,
            dest_token_pos: CALLDATA_POS_UNUSED,
            return_amount_pos: RETURN_AMOUNT_POS_UNUSED,
            special_flag: 0,
            flag,
            calldata,
        }
    }

    /// Builds the record for a resolved dex call under its final flag,
    /// locating the offsets the flag's modes require. `balance_token` is the
    /// token whose post-call balance the executor reads when the balance
    /// mode demands a dest-token check.
    pub fn from_dex_call(
        call: &ResolvedDexCall,
        flag: Flag,
        balance_token: Address,
    ) -> Result<Self, BuildError> {
        let calldata = call.descriptor.calldata.to_vec();

        let from_amount_pos = if flag.inserts_amount() {
            match call.descriptor.insert_from_amount_pos {
                Some(pos) => pos,
                None => {
                    let pos =
                        find_amount(&calldata, call.src_amount).ok_or_else(|| {
                            BuildError::OffsetNotFound {
                                what: "from-amount".to_string(),
                            }
                        })?;
                    u16::try_from(pos).map_err(|_| {
                        BuildError::FieldOverflow("fromAmountPos exceeds u16".to_string())
                    })?
                }
            }
        } else {
            CALLDATA_POS_UNUSED
        };

        let dest_token_pos = if flag.balance_mode() == BalanceMode::CheckDestToken {
            let pos = find_address(&calldata, balance_token).ok_or_else(|| {
                BuildError::OffsetNotFound {
                    what: format!("dest token {balance_token}"),
                }
            })?;
            u16::try_from(pos)
                .map_err(|_| BuildError::FieldOverflow("destTokenPos exceeds u16".to_string()))?
        } else {
            CALLDATA_POS_UNUSED
        };

        Ok(Self {
            target: call.descriptor.target_address,
            from_amount_pos,
            dest_token_pos,
            return_amount_pos: call
                .descriptor
                .return_amount_pos
                .unwrap_or(RETURN_AMOUNT_POS_UNUSED),
            special_flag: call
                .descriptor
                .special_flag
                .map(|f| f.wire_value())
                .unwrap_or(0),
            flag,
            calldata,
        })
    }

    pub fn encoded_len(&self) -> usize {
        CALL_RECORD_HEADER_LEN + self.calldata.len()
    }

    pub fn encode(&self) -> Result<Vec<u8>, BuildError> {
        let len = u32::try_from(self.calldata.len())
            .map_err(|_| BuildError::FieldOverflow("calldata exceeds u32 length".to_string()))?;
        check_pos(
            "fromAmountPos",
            self.from_amount_pos,
            32,
            self.calldata.len(),
        )?;
        check_pos(
            "destTokenPos",
            self.dest_token_pos,
            20,
            self.calldata.len(),
        )?;

        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(self.target.as_slice());
        put_u32_be(&mut out, len);
        put_u16_be(&mut out, self.from_amount_pos);
        put_u16_be(&mut out, self.dest_token_pos);
        out.push(self.return_amount_pos);
        out.push(self.special_flag);
        put_u16_be(&mut out, self.flag.0);
        out.extend_from_slice(&self.calldata);
        Ok(out)
    }
}

fn check_pos(what: &str, pos: u16, width: usize, len: usize) -> Result<(), BuildError> {
    if pos == CALLDATA_POS_UNUSED {
        return Ok(());
    }
    let end = usize::from(pos) + width;
    if end > len {
        return Err(BuildError::OffsetOutOfRange {
            what: what.to_string(),
            offset: usize::from(pos),
            len,
        });
    }
    Ok(())
}

/// Wraps `payload` as one vertical-branch record: totalSize 16B |
/// srcTokenPos 8B | percentageBps 8B | payload. A branch consuming 100% of
/// its input needs no split and carries the srcTokenPos sentinel; the same
/// goes for a raw-native input (`src_token` = None), which the executor
/// splits by attached value. Otherwise the shared input token must be
/// locatable inside the payload.
pub fn encode_vertical_branch(
    percent_bps: u64,
    src_token: Option<Address>,
    payload: &[u8],
) -> Result<Vec<u8>, BuildError> {
    let src_token_pos = match src_token {
        _ if percent_bps >= BPS_FULL => SRC_TOKEN_POS_UNUSED,
        None => SRC_TOKEN_POS_UNUSED,
        Some(token) => {
            let pos = find_address(payload, token).ok_or_else(|| BuildError::OffsetNotFound {
                what: format!("shared input token {token}"),
            })?;
            pos as u64
        }
    };

    let total = u128::try_from(payload.len())
        .map_err(|_| BuildError::FieldOverflow("branch payload exceeds u128".to_string()))?;
    let mut out = Vec::with_capacity(32 + payload.len());
    put_u128_be(&mut out, total);
    put_u64_be(&mut out, src_token_pos);
    put_u64_be(&mut out, percent_bps);
    out.extend_from_slice(payload);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::BRANCH_RECORD_HEADER_LEN;
    use crate::domain::descriptor::DexCallDescriptor;
    use alloy::primitives::{address, Bytes, U256};

    #[test]
    fn call_record_layout_is_byte_exact() {
        let target = address!("4242424242424242424242424242424242424242");
        let record = AssembledCallRecord {
            target,
            from_amount_pos: 4,
            dest_token_pos: 0,
            return_amount_pos: RETURN_AMOUNT_POS_UNUSED,
            special_flag: 2,
            flag: Flag::INSERT_DONT_CHECK,
            calldata: vec![0xde; 40],
        };
        let bytes = record.encode().unwrap();
        assert_eq!(bytes.len(), CALL_RECORD_HEADER_LEN + 40);
        assert_eq!(&bytes[..20], target.as_slice());
        assert_eq!(&bytes[20..24], &40u32.to_be_bytes());
        assert_eq!(&bytes[24..26], &4u16.to_be_bytes());
        assert_eq!(&bytes[26..28], &0u16.to_be_bytes());
        assert_eq!(bytes[28], RETURN_AMOUNT_POS_UNUSED);
        assert_eq!(bytes[29], 2);
        assert_eq!(&bytes[30..32], &3u16.to_be_bytes());
        assert_eq!(&bytes[32..], &[0xde; 40]);
    }

    #[test]
    fn out_of_range_offset_is_fatal() {
        let record = AssembledCallRecord {
            target: Address::ZERO,
            from_amount_pos: 10,
            dest_token_pos: 0,
            return_amount_pos: RETURN_AMOUNT_POS_UNUSED,
            special_flag: 0,
            flag: Flag::INSERT_DONT_CHECK,
            calldata: vec![0u8; 20],
        };
        assert!(matches!(
            record.encode().unwrap_err(),
            BuildError::OffsetOutOfRange { .. }
        ));
    }

    #[test]
    fn from_dex_call_locates_amount_bytes() {
        let amount = U256::from(123_456u64);
        let mut calldata = vec![0x11, 0x22, 0x33, 0x44];
        calldata.extend_from_slice(&amount.to_be_bytes::<32>());
        let call = ResolvedDexCall {
            descriptor: DexCallDescriptor::plain(
                address!("1111111111111111111111111111111111111111"),
                Bytes::from(calldata),
            ),
            need_wrap_native: false,
            src_amount: amount,
            dest_amount: U256::from(1u64),
        };
        let record =
            AssembledCallRecord::from_dex_call(&call, Flag::INSERT_DONT_CHECK, Address::ZERO)
                .unwrap();
        assert_eq!(record.from_amount_pos, 4);
    }

    #[test]
    fn missing_amount_bytes_are_fatal_when_inserting() {
        let call = ResolvedDexCall {
            descriptor: DexCallDescriptor::plain(
                address!("1111111111111111111111111111111111111111"),
                Bytes::from(vec![0u8; 8]),
            ),
            need_wrap_native: false,
            src_amount: U256::from(77u64),
            dest_amount: U256::from(1u64),
        };
        assert!(matches!(
            AssembledCallRecord::from_dex_call(&call, Flag::INSERT_DONT_CHECK, Address::ZERO)
                .unwrap_err(),
            BuildError::OffsetNotFound { .. }
        ));
    }

    #[test]
    fn vertical_branch_sentinel_on_full_consumption() {
        let payload = vec![0xaa; 10];
        let bytes = encode_vertical_branch(BPS_FULL, None, &payload).unwrap();
        assert_eq!(bytes.len(), BRANCH_RECORD_HEADER_LEN + 10);
        assert_eq!(&bytes[..16], &10u128.to_be_bytes());
        assert_eq!(&bytes[16..24], &SRC_TOKEN_POS_UNUSED.to_be_bytes());
        assert_eq!(&bytes[24..32], &BPS_FULL.to_be_bytes());
    }

    #[test]
    fn vertical_branch_locates_shared_token() {
        let token = address!("cccccccccccccccccccccccccccccccccccccccc");
        let mut payload = vec![0u8; 6];
        payload.extend_from_slice(token.as_slice());
        let bytes = encode_vertical_branch(5_000, Some(token), &payload).unwrap();
        assert_eq!(&bytes[16..24], &6u64.to_be_bytes());

        assert!(matches!(
            encode_vertical_branch(5_000, Some(token), &[0u8; 4]).unwrap_err(),
            BuildError::OffsetNotFound { .. }
        ));

        // Raw-native inputs are split by value, not by token offset.
        let native = encode_vertical_branch(5_000, None, &payload).unwrap();
        assert_eq!(&native[16..24], &SRC_TOKEN_POS_UNUSED.to_be_bytes());
    }
}
