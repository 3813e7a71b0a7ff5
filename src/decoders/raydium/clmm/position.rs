// DANS : src/decoders/raydium/clmm/position.rs

// Les deux comptes de position du CLMM : la position NFT d'un LP (personal) et
// l'agrégat par plage de ticks tenu par le programme (protocol).

use crate::decoders::NormalizedRecord;
use crate::decoders::layout::{self, DISCRIMINATOR_LEN};
use crate::error::DecodeError;
use bytemuck::{Pod, Zeroable};
use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;
use std::mem::{offset_of, size_of};

pub const PERSONAL_NAME: &str = "PersonalPositionState";
pub const PERSONAL_DISCRIMINATOR: [u8; 8] = [70, 111, 150, 126, 230, 15, 25, 117];
pub const PERSONAL_ACCOUNT_LEN: usize = DISCRIMINATOR_LEN + size_of::<PersonalPositionState>();
pub const PERSONAL_POOL_ID_OFFSET: usize = DISCRIMINATOR_LEN + offset_of!(PersonalPositionState, pool_id);

pub const PROTOCOL_NAME: &str = "ProtocolPositionState";
pub const PROTOCOL_DISCRIMINATOR: [u8; 8] = [100, 226, 145, 99, 146, 218, 160, 106];
pub const PROTOCOL_ACCOUNT_LEN: usize = DISCRIMINATOR_LEN + size_of::<ProtocolPositionState>();
pub const PROTOCOL_POOL_ID_OFFSET: usize = DISCRIMINATOR_LEN + offset_of!(ProtocolPositionState, pool_id);

const _: () = assert!(PERSONAL_ACCOUNT_LEN == 281 && PERSONAL_POOL_ID_OFFSET == 41);
const _: () = assert!(PROTOCOL_ACCOUNT_LEN == 225 && PROTOCOL_POOL_ID_OFFSET == 9);

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PositionRewardInfo {
    pub growth_inside_last_x64: u128,
    pub reward_amount_owed: u64,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PersonalPositionState {
    pub bump: u8,
    pub nft_mint: Pubkey,
    pub pool_id: Pubkey,
    pub tick_lower_index: i32,
    pub tick_upper_index: i32,
    pub liquidity: u128,
    pub fee_growth_inside_0_last_x64: u128,
    pub fee_growth_inside_1_last_x64: u128,
    pub token_fees_owed_0: u64,
    pub token_fees_owed_1: u64,
    pub reward_infos: [PositionRewardInfo; 3],
    pub recent_epoch: u64,
    pub padding: [u64; 7],
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ProtocolPositionState {
    pub bump: u8,
    pub pool_id: Pubkey,
    pub tick_lower_index: i32,
    pub tick_upper_index: i32,
    pub liquidity: u128,
    pub fee_growth_inside_0_last_x64: u128,
    pub fee_growth_inside_1_last_x64: u128,
    pub token_fees_owed_0: u64,
    pub token_fees_owed_1: u64,
    pub reward_growth_inside: [u128; 3],
    pub recent_epoch: u64,
    pub padding: [u64; 7],
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRewardRecord {
    #[serde_as(as = "DisplayFromStr")]
    pub growth_inside_last_x64: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub reward_amount_owed: u64,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalPositionRecord {
    #[serde_as(as = "DisplayFromStr")]
    pub nft_mint: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub pool_id: Pubkey,
    pub tick_lower_index: i32,
    pub tick_upper_index: i32,
    #[serde_as(as = "DisplayFromStr")]
    pub liquidity: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub fee_growth_inside_0_last_x64: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub fee_growth_inside_1_last_x64: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub token_fees_owed_0: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub token_fees_owed_1: u64,
    pub reward_infos: Vec<PositionRewardRecord>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolPositionRecord {
    #[serde_as(as = "DisplayFromStr")]
    pub pool_id: Pubkey,
    pub tick_lower_index: i32,
    pub tick_upper_index: i32,
    #[serde_as(as = "DisplayFromStr")]
    pub liquidity: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub fee_growth_inside_0_last_x64: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub fee_growth_inside_1_last_x64: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub token_fees_owed_0: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub token_fees_owed_1: u64,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub reward_growth_inside: Vec<u128>,
}

pub fn decode_personal_position(body: &[u8]) -> Result<PersonalPositionRecord, DecodeError> {
    let raw: PersonalPositionState = layout::read_layout(PERSONAL_NAME, body)?;
    let rewards = raw.reward_infos;

    Ok(PersonalPositionRecord {
        nft_mint: raw.nft_mint,
        pool_id: raw.pool_id,
        tick_lower_index: raw.tick_lower_index,
        tick_upper_index: raw.tick_upper_index,
        liquidity: raw.liquidity,
        fee_growth_inside_0_last_x64: raw.fee_growth_inside_0_last_x64,
        fee_growth_inside_1_last_x64: raw.fee_growth_inside_1_last_x64,
        token_fees_owed_0: raw.token_fees_owed_0,
        token_fees_owed_1: raw.token_fees_owed_1,
        reward_infos: rewards
            .into_iter()
            .map(|reward| PositionRewardRecord {
                growth_inside_last_x64: reward.growth_inside_last_x64,
                reward_amount_owed: reward.reward_amount_owed,
            })
            .collect(),
    })
}

pub fn decode_protocol_position(body: &[u8]) -> Result<ProtocolPositionRecord, DecodeError> {
    let raw: ProtocolPositionState = layout::read_layout(PROTOCOL_NAME, body)?;
    let growth = raw.reward_growth_inside;

    Ok(ProtocolPositionRecord {
        pool_id: raw.pool_id,
        tick_lower_index: raw.tick_lower_index,
        tick_upper_index: raw.tick_upper_index,
        liquidity: raw.liquidity,
        fee_growth_inside_0_last_x64: raw.fee_growth_inside_0_last_x64,
        fee_growth_inside_1_last_x64: raw.fee_growth_inside_1_last_x64,
        token_fees_owed_0: raw.token_fees_owed_0,
        token_fees_owed_1: raw.token_fees_owed_1,
        reward_growth_inside: growth.to_vec(),
    })
}

pub(crate) fn decode_personal_record(body: &[u8]) -> Result<NormalizedRecord, DecodeError> {
    decode_personal_position(body).map(NormalizedRecord::RaydiumPersonalPosition)
}

pub(crate) fn decode_protocol_record(body: &[u8]) -> Result<NormalizedRecord, DecodeError> {
    decode_protocol_position(body).map(NormalizedRecord::RaydiumProtocolPosition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn personal_position_fields_come_from_their_own_offsets() {
        let body = fixtures::patterned(size_of::<PersonalPositionState>());
        let at = fixtures::At(&body);
        let expected = PersonalPositionRecord {
            nft_mint: at.key(1),
            pool_id: at.key(33),
            tick_lower_index: at.i32(65),
            tick_upper_index: at.i32(69),
            liquidity: at.u128(73),
            fee_growth_inside_0_last_x64: at.u128(89),
            fee_growth_inside_1_last_x64: at.u128(105),
            token_fees_owed_0: at.u64(121),
            token_fees_owed_1: at.u64(129),
            reward_infos: [137, 161, 185]
                .into_iter()
                .map(|base| PositionRewardRecord {
                    growth_inside_last_x64: at.u128(base),
                    reward_amount_owed: at.u64(base + 16),
                })
                .collect(),
        };

        assert_eq!(body.len(), 273);
        assert_eq!(decode_personal_position(&body).unwrap(), expected);
    }

    #[test]
    fn protocol_position_fields_come_from_their_own_offsets() {
        let body = fixtures::patterned(size_of::<ProtocolPositionState>());
        let at = fixtures::At(&body);
        let expected = ProtocolPositionRecord {
            pool_id: at.key(1),
            tick_lower_index: at.i32(33),
            tick_upper_index: at.i32(37),
            liquidity: at.u128(41),
            fee_growth_inside_0_last_x64: at.u128(57),
            fee_growth_inside_1_last_x64: at.u128(73),
            token_fees_owed_0: at.u64(89),
            token_fees_owed_1: at.u64(97),
            reward_growth_inside: at.u128s(105, 3),
        };

        assert_eq!(body.len(), 217);
        assert_eq!(decode_protocol_position(&body).unwrap(), expected);
    }

    #[test]
    fn personal_position_keeps_its_pool_and_range() {
        let mut raw = PersonalPositionState::zeroed();
        raw.pool_id = Pubkey::new_unique();
        raw.nft_mint = Pubkey::new_unique();
        raw.tick_lower_index = -120;
        raw.tick_upper_index = 240;
        raw.liquidity = 1 << 100;
        let mut rewards = raw.reward_infos;
        rewards[2].reward_amount_owed = 42;
        raw.reward_infos = rewards;

        let bytes = bytemuck::bytes_of(&raw);
        assert_eq!(&bytes[PERSONAL_POOL_ID_OFFSET - DISCRIMINATOR_LEN..][..32], raw.pool_id.as_ref());

        let position = decode_personal_position(bytes).unwrap();
        assert_eq!(position.pool_id, raw.pool_id);
        assert_eq!((position.tick_lower_index, position.tick_upper_index), (-120, 240));

        let json = serde_json::to_value(&position).unwrap();
        assert_eq!(json["liquidity"], (1u128 << 100).to_string());
        assert_eq!(json["rewardInfos"][2]["rewardAmountOwed"], "42");
        assert!(json.get("bump").is_none());
    }

    #[test]
    fn protocol_position_growths_are_strings() {
        let mut raw = ProtocolPositionState::zeroed();
        raw.pool_id = Pubkey::new_unique();
        raw.reward_growth_inside = [1, u128::MAX, 3];

        let position = decode_protocol_position(bytemuck::bytes_of(&raw)).unwrap();
        let json = serde_json::to_value(&position).unwrap();
        assert_eq!(json["poolId"], raw.pool_id.to_string());
        assert_eq!(json["rewardGrowthInside"][1], u128::MAX.to_string());
    }
}
