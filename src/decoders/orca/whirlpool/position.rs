use crate::decoders::NormalizedRecord;
use crate::decoders::layout::{self, DISCRIMINATOR_LEN};
use crate::error::DecodeError;
use bytemuck::{Pod, Zeroable};
use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;
use std::mem::{offset_of, size_of};

pub const NAME: &str = "Position";
pub const DISCRIMINATOR: [u8; 8] = [170, 188, 143, 228, 122, 64, 247, 208];

pub const ACCOUNT_LEN: usize = DISCRIMINATOR_LEN + size_of::<PositionData>();
pub const WHIRLPOOL_OFFSET: usize = DISCRIMINATOR_LEN + offset_of!(PositionData, whirlpool);

const _: () = assert!(ACCOUNT_LEN == 216 && WHIRLPOOL_OFFSET == 8);

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PositionRewardInfo {
    pub growth_inside_checkpoint: u128,
    pub amount_owed: u64,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PositionData {
    pub whirlpool: Pubkey,
    pub position_mint: Pubkey,
    pub liquidity: u128,
    pub tick_lower_index: i32,
    pub tick_upper_index: i32,
    pub fee_growth_checkpoint_a: u128,
    pub fee_owed_a: u64,
    pub fee_growth_checkpoint_b: u128,
    pub fee_owed_b: u64,
    pub reward_infos: [PositionRewardInfo; 3],
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRewardRecord {
    #[serde_as(as = "DisplayFromStr")]
    pub growth_inside_checkpoint: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub amount_owed: u64,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhirlpoolPositionRecord {
    #[serde_as(as = "DisplayFromStr")]
    pub whirlpool: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub position_mint: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub liquidity: u128,
    pub tick_lower_index: i32,
    pub tick_upper_index: i32,
    #[serde_as(as = "DisplayFromStr")]
    pub fee_growth_checkpoint_a: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub fee_owed_a: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub fee_growth_checkpoint_b: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub fee_owed_b: u64,
    pub reward_infos: Vec<PositionRewardRecord>,
}

pub fn decode_position(body: &[u8]) -> Result<WhirlpoolPositionRecord, DecodeError> {
    let raw: PositionData = layout::read_layout(NAME, body)?;
    let rewards = raw.reward_infos;

    Ok(WhirlpoolPositionRecord {
        whirlpool: raw.whirlpool,
        position_mint: raw.position_mint,
        liquidity: raw.liquidity,
        tick_lower_index: raw.tick_lower_index,
        tick_upper_index: raw.tick_upper_index,
        fee_growth_checkpoint_a: raw.fee_growth_checkpoint_a,
        fee_owed_a: raw.fee_owed_a,
        fee_growth_checkpoint_b: raw.fee_growth_checkpoint_b,
        fee_owed_b: raw.fee_owed_b,
        reward_infos: rewards
            .into_iter()
            .map(|reward| PositionRewardRecord {
                growth_inside_checkpoint: reward.growth_inside_checkpoint,
                amount_owed: reward.amount_owed,
            })
            .collect(),
    })
}

pub(crate) fn decode_record(body: &[u8]) -> Result<NormalizedRecord, DecodeError> {
    decode_position(body).map(NormalizedRecord::WhirlpoolPosition)
}
