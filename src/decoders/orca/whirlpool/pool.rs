// DANS : src/decoders/orca/whirlpool/pool.rs

use crate::decoders::NormalizedRecord;
use crate::decoders::layout::{self, DISCRIMINATOR_LEN};
use crate::error::DecodeError;
use bytemuck::{Pod, Zeroable};
use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;
use std::mem::{offset_of, size_of};

pub const NAME: &str = "Whirlpool";
pub const DISCRIMINATOR: [u8; 8] = [63, 149, 209, 12, 225, 128, 99, 9];

pub const ACCOUNT_LEN: usize = DISCRIMINATOR_LEN + size_of::<WhirlpoolData>();
pub const TOKEN_MINT_A_OFFSET: usize = DISCRIMINATOR_LEN + offset_of!(WhirlpoolData, token_mint_a);
pub const TOKEN_MINT_B_OFFSET: usize = DISCRIMINATOR_LEN + offset_of!(WhirlpoolData, token_mint_b);

const _: () = assert!(ACCOUNT_LEN == 653);
const _: () = assert!(TOKEN_MINT_A_OFFSET == 101 && TOKEN_MINT_B_OFFSET == 181);

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct WhirlpoolRewardInfoData {
    pub mint: Pubkey,
    pub vault: Pubkey,
    pub authority: Pubkey,
    pub emissions_per_second_x64: u128,
    pub growth_global_x64: u128,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct WhirlpoolData {
    pub whirlpools_config: Pubkey,
    pub whirlpool_bump: [u8; 1],
    pub tick_spacing: u16,
    pub tick_spacing_seed: [u8; 2],
    pub fee_rate: u16,
    pub protocol_fee_rate: u16,
    pub liquidity: u128,
    pub sqrt_price: u128,
    pub tick_current_index: i32,
    pub protocol_fee_owed_a: u64,
    pub protocol_fee_owed_b: u64,
    pub token_mint_a: Pubkey,
    pub token_vault_a: Pubkey,
    pub fee_growth_global_a: u128,
    pub token_mint_b: Pubkey,
    pub token_vault_b: Pubkey,
    pub fee_growth_global_b: u128,
    pub reward_last_updated_timestamp: u64,
    pub reward_infos: [WhirlpoolRewardInfoData; 3],
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhirlpoolRewardRecord {
    #[serde_as(as = "DisplayFromStr")]
    pub mint: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub vault: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub authority: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub emissions_per_second_x64: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub growth_global_x64: u128,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhirlpoolRecord {
    #[serde_as(as = "DisplayFromStr")]
    pub whirlpools_config: Pubkey,
    pub whirlpool_bump: [u8; 1],
    pub tick_spacing: u16,
    pub tick_spacing_seed: [u8; 2],
    pub fee_rate: u16,
    pub protocol_fee_rate: u16,
    #[serde_as(as = "DisplayFromStr")]
    pub liquidity: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub sqrt_price: u128,
    pub tick_current_index: i32,
    #[serde_as(as = "DisplayFromStr")]
    pub protocol_fee_owed_a: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub protocol_fee_owed_b: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub token_mint_a: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub token_vault_a: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub fee_growth_global_a: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub token_mint_b: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub token_vault_b: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub fee_growth_global_b: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub reward_last_updated_timestamp: u64,
    pub reward_infos: Vec<WhirlpoolRewardRecord>,
}

pub fn decode_whirlpool(body: &[u8]) -> Result<WhirlpoolRecord, DecodeError> {
    let raw: WhirlpoolData = layout::read_layout(NAME, body)?;
    let rewards = raw.reward_infos;

    Ok(WhirlpoolRecord {
        whirlpools_config: raw.whirlpools_config,
        whirlpool_bump: raw.whirlpool_bump,
        tick_spacing: raw.tick_spacing,
        tick_spacing_seed: raw.tick_spacing_seed,
        fee_rate: raw.fee_rate,
        protocol_fee_rate: raw.protocol_fee_rate,
        liquidity: raw.liquidity,
        sqrt_price: raw.sqrt_price,
        tick_current_index: raw.tick_current_index,
        protocol_fee_owed_a: raw.protocol_fee_owed_a,
        protocol_fee_owed_b: raw.protocol_fee_owed_b,
        token_mint_a: raw.token_mint_a,
        token_vault_a: raw.token_vault_a,
        fee_growth_global_a: raw.fee_growth_global_a,
        token_mint_b: raw.token_mint_b,
        token_vault_b: raw.token_vault_b,
        fee_growth_global_b: raw.fee_growth_global_b,
        reward_last_updated_timestamp: raw.reward_last_updated_timestamp,
        reward_infos: rewards
            .into_iter()
            .map(|reward| WhirlpoolRewardRecord {
                mint: reward.mint,
                vault: reward.vault,
                authority: reward.authority,
                emissions_per_second_x64: reward.emissions_per_second_x64,
                growth_global_x64: reward.growth_global_x64,
            })
            .collect(),
    })
}

pub(crate) fn decode_record(body: &[u8]) -> Result<NormalizedRecord, DecodeError> {
    decode_whirlpool(body).map(|pool| NormalizedRecord::Whirlpool(Box::new(pool)))
}
