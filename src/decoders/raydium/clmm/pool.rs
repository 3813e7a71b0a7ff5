// DANS : src/decoders/raydium/clmm/pool.rs

use crate::decoders::NormalizedRecord;
use crate::decoders::layout::{self, DISCRIMINATOR_LEN};
use crate::error::DecodeError;
use bytemuck::{Pod, Zeroable};
use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;
use std::mem::{offset_of, size_of};

pub const NAME: &str = "PoolState";
pub const DISCRIMINATOR: [u8; 8] = [247, 237, 227, 245, 215, 195, 222, 70];

/// Taille totale d'un compte PoolState, discriminateur inclus.
pub const ACCOUNT_LEN: usize = DISCRIMINATOR_LEN + size_of::<PoolState>();
/// Offsets des deux mints dans le compte (pour les filtres memcmp).
pub const TOKEN_MINT_0_OFFSET: usize = DISCRIMINATOR_LEN + offset_of!(PoolState, token_mint_0);
pub const TOKEN_MINT_1_OFFSET: usize = DISCRIMINATOR_LEN + offset_of!(PoolState, token_mint_1);

const _: () = assert!(ACCOUNT_LEN == 1544);
const _: () = assert!(TOKEN_MINT_0_OFFSET == 73 && TOKEN_MINT_1_OFFSET == 105);

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PoolState {
    pub bump: [u8; 1],
    pub amm_config: Pubkey,
    pub owner: Pubkey,
    pub token_mint_0: Pubkey,
    pub token_mint_1: Pubkey,
    pub token_vault_0: Pubkey,
    pub token_vault_1: Pubkey,
    pub observation_key: Pubkey,
    pub mint_decimals_0: u8,
    pub mint_decimals_1: u8,
    pub tick_spacing: u16,
    pub liquidity: u128,
    pub sqrt_price_x64: u128,
    pub tick_current: i32,
    pub padding3: u16,
    pub padding4: u16,
    pub fee_growth_global_0_x64: u128,
    pub fee_growth_global_1_x64: u128,
    pub protocol_fees_token_0: u64,
    pub protocol_fees_token_1: u64,
    pub swap_in_amount_token_0: u128,
    pub swap_out_amount_token_1: u128,
    pub swap_in_amount_token_1: u128,
    pub swap_out_amount_token_0: u128,
    pub status: u8,
    pub padding: [u8; 7],
    pub reward_infos: [RewardInfo; 3],
    pub tick_array_bitmap: [u64; 16],
    pub total_fees_token_0: u64,
    pub total_fees_claimed_token_0: u64,
    pub total_fees_token_1: u64,
    pub total_fees_claimed_token_1: u64,
    pub fund_fees_token_0: u64,
    pub fund_fees_token_1: u64,
    pub open_time: u64,
    pub recent_epoch: u64,
    pub padding1: [u64; 24],
    pub padding2: [u64; 32],
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct RewardInfo {
    pub reward_state: u8,
    pub open_time: u64,
    pub end_time: u64,
    pub last_update_time: u64,
    pub emissions_per_second_x64: u128,
    pub reward_total_emissioned: u64,
    pub reward_claimed: u64,
    pub token_mint: Pubkey,
    pub token_vault: Pubkey,
    pub authority: Pubkey,
    pub reward_growth_global_x64: u128,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardInfoRecord {
    pub reward_state: u8,
    #[serde_as(as = "DisplayFromStr")]
    pub open_time: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub end_time: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub last_update_time: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub emissions_per_second_x64: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub reward_total_emissioned: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub reward_claimed: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub token_mint: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub token_vault: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub authority: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub reward_growth_global_x64: u128,
}

impl From<RewardInfo> for RewardInfoRecord {
    fn from(reward: RewardInfo) -> Self {
        Self {
            reward_state: reward.reward_state,
            open_time: reward.open_time,
            end_time: reward.end_time,
            last_update_time: reward.last_update_time,
            emissions_per_second_x64: reward.emissions_per_second_x64,
            reward_total_emissioned: reward.reward_total_emissioned,
            reward_claimed: reward.reward_claimed,
            token_mint: reward.token_mint,
            token_vault: reward.token_vault,
            authority: reward.authority,
            reward_growth_global_x64: reward.reward_growth_global_x64,
        }
    }
}

/// Vue normalisée d'un PoolState : les noms suivent le compte on-chain, en camelCase.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStateRecord {
    pub bump: [u8; 1],
    #[serde_as(as = "DisplayFromStr")]
    pub amm_config: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub owner: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub token_mint_0: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub token_mint_1: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub token_vault_0: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub token_vault_1: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub observation_key: Pubkey,
    pub mint_decimals_0: u8,
    pub mint_decimals_1: u8,
    pub tick_spacing: u16,
    #[serde_as(as = "DisplayFromStr")]
    pub liquidity: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub sqrt_price_x64: u128,
    pub tick_current: i32,
    pub padding3: u16,
    pub padding4: u16,
    #[serde_as(as = "DisplayFromStr")]
    pub fee_growth_global_0_x64: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub fee_growth_global_1_x64: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub protocol_fees_token_0: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub protocol_fees_token_1: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub swap_in_amount_token_0: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub swap_out_amount_token_1: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub swap_in_amount_token_1: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub swap_out_amount_token_0: u128,
    pub status: u8,
    pub padding: [u8; 7],
    pub reward_infos: Vec<RewardInfoRecord>,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub tick_array_bitmap: Vec<u64>,
    #[serde_as(as = "DisplayFromStr")]
    pub total_fees_token_0: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub total_fees_claimed_token_0: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub total_fees_token_1: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub total_fees_claimed_token_1: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub fund_fees_token_0: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub fund_fees_token_1: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub open_time: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub recent_epoch: u64,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub padding1: Vec<u64>,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub padding2: Vec<u64>,
}

pub fn decode_pool_state(body: &[u8]) -> Result<PoolStateRecord, DecodeError> {
    let raw: PoolState = layout::read_layout(NAME, body)?;

    // Copies locales : pas de référence sur un champ d'une struct packed.
    let reward_infos = raw.reward_infos;
    let tick_array_bitmap = raw.tick_array_bitmap;
    let padding1 = raw.padding1;
    let padding2 = raw.padding2;

    Ok(PoolStateRecord {
        bump: raw.bump,
        amm_config: raw.amm_config,
        owner: raw.owner,
        token_mint_0: raw.token_mint_0,
        token_mint_1: raw.token_mint_1,
        token_vault_0: raw.token_vault_0,
        token_vault_1: raw.token_vault_1,
        observation_key: raw.observation_key,
        mint_decimals_0: raw.mint_decimals_0,
        mint_decimals_1: raw.mint_decimals_1,
        tick_spacing: raw.tick_spacing,
        liquidity: raw.liquidity,
        sqrt_price_x64: raw.sqrt_price_x64,
        tick_current: raw.tick_current,
        padding3: raw.padding3,
        padding4: raw.padding4,
        fee_growth_global_0_x64: raw.fee_growth_global_0_x64,
        fee_growth_global_1_x64: raw.fee_growth_global_1_x64,
        protocol_fees_token_0: raw.protocol_fees_token_0,
        protocol_fees_token_1: raw.protocol_fees_token_1,
        swap_in_amount_token_0: raw.swap_in_amount_token_0,
        swap_out_amount_token_1: raw.swap_out_amount_token_1,
        swap_in_amount_token_1: raw.swap_in_amount_token_1,
        swap_out_amount_token_0: raw.swap_out_amount_token_0,
        status: raw.status,
        padding: raw.padding,
        reward_infos: reward_infos.into_iter().map(RewardInfoRecord::from).collect(),
        tick_array_bitmap: tick_array_bitmap.to_vec(),
        total_fees_token_0: raw.total_fees_token_0,
        total_fees_claimed_token_0: raw.total_fees_claimed_token_0,
        total_fees_token_1: raw.total_fees_token_1,
        total_fees_claimed_token_1: raw.total_fees_claimed_token_1,
        fund_fees_token_0: raw.fund_fees_token_0,
        fund_fees_token_1: raw.fund_fees_token_1,
        open_time: raw.open_time,
        recent_epoch: raw.recent_epoch,
        padding1: padding1.to_vec(),
        padding2: padding2.to_vec(),
    })
}

pub(crate) fn decode_record(body: &[u8]) -> Result<NormalizedRecord, DecodeError> {
    decode_pool_state(body).map(|pool| NormalizedRecord::RaydiumPool(Box::new(pool)))
}
