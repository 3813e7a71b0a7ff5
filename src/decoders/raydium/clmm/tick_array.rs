// Fichier : src/decoders/raydium/clmm/tick_array.rs

use super::PROGRAM_ID;
use crate::addressing;
use crate::decoders::NormalizedRecord;
use crate::decoders::layout::{self, DISCRIMINATOR_LEN};
use crate::error::{DecodeError, DerivationError};
use bytemuck::{Pod, Zeroable};
use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;
use std::mem::{offset_of, size_of};

pub const NAME: &str = "TickArrayState";
pub const DISCRIMINATOR: [u8; 8] = [192, 155, 85, 205, 49, 249, 129, 42];

pub const TICK_ARRAY_SIZE: usize = 60;
pub const REWARD_NUM: usize = 3;
pub const ACCOUNT_LEN: usize = DISCRIMINATOR_LEN + size_of::<TickArrayState>();

const _: () = assert!(ACCOUNT_LEN == 10240);

#[repr(C, packed)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
pub struct TickState {
    pub tick: i32,
    pub liquidity_net: i128,
    pub liquidity_gross: u128,
    pub fee_growth_outside_0_x64: u128,
    pub fee_growth_outside_1_x64: u128,
    pub reward_growths_outside_x64: [u128; REWARD_NUM],
    pub padding: [u32; 13],
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct TickArrayState {
    pub pool_id: Pubkey,
    pub start_tick_index: i32,
    pub ticks: [TickState; TICK_ARRAY_SIZE],
    pub initialized_tick_count: u8,
    pub recent_epoch: u64,
    pub padding: [u8; 107],
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Header {
    pool_id: Pubkey,
    start_tick_index: i32,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Trailer {
    initialized_tick_count: u8,
    recent_epoch: u64,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickRecord {
    pub initialized: bool,
    pub tick: i32,
    #[serde_as(as = "DisplayFromStr")]
    pub liquidity_net: i128,
    #[serde_as(as = "DisplayFromStr")]
    pub liquidity_gross: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub fee_growth_outside_0_x64: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub fee_growth_outside_1_x64: u128,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub reward_growths_outside_x64: Vec<u128>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickArrayRecord {
    #[serde_as(as = "DisplayFromStr")]
    pub pool_id: Pubkey,
    pub start_tick_index: i32,
    pub ticks: Vec<TickRecord>,
    pub initialized_tick_count: u8,
    #[serde_as(as = "DisplayFromStr")]
    pub recent_epoch: u64,
}

impl TickRecord {
    /// `None` pour un emplacement jamais écrit (que des zéros) : on n'invente pas de tick.
    fn from_slot(slot: TickState) -> Option<Self> {
        if bytemuck::bytes_of(&slot).iter().all(|b| *b == 0) {
            return None;
        }
        let liquidity_gross = slot.liquidity_gross;
        let rewards = slot.reward_growths_outside_x64;
        Some(Self {
            // Raydium n'a pas de drapeau : un tick est initialisé tant qu'il porte de la liquidité.
            initialized: liquidity_gross != 0,
            tick: slot.tick,
            liquidity_net: slot.liquidity_net,
            liquidity_gross,
            fee_growth_outside_0_x64: slot.fee_growth_outside_0_x64,
            fee_growth_outside_1_x64: slot.fee_growth_outside_1_x64,
            reward_growths_outside_x64: rewards.to_vec(),
        })
    }
}

pub fn decode_tick_array(body: &[u8]) -> Result<TickArrayRecord, DecodeError> {
    let header: Header = layout::read_layout(NAME, body)?;

    // Lecture tick par tick plutôt qu'une copie de 10 Ko d'un bloc.
    let slots: Vec<TickState> =
        layout::read_entries(NAME, body, offset_of!(TickArrayState, ticks), TICK_ARRAY_SIZE)?;

    let trailer_offset = offset_of!(TickArrayState, initialized_tick_count);
    let trailer: Trailer = layout::read_layout(NAME, &body[trailer_offset.min(body.len())..])?;

    Ok(TickArrayRecord {
        pool_id: header.pool_id,
        start_tick_index: header.start_tick_index,
        ticks: slots.into_iter().filter_map(TickRecord::from_slot).collect(),
        initialized_tick_count: trailer.initialized_tick_count,
        recent_epoch: trailer.recent_epoch,
    })
}

pub(crate) fn decode_record(body: &[u8]) -> Result<NormalizedRecord, DecodeError> {
    decode_tick_array(body).map(|array| NormalizedRecord::RaydiumTickArray(Box::new(array)))
}

/// PDA d'un tick array : seeds `["tick_array", pool, start en i32 big-endian]`.
pub fn tick_array_address(pool_id: &Pubkey, start_tick_index: i32) -> Result<Pubkey, DerivationError> {
    let start = start_tick_index.to_be_bytes();
    addressing::derive_address(&[b"tick_array", pool_id.as_ref(), &start], &PROGRAM_ID)
}
