// DANS: src/decoders/orca/whirlpool/tick_array.rs

use crate::decoders::NormalizedRecord;
use crate::decoders::layout::{self, DISCRIMINATOR_LEN};
use crate::error::DecodeError;
use bytemuck::{Pod, Zeroable};
use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;
use std::mem::{offset_of, size_of};

pub const NAME: &str = "TickArray";
pub const DISCRIMINATOR: [u8; 8] = [69, 97, 189, 190, 110, 7, 66, 187];

pub const TICK_ARRAY_SIZE: usize = 88;
pub const NUM_REWARDS: usize = 3;
pub const ACCOUNT_LEN: usize = DISCRIMINATOR_LEN + size_of::<TickArrayData>();
/// Le whirlpool propriétaire est stocké APRÈS les ticks.
pub const WHIRLPOOL_OFFSET: usize = DISCRIMINATOR_LEN + offset_of!(TickArrayData, whirlpool);

const _: () = assert!(ACCOUNT_LEN == 9988 && WHIRLPOOL_OFFSET == 9956);

#[repr(C, packed)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
pub struct TickData {
    pub initialized: u8,
    pub liquidity_net: i128,
    pub liquidity_gross: u128,
    pub fee_growth_outside_a: u128,
    pub fee_growth_outside_b: u128,
    pub reward_growths_outside: [u128; NUM_REWARDS],
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct TickArrayData {
    pub start_tick_index: i32,
    pub ticks: [TickData; TICK_ARRAY_SIZE],
    pub whirlpool: Pubkey,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhirlpoolTickRecord {
    /// Position dans le tableau : le tick vaut `start + index * tick_spacing`.
    pub index: usize,
    pub initialized: bool,
    #[serde_as(as = "DisplayFromStr")]
    pub liquidity_net: i128,
    #[serde_as(as = "DisplayFromStr")]
    pub liquidity_gross: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub fee_growth_outside_a: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub fee_growth_outside_b: u128,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub reward_growths_outside: Vec<u128>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhirlpoolTickArrayRecord {
    pub start_tick_index: i32,
    pub ticks: Vec<WhirlpoolTickRecord>,
    #[serde_as(as = "DisplayFromStr")]
    pub whirlpool: Pubkey,
}

pub fn decode_tick_array(body: &[u8]) -> Result<WhirlpoolTickArrayRecord, DecodeError> {
    let start_tick_index: i32 = layout::read_layout(NAME, body)?;
    let slots: Vec<TickData> =
        layout::read_entries(NAME, body, offset_of!(TickArrayData, ticks), TICK_ARRAY_SIZE)?;
    let whirlpool_offset = offset_of!(TickArrayData, whirlpool);
    let whirlpool: Pubkey = layout::read_layout(NAME, &body[whirlpool_offset.min(body.len())..])?;

    let ticks = slots
        .into_iter()
        .enumerate()
        // Un emplacement entièrement nul n'a jamais été écrit : pas de tick à produire.
        .filter(|(_, slot)| bytemuck::bytes_of(slot).iter().any(|b| *b != 0))
        .map(|(index, slot)| {
            let rewards = slot.reward_growths_outside;
            WhirlpoolTickRecord {
                index,
                initialized: slot.initialized != 0,
                liquidity_net: slot.liquidity_net,
                liquidity_gross: slot.liquidity_gross,
                fee_growth_outside_a: slot.fee_growth_outside_a,
                fee_growth_outside_b: slot.fee_growth_outside_b,
                reward_growths_outside: rewards.to_vec(),
            }
        })
        .collect();

    Ok(WhirlpoolTickArrayRecord { start_tick_index, ticks, whirlpool })
}

pub(crate) fn decode_record(body: &[u8]) -> Result<NormalizedRecord, DecodeError> {
    decode_tick_array(body).map(|array| NormalizedRecord::WhirlpoolTickArray(Box::new(array)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn only_written_slots_are_reported_with_their_index() {
        let whirlpool = Pubkey::new_unique();
        let mut raw = fixtures::whirlpool_tick_array_layout(whirlpool, -5632);
        let mut ticks = raw.ticks;
        ticks[3].initialized = 1;
        ticks[3].liquidity_net = i128::MIN;
        ticks[3].liquidity_gross = 10;
        ticks[87].fee_growth_outside_b = 9;
        raw.ticks = ticks;

        let array = decode_tick_array(bytemuck::bytes_of(&raw)).unwrap();
        assert_eq!(array.whirlpool, whirlpool);
        assert_eq!(array.start_tick_index, -5632);
        assert_eq!(array.ticks.iter().map(|t| t.index).collect::<Vec<_>>(), vec![3, 87]);
        assert!(array.ticks[0].initialized);
        assert!(!array.ticks[1].initialized);

        let json = serde_json::to_value(&array).unwrap();
        assert_eq!(json["ticks"][0]["liquidityNet"], i128::MIN.to_string());
        assert_eq!(json["whirlpool"], whirlpool.to_string());
    }

    #[test]
    fn every_field_is_read_from_its_own_offset() {
        let body = fixtures::patterned(size_of::<TickArrayData>());
        let at = fixtures::At(&body);
        let ticks: Vec<WhirlpoolTickRecord> = (0..TICK_ARRAY_SIZE)
            .map(|index| {
                let s = 4 + 113 * index;
                WhirlpoolTickRecord {
                    index,
                    initialized: at.u8(s) != 0,
                    liquidity_net: at.i128(s + 1),
                    liquidity_gross: at.u128(s + 17),
                    fee_growth_outside_a: at.u128(s + 33),
                    fee_growth_outside_b: at.u128(s + 49),
                    reward_growths_outside: at.u128s(s + 65, 3),
                }
            })
            .collect();
        let expected = WhirlpoolTickArrayRecord { start_tick_index: at.i32(0), ticks, whirlpool: at.key(9948) };

        assert_eq!(body.len(), 9980);
        let array = decode_tick_array(&body).unwrap();
        assert!(array.ticks.iter().all(|tick| tick.initialized));
        assert_eq!(array, expected);
    }

    #[test]
    fn missing_owner_is_malformed() {
        let raw = fixtures::whirlpool_tick_array_layout(Pubkey::new_unique(), 0);
        let bytes = bytemuck::bytes_of(&raw);
        let err = decode_tick_array(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedPayload { schema: NAME, .. }));
    }
}
