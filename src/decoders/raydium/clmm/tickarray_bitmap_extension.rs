use super::PROGRAM_ID;
use crate::addressing;
use crate::decoders::NormalizedRecord;
use crate::decoders::layout::{self, DISCRIMINATOR_LEN};
use crate::error::{DecodeError, DerivationError};
use bytemuck::{Pod, Zeroable};
use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;
use std::mem::size_of;

pub const NAME: &str = "TickArrayBitmapExtension";
pub const DISCRIMINATOR: [u8; 8] = [60, 150, 36, 219, 97, 128, 139, 153];

pub const EXTENSION_BITMAP_COUNT: usize = 14;
pub const ACCOUNT_LEN: usize = DISCRIMINATOR_LEN + size_of::<TickArrayBitmapExtensionData>();

const _: () = assert!(ACCOUNT_LEN == 1832);

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct TickArrayBitmapExtensionData {
    pub pool_id: Pubkey,
    pub positive_tick_array_bitmap: [[u64; 8]; EXTENSION_BITMAP_COUNT],
    pub negative_tick_array_bitmap: [[u64; 8]; EXTENSION_BITMAP_COUNT],
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BitmapExtensionRecord {
    #[serde_as(as = "DisplayFromStr")]
    pub pool_id: Pubkey,
    #[serde_as(as = "Vec<[DisplayFromStr; 8]>")]
    pub positive_tick_array_bitmap: Vec<[u64; 8]>,
    #[serde_as(as = "Vec<[DisplayFromStr; 8]>")]
    pub negative_tick_array_bitmap: Vec<[u64; 8]>,
}

impl BitmapExtensionRecord {
    /// Départs des tick arrays signalés par l'extension, triés.
    pub fn initialized_starts(&self, range_size: i32) -> Vec<i32> {
        addressing::scan_extension(&self.positive_tick_array_bitmap, &self.negative_tick_array_bitmap, range_size)
    }
}

pub fn decode_bitmap_extension(body: &[u8]) -> Result<BitmapExtensionRecord, DecodeError> {
    let raw: TickArrayBitmapExtensionData = layout::read_layout(NAME, body)?;

    // On copie les données pour éviter les problèmes d'alignement
    let positive = raw.positive_tick_array_bitmap;
    let negative = raw.negative_tick_array_bitmap;

    Ok(BitmapExtensionRecord {
        pool_id: raw.pool_id,
        positive_tick_array_bitmap: positive.to_vec(),
        negative_tick_array_bitmap: negative.to_vec(),
    })
}

pub(crate) fn decode_record(body: &[u8]) -> Result<NormalizedRecord, DecodeError> {
    decode_bitmap_extension(body).map(|ext| NormalizedRecord::RaydiumBitmapExtension(Box::new(ext)))
}

pub fn bitmap_extension_address(pool_id: &Pubkey) -> Result<Pubkey, DerivationError> {
    addressing::derive_address(&[b"pool_tick_array_bitmap_extension", pool_id.as_ref()], &PROGRAM_ID)
}
