// Raydium CLMM (concentrated liquidity, "amm v3").
pub mod pool;
pub mod position;
pub mod tick_array;
pub mod tickarray_bitmap_extension;

use solana_sdk::{pubkey, pubkey::Pubkey};

pub const PROGRAM_ID: Pubkey = pubkey!("CAMMCzo5YL8w4VFF8KVHrK22GGUsp5VTaW7grrKgrWqK");

pub use pool::{PoolStateRecord, decode_pool_state};
pub use position::{PersonalPositionRecord, ProtocolPositionRecord};
pub use tick_array::{TICK_ARRAY_SIZE, TickArrayRecord, tick_array_address};
pub use tickarray_bitmap_extension::{BitmapExtensionRecord, bitmap_extension_address};
