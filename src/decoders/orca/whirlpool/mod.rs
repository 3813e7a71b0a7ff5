pub mod pool;
pub mod position;
pub mod tick_array;

use solana_sdk::{pubkey, pubkey::Pubkey};

pub const PROGRAM_ID: Pubkey = pubkey!("whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc");

pub use pool::{WhirlpoolRecord, decode_whirlpool};
pub use position::WhirlpoolPositionRecord;
pub use tick_array::{TICK_ARRAY_SIZE, WhirlpoolTickArrayRecord};
