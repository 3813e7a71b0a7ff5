// src/data_pipeline/discovery/orca.rs

use super::{FieldEquals, dependents, find};
use crate::decoders::orca::whirlpool::{self, pool, position, tick_array};
use crate::error::FetchError;
use crate::rpc::{RateLimitedFetcher, RawAccount};
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeSet;

/// Whirlpools dont `mint` est token A OU token B.
pub async fn pools_for_mint(fetcher: &RateLimitedFetcher, mint: &Pubkey) -> Result<BTreeSet<Pubkey>, FetchError> {
    let variants = [
        FieldEquals { offset: pool::TOKEN_MINT_A_OFFSET, value: *mint },
        FieldEquals { offset: pool::TOKEN_MINT_B_OFFSET, value: *mint },
    ];
    find(fetcher, &whirlpool::PROGRAM_ID, pool::ACCOUNT_LEN, &variants).await
}

// Chez Orca le bitmap n'existe pas : les tick arrays se trouvent par scan.
pub async fn tick_arrays(fetcher: &RateLimitedFetcher, pool_address: &Pubkey) -> Result<Vec<RawAccount>, FetchError> {
    let pool_field = FieldEquals { offset: tick_array::WHIRLPOOL_OFFSET, value: *pool_address };
    dependents(fetcher, &whirlpool::PROGRAM_ID, tick_array::ACCOUNT_LEN, pool_field).await
}

pub async fn positions(fetcher: &RateLimitedFetcher, pool_address: &Pubkey) -> Result<Vec<RawAccount>, FetchError> {
    let pool_field = FieldEquals { offset: position::WHIRLPOOL_OFFSET, value: *pool_address };
    dependents(fetcher, &whirlpool::PROGRAM_ID, position::ACCOUNT_LEN, pool_field).await
}
