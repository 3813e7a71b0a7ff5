// src/data_pipeline/discovery/raydium.rs

use super::{FieldEquals, dependents, find};
use crate::decoders::raydium::clmm::{self, pool, position};
use crate::error::FetchError;
use crate::rpc::{RateLimitedFetcher, RawAccount};
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeSet;

/// Pools CLMM dont `mint` est token 0 OU token 1.
pub async fn pools_for_mint(fetcher: &RateLimitedFetcher, mint: &Pubkey) -> Result<BTreeSet<Pubkey>, FetchError> {
    let variants = [
        FieldEquals { offset: pool::TOKEN_MINT_0_OFFSET, value: *mint },
        FieldEquals { offset: pool::TOKEN_MINT_1_OFFSET, value: *mint },
    ];
    find(fetcher, &clmm::PROGRAM_ID, pool::ACCOUNT_LEN, &variants).await
}

pub async fn personal_positions(fetcher: &RateLimitedFetcher, pool_id: &Pubkey) -> Result<Vec<RawAccount>, FetchError> {
    let pool_field = FieldEquals { offset: position::PERSONAL_POOL_ID_OFFSET, value: *pool_id };
    dependents(fetcher, &clmm::PROGRAM_ID, position::PERSONAL_ACCOUNT_LEN, pool_field).await
}

pub async fn protocol_positions(fetcher: &RateLimitedFetcher, pool_id: &Pubkey) -> Result<Vec<RawAccount>, FetchError> {
    let pool_field = FieldEquals { offset: position::PROTOCOL_POOL_ID_OFFSET, value: *pool_id };
    dependents(fetcher, &clmm::PROGRAM_ID, position::PROTOCOL_ACCOUNT_LEN, pool_field).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::FetcherConfig;
    use crate::testing::{MockLedger, fixtures};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn pools_are_found_through_either_mint_slot() {
        let ledger = Arc::new(MockLedger::default());
        let mint = Pubkey::new_unique();
        let other = Pubkey::new_unique();

        let as_base = ledger.add_owned_account(
            clmm::PROGRAM_ID,
            Pubkey::new_unique(),
            fixtures::raydium_pool_account(mint, other, 60),
        );
        let as_quote = ledger.add_owned_account(
            clmm::PROGRAM_ID,
            Pubkey::new_unique(),
            fixtures::raydium_pool_account(other, mint, 10),
        );
        ledger.add_owned_account(
            clmm::PROGRAM_ID,
            Pubkey::new_unique(),
            fixtures::raydium_pool_account(other, Pubkey::new_unique(), 60),
        );

        let fetcher = RateLimitedFetcher::new(ledger.clone(), FetcherConfig::parallel());
        let pools = pools_for_mint(&fetcher, &mint).await.unwrap();
        assert_eq!(pools, BTreeSet::from([as_base, as_quote]));
    }

    #[tokio::test(start_paused = true)]
    async fn positions_are_filtered_by_pool_and_layout() {
        let ledger = Arc::new(MockLedger::default());
        let pool_id = Pubkey::new_unique();

        let personal = ledger.add_owned_account(
            clmm::PROGRAM_ID,
            Pubkey::new_unique(),
            fixtures::raydium_personal_position_account(pool_id),
        );
        let protocol = ledger.add_owned_account(
            clmm::PROGRAM_ID,
            Pubkey::new_unique(),
            fixtures::raydium_protocol_position_account(pool_id),
        );
        ledger.add_owned_account(
            clmm::PROGRAM_ID,
            Pubkey::new_unique(),
            fixtures::raydium_personal_position_account(Pubkey::new_unique()),
        );

        let fetcher = RateLimitedFetcher::new(ledger.clone(), FetcherConfig::parallel());
        let found = personal_positions(&fetcher, &pool_id).await.unwrap();
        assert_eq!(found.iter().map(|a| a.address).collect::<Vec<_>>(), vec![personal]);
        assert_eq!(found[0].size(), position::PERSONAL_ACCOUNT_LEN);
        let found = protocol_positions(&fetcher, &pool_id).await.unwrap();
        assert_eq!(found.iter().map(|a| a.address).collect::<Vec<_>>(), vec![protocol]);
    }
}
