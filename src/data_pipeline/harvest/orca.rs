// src/data_pipeline/harvest/orca.rs

use super::{
    PoolHarvest, PoolHarvester, SkippedAddress, decode_dependents, fetch_pool, position_rows, scanned, tick_row,
};
use crate::addressing;
use crate::data_pipeline::batch::{ExtractionStamp, PoolRow, VaultRow, VaultState};
use crate::data_pipeline::discovery;
use crate::decoders::orca::whirlpool::{TICK_ARRAY_SIZE, pool, position, tick_array};
use crate::decoders::spl_token_decoders;
use crate::decoders::{AccountDecoder, NormalizedRecord, SourceProgram};
use crate::error::{DecodeError, FetchError, PoolFailure};
use crate::rpc::{RateLimitedFetcher, RawAccount};
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::collections::{BTreeSet, HashMap};
use tracing::info;

/// Whirlpool : vaults lus comme comptes de jeton, tick arrays et positions
/// trouvés par scan sur l'adresse du pool.
#[derive(Clone, Copy)]
pub struct OrcaWhirlpoolHarvester {
    decoder: AccountDecoder,
}

impl Default for OrcaWhirlpoolHarvester {
    fn default() -> Self {
        Self { decoder: AccountDecoder::orca_whirlpool() }
    }
}

fn vault_row(
    address: Pubkey,
    fetched: &mut HashMap<Pubkey, Result<RawAccount, FetchError>>,
    skipped: &mut Vec<SkippedAddress>,
) -> Option<VaultRow> {
    let outcome = fetched.remove(&address).unwrap_or(Err(FetchError::NotFound));
    let decoded = outcome
        .map_err(|source| PoolFailure::Fetch { address, source })
        .and_then(|raw| {
            spl_token_decoders::decode_account(&raw.data).map_err(|source| PoolFailure::Decode { address, source })
        });
    match decoded {
        Ok(account) => Some(VaultRow { address, state: VaultState::Account(account) }),
        Err(e) => {
            skipped.push(SkippedAddress::new(address, e));
            None
        }
    }
}

#[async_trait]
impl PoolHarvester for OrcaWhirlpoolHarvester {
    fn program(&self) -> SourceProgram {
        SourceProgram::OrcaWhirlpool
    }

    async fn discover(&self, fetcher: &RateLimitedFetcher, mint: &Pubkey) -> Result<BTreeSet<Pubkey>, FetchError> {
        discovery::orca::pools_for_mint(fetcher, mint).await
    }

    async fn harvest(
        &self,
        fetcher: &RateLimitedFetcher,
        pool_address: &Pubkey,
        stamp: ExtractionStamp,
    ) -> Result<PoolHarvest, PoolFailure> {
        let pool_account = fetch_pool(fetcher, &self.decoder, pool_address).await?;
        let NormalizedRecord::Whirlpool(state) = &pool_account.parsed else {
            return Err(PoolFailure::UnexpectedRecord { address: *pool_address, expected: pool::NAME });
        };
        let tick_spacing = state.tick_spacing;
        let current_tick = state.tick_current_index;
        let vaults = [state.token_vault_a, state.token_vault_b];
        if tick_spacing == 0 {
            return Err(PoolFailure::Decode {
                address: *pool_address,
                source: DecodeError::malformed(pool::NAME, "tick_spacing nul"),
            });
        }

        let mut skipped = Vec::new();
        let mut fetched = fetcher.fetch_many(&vaults).await;
        let token_vault_0 = vault_row(vaults[0], &mut fetched, &mut skipped);
        let token_vault_1 = vault_row(vaults[1], &mut fetched, &mut skipped);

        let arrays = discovery::orca::tick_arrays(fetcher, pool_address)
            .await
            .map_err(|source| PoolFailure::Scan { address: *pool_address, what: "tick arrays", source })?;
        let positions = discovery::orca::positions(fetcher, pool_address)
            .await
            .map_err(|source| PoolFailure::Scan { address: *pool_address, what: "positions", source })?;
        let arrays = decode_dependents(&self.decoder, tick_array::NAME, scanned(arrays), &mut skipped);
        let positions = decode_dependents(&self.decoder, position::NAME, scanned(positions), &mut skipped);

        info!(
            pool = %pool_address,
            tick_arrays = arrays.len(),
            positions = positions.len(),
            skipped = skipped.len(),
            "Whirlpool collecté"
        );

        Ok(PoolHarvest {
            pool: PoolRow {
                pool: pool_account,
                extension: None,
                current_tick,
                tick_spacing,
                current_array_start: addressing::array_start_index(current_tick, tick_spacing, TICK_ARRAY_SIZE),
                token_vault_0,
                token_vault_1,
                extraction_timestamp: stamp,
            },
            ticks: tick_row(pool_address, arrays, stamp),
            // Une position Orca est la position d'un LP : même lot que les positions personnelles Raydium.
            personal_positions: position_rows(positions, stamp),
            protocol_positions: Vec::new(),
            skipped_accounts: skipped,
        })
    }
}
