// src/data_pipeline/harvest/raydium.rs

use super::{
    PoolHarvest, PoolHarvester, SkippedAddress, decode_dependents, fetch_pool, position_rows, scanned, tick_row,
};
use crate::addressing;
use crate::data_pipeline::batch::{ExtractionStamp, PoolRow, VaultRow, VaultState};
use crate::data_pipeline::discovery;
use crate::decoders::raydium::clmm::{self, TICK_ARRAY_SIZE, pool, position, tick_array, tickarray_bitmap_extension};
use crate::decoders::{AccountDecoder, DecodedAccount, NormalizedRecord, SourceProgram};
use crate::error::{DecodeError, FetchError, PoolFailure};
use crate::rpc::RateLimitedFetcher;
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Pool CLMM : bitmap du pool + extension pour trouver les tick arrays,
/// soldes des vaults, positions par scan.
#[derive(Clone, Copy)]
pub struct RaydiumClmmHarvester {
    decoder: AccountDecoder,
}

impl Default for RaydiumClmmHarvester {
    fn default() -> Self {
        Self { decoder: AccountDecoder::raydium_clmm() }
    }
}

impl RaydiumClmmHarvester {
    /// `None` si le pool n'a pas d'extension. Une extension illisible n'écarte
    /// pas le pool : on perd seulement les tick arrays lointains.
    async fn fetch_extension(
        &self,
        fetcher: &RateLimitedFetcher,
        address: Pubkey,
        skipped: &mut Vec<SkippedAddress>,
    ) -> Option<DecodedAccount> {
        let raw = match fetcher.fetch_one(&address).await {
            Ok(raw) => raw,
            Err(FetchError::NotFound) => return None,
            Err(e) => {
                skipped.push(SkippedAddress::new(address, PoolFailure::Fetch { address, source: e }));
                return None;
            }
        };
        let mut decoded = decode_dependents(
            &self.decoder,
            tickarray_bitmap_extension::NAME,
            [(address, Ok(raw))],
            skipped,
        );
        decoded.pop()
    }

    async fn vault(
        &self,
        fetcher: &RateLimitedFetcher,
        address: Pubkey,
        skipped: &mut Vec<SkippedAddress>,
    ) -> Option<VaultRow> {
        match fetcher.token_balance(&address).await {
            Ok(balance) => Some(VaultRow { address, state: VaultState::Balance(balance) }),
            Err(e) => {
                skipped.push(SkippedAddress::new(address, PoolFailure::Fetch { address, source: e }));
                None
            }
        }
    }
}

#[async_trait]
impl PoolHarvester for RaydiumClmmHarvester {
    fn program(&self) -> SourceProgram {
        SourceProgram::RaydiumClmm
    }

    async fn discover(&self, fetcher: &RateLimitedFetcher, mint: &Pubkey) -> Result<BTreeSet<Pubkey>, FetchError> {
        discovery::raydium::pools_for_mint(fetcher, mint).await
    }

    async fn harvest(
        &self,
        fetcher: &RateLimitedFetcher,
        pool_address: &Pubkey,
        stamp: ExtractionStamp,
    ) -> Result<PoolHarvest, PoolFailure> {
        let pool_account = fetch_pool(fetcher, &self.decoder, pool_address).await?;
        let NormalizedRecord::RaydiumPool(state) = &pool_account.parsed else {
            return Err(PoolFailure::UnexpectedRecord { address: *pool_address, expected: pool::NAME });
        };
        let tick_spacing = state.tick_spacing;
        let current_tick = state.tick_current;
        let (vault_0, vault_1) = (state.token_vault_0, state.token_vault_1);
        if tick_spacing == 0 {
            return Err(PoolFailure::Decode {
                address: *pool_address,
                source: DecodeError::malformed(pool::NAME, "tick_spacing nul"),
            });
        }

        let range_size = i32::from(tick_spacing) * TICK_ARRAY_SIZE as i32;
        let mut starts: BTreeSet<i32> = addressing::scan(&state.tick_array_bitmap, range_size).into_iter().collect();
        let mut skipped = Vec::new();

        let extension_address = clmm::bitmap_extension_address(pool_address)?;
        let extension = self.fetch_extension(fetcher, extension_address, &mut skipped).await;
        if let Some(NormalizedRecord::RaydiumBitmapExtension(ext)) = extension.as_ref().map(|e| &e.parsed) {
            starts.extend(ext.initialized_starts(range_size));
        }

        // Dérivation complète AVANT toute lecture de tick array.
        let addresses = starts
            .iter()
            .map(|start| clmm::tick_array_address(pool_address, *start))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(pool = %pool_address, tick_arrays = addresses.len(), "Tick arrays dérivés");

        let mut fetched = fetcher.fetch_many(&addresses).await;
        let arrays = decode_dependents(
            &self.decoder,
            tick_array::NAME,
            addresses.iter().filter_map(|address| fetched.remove_entry(address)),
            &mut skipped,
        );

        let token_vault_0 = self.vault(fetcher, vault_0, &mut skipped).await;
        let token_vault_1 = self.vault(fetcher, vault_1, &mut skipped).await;

        let personal = discovery::raydium::personal_positions(fetcher, pool_address)
            .await
            .map_err(|source| PoolFailure::Scan { address: *pool_address, what: "positions personnelles", source })?;
        let protocol = discovery::raydium::protocol_positions(fetcher, pool_address)
            .await
            .map_err(|source| PoolFailure::Scan { address: *pool_address, what: "positions protocole", source })?;
        let personal = decode_dependents(&self.decoder, position::PERSONAL_NAME, scanned(personal), &mut skipped);
        let protocol = decode_dependents(&self.decoder, position::PROTOCOL_NAME, scanned(protocol), &mut skipped);

        info!(
            pool = %pool_address,
            tick_arrays = arrays.len(),
            personal_positions = personal.len(),
            protocol_positions = protocol.len(),
            skipped = skipped.len(),
            "Pool Raydium collecté"
        );

        Ok(PoolHarvest {
            pool: PoolRow {
                pool: pool_account,
                extension,
                current_tick,
                tick_spacing,
                current_array_start: addressing::array_start_index(current_tick, tick_spacing, TICK_ARRAY_SIZE),
                token_vault_0,
                token_vault_1,
                extraction_timestamp: stamp,
            },
            ticks: tick_row(pool_address, arrays, stamp),
            personal_positions: position_rows(personal, stamp),
            protocol_positions: position_rows(protocol, stamp),
            skipped_accounts: skipped,
        })
    }
}
