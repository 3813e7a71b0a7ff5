// src/data_pipeline/harvest/mod.rs

// Collecte d'UN pool : dérivation des adresses dépendantes, lecture, décodage.
// Un échec sur le compte du pool écarte le pool ; un échec sur un compte
// dépendant est noté et sauté.

pub mod orca;
pub mod raydium;

pub use orca::OrcaWhirlpoolHarvester;
pub use raydium::RaydiumClmmHarvester;

use super::batch::{ExtractionStamp, PoolRow, PositionRow, TickRow};
use crate::decoders::{AccountDecoder, DecodedAccount, SourceProgram};
use crate::error::{FetchError, PoolFailure};
use crate::rpc::{RateLimitedFetcher, RawAccount};
use async_trait::async_trait;
use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::sync::Arc;
use tracing::warn;

/// Un compte dépendant qui n'a pas pu être lu ou décodé.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedAddress {
    #[serde_as(as = "DisplayFromStr")]
    pub address: Pubkey,
    pub reason: String,
}

impl SkippedAddress {
    pub fn new(address: Pubkey, reason: impl Display) -> Self {
        let reason = reason.to_string();
        warn!(address = %address, reason = %reason, "Compte ignoré");
        Self { address, reason }
    }
}

/// Tout ce qu'un pool apporte aux lots de la passe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolHarvest {
    pub pool: PoolRow,
    pub ticks: TickRow,
    pub personal_positions: Vec<PositionRow>,
    pub protocol_positions: Vec<PositionRow>,
    pub skipped_accounts: Vec<SkippedAddress>,
}

/// Ce qui change d'un programme source à l'autre. L'orchestrateur ne connaît
/// que ce trait.
#[async_trait]
pub trait PoolHarvester: Send + Sync {
    fn program(&self) -> SourceProgram;

    /// Pools où `mint` occupe l'un ou l'autre des deux emplacements.
    async fn discover(&self, fetcher: &RateLimitedFetcher, mint: &Pubkey) -> Result<BTreeSet<Pubkey>, FetchError>;

    async fn harvest(
        &self,
        fetcher: &RateLimitedFetcher,
        pool: &Pubkey,
        stamp: ExtractionStamp,
    ) -> Result<PoolHarvest, PoolFailure>;
}

pub fn harvester_for(program: SourceProgram) -> Arc<dyn PoolHarvester> {
    match program {
        SourceProgram::RaydiumClmm => Arc::new(RaydiumClmmHarvester::default()),
        SourceProgram::OrcaWhirlpool => Arc::new(OrcaWhirlpoolHarvester::default()),
    }
}

/// Lit et décode le compte du pool lui-même ; ici tout échec est fatal au pool.
async fn fetch_pool(
    fetcher: &RateLimitedFetcher,
    decoder: &AccountDecoder,
    address: &Pubkey,
) -> Result<DecodedAccount, PoolFailure> {
    let raw = fetcher
        .fetch_one(address)
        .await
        .map_err(|source| PoolFailure::Fetch { address: *address, source })?;
    decoder
        .decode(address, &raw.data)
        .map_err(|source| PoolFailure::Decode { address: *address, source })
}

/// Décode des comptes dépendants. Ceux qui n'ont pas pu être lus, qui ne se
/// décodent pas ou qui ne sont pas du type `expected` partent dans `skipped`.
fn decode_dependents(
    decoder: &AccountDecoder,
    expected: &'static str,
    accounts: impl IntoIterator<Item = (Pubkey, Result<RawAccount, FetchError>)>,
    skipped: &mut Vec<SkippedAddress>,
) -> Vec<DecodedAccount> {
    let mut decoded = Vec::new();
    for (address, fetched) in accounts {
        let raw = match fetched {
            Ok(raw) => raw,
            Err(e) => {
                skipped.push(SkippedAddress::new(address, PoolFailure::Fetch { address, source: e }));
                continue;
            }
        };
        match decoder.decode(&address, &raw.data) {
            Ok(account) if account.parsed.name() == expected => decoded.push(account),
            Ok(_) => skipped.push(SkippedAddress::new(address, PoolFailure::UnexpectedRecord { address, expected })),
            Err(e) => skipped.push(SkippedAddress::new(address, PoolFailure::Decode { address, source: e })),
        }
    }
    decoded
}

/// Les comptes d'un scan sont déjà lus : seul le décodage peut encore échouer.
fn scanned(accounts: Vec<RawAccount>) -> impl Iterator<Item = (Pubkey, Result<RawAccount, FetchError>)> {
    accounts.into_iter().map(|raw| (raw.address, Ok(raw)))
}

fn position_rows(accounts: Vec<DecodedAccount>, stamp: ExtractionStamp) -> Vec<PositionRow> {
    accounts
        .into_iter()
        .map(|account| PositionRow { account, extraction_timestamp: stamp })
        .collect()
}

fn tick_row(pool: &Pubkey, arrays: Vec<DecodedAccount>, stamp: ExtractionStamp) -> TickRow {
    TickRow {
        pool: *pool,
        tick_arrays: arrays.into_iter().map(|array| (array.address.to_string(), array)).collect(),
        extraction_timestamp: stamp,
    }
}
