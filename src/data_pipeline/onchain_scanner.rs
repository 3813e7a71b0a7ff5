// src/data_pipeline/onchain_scanner.rs

use crate::error::FetchError;
use crate::rpc::{AccountFilter, RateLimitedFetcher, RawAccount};
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

/// Un scan `getProgramAccounts` : taille exacte + égalités de champs (memcmp).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanQuery {
    pub program_id: Pubkey,
    pub filters: Vec<AccountFilter>,
}

impl ScanQuery {
    pub fn sized(program_id: Pubkey, exact_size: usize) -> Self {
        Self { program_id, filters: vec![AccountFilter::DataSize(exact_size as u64)] }
    }

    pub fn field_equals(mut self, offset: usize, value: &Pubkey) -> Self {
        self.filters.push(AccountFilter::memcmp_pubkey(offset, value));
        self
    }
}

/// Lance le scan à travers le fetcher (budget de débit + ré-essais).
pub async fn scan(fetcher: &RateLimitedFetcher, query: &ScanQuery) -> Result<Vec<RawAccount>, FetchError> {
    let accounts = fetcher.program_accounts(&query.program_id, &query.filters).await?;
    debug!(
        program = %query.program_id,
        filters = query.filters.len(),
        found = accounts.len(),
        "Scan on-chain terminé"
    );
    Ok(accounts)
}
