// src/data_pipeline/discovery/mod.rs

// Découverte on-chain des comptes liés à un mint : une requête par variante de
// filtre, résultats unis et dédoublonnés.
pub mod orca;
pub mod raydium;

use super::onchain_scanner::{self, ScanQuery};
use crate::error::FetchError;
use crate::rpc::{RateLimitedFetcher, RawAccount};
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeSet;
use tracing::info;

/// "Le champ à `offset` vaut `value`" : une variante de la recherche.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldEquals {
    pub offset: usize,
    pub value: Pubkey,
}

/// Tous les comptes de `program_id` de taille `exact_size` qui satisfont AU MOINS
/// une des variantes. Un compte qui en satisfait plusieurs n'apparaît qu'une fois.
pub async fn find(
    fetcher: &RateLimitedFetcher,
    program_id: &Pubkey,
    exact_size: usize,
    variants: &[FieldEquals],
) -> Result<BTreeSet<Pubkey>, FetchError> {
    let mut found = BTreeSet::new();
    for variant in variants {
        let query = ScanQuery::sized(*program_id, exact_size).field_equals(variant.offset, &variant.value);
        let accounts = onchain_scanner::scan(fetcher, &query).await?;
        found.extend(accounts.into_iter().map(|account| account.address));
    }
    info!(program = %program_id, variants = variants.len(), found = found.len(), "Découverte terminée");
    Ok(found)
}

/// Comptes dépendants d'un pool (positions, tick arrays) : un seul scan, et on
/// garde les octets déjà renvoyés par le nœud plutôt que de les relire.
pub async fn dependents(
    fetcher: &RateLimitedFetcher,
    program_id: &Pubkey,
    exact_size: usize,
    owner_field: FieldEquals,
) -> Result<Vec<RawAccount>, FetchError> {
    let query = ScanQuery::sized(*program_id, exact_size).field_equals(owner_field.offset, &owner_field.value);
    onchain_scanner::scan(fetcher, &query).await
}
