// src/decoders/spl_token_decoders/account.rs

use crate::error::DecodeError;
use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;
use spl_token_2022::{extension::StateWithExtensions, state::Account};

const NAME: &str = "TokenAccount";

/// Compte de jeton d'un vault de pool, SPL Token classique ou Token-2022.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccountRecord {
    #[serde_as(as = "DisplayFromStr")]
    pub mint: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub owner: Pubkey,
    #[serde_as(as = "DisplayFromStr")]
    pub amount: u64,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub delegate: Option<Pubkey>,
    /// Réserve de rent des comptes de SOL natif.
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub is_native: Option<u64>,
    #[serde_as(as = "DisplayFromStr")]
    pub delegated_amount: u64,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub close_authority: Option<Pubkey>,
}

/// Décode un compte de jeton. `StateWithExtensions` lit aussi bien les comptes
/// de 165 octets que ceux de Token-2022 avec extensions.
pub fn decode_account(data: &[u8]) -> Result<TokenAccountRecord, DecodeError> {
    let state = StateWithExtensions::<Account>::unpack(data)
        .map_err(|e| DecodeError::malformed(NAME, e.to_string()))?;
    let account = state.base;

    Ok(TokenAccountRecord {
        mint: account.mint,
        owner: account.owner,
        amount: account.amount,
        delegate: account.delegate.into(),
        is_native: account.is_native.into(),
        delegated_amount: account.delegated_amount,
        close_authority: account.close_authority.into(),
    })
}
