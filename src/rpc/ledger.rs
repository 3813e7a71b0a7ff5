// src/rpc/ledger.rs

use crate::error::{ErrorClass, RemoteError};
use async_trait::async_trait;
use serde::Serialize;
use solana_account_decoder::UiAccountEncoding;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig},
    rpc_filter::{Memcmp, RpcFilterType},
    rpc_request::RpcError,
};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::sync::Arc;

/// Prédicat évalué côté serveur lors d'un scan filtré.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    DataSize(u64),
    Memcmp { offset: usize, bytes: Vec<u8> },
}

impl AccountFilter {
    pub fn memcmp_pubkey(offset: usize, key: &Pubkey) -> Self {
        AccountFilter::Memcmp { offset, bytes: key.to_bytes().to_vec() }
    }

    /// Même sémantique que le nœud : utile pour les sources en mémoire.
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            AccountFilter::DataSize(size) => data.len() as u64 == *size,
            AccountFilter::Memcmp { offset, bytes } => data
                .get(*offset..offset.saturating_add(bytes.len()))
                .is_some_and(|window| window == bytes.as_slice()),
        }
    }

    fn to_rpc(&self) -> RpcFilterType {
        match self {
            AccountFilter::DataSize(size) => RpcFilterType::DataSize(*size),
            AccountFilter::Memcmp { offset, bytes } => {
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(*offset, bytes))
            }
        }
    }
}

/// Solde d'un compte de jeton tel que renvoyé par `getTokenAccountBalance`.
///
/// `amount` est le montant brut, comme dans un compte de jeton décodé.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub amount: String,
    pub decimals: u8,
    /// Montant lisible, décimales appliquées.
    pub ui_amount_string: String,
}

/// Les trois lectures dont le pipeline a besoin. Chaque appel est UN aller-retour :
/// pas de ré-essai ici, c'est le rôle de `RateLimitedFetcher`.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// `Ok(None)` si le compte n'existe pas.
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, RemoteError>;

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, RemoteError>;

    async fn get_token_account_balance(&self, address: &Pubkey) -> Result<TokenBalance, RemoteError>;
}

/// Implémentation réelle au-dessus du `RpcClient` non bloquant de Solana.
#[derive(Clone)]
pub struct SolanaLedger {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl SolanaLedger {
    pub fn new(rpc_url: String) -> Self {
        // Même niveau de finalité que les scans : on lit l'état le plus récent.
        let commitment = CommitmentConfig::processed();
        Self {
            client: Arc::new(RpcClient::new_with_commitment(rpc_url, commitment)),
            commitment,
        }
    }
}

#[async_trait]
impl LedgerSource for SolanaLedger {
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, RemoteError> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|e| to_remote(&e))?;
        Ok(response.value.map(|account| account.data))
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, RemoteError> {
        let config = RpcProgramAccountsConfig {
            filters: Some(filters.iter().map(AccountFilter::to_rpc).collect()),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                data_slice: None,
                commitment: Some(self.commitment),
                min_context_slot: None,
            },
            with_context: Some(false),
            sort_results: None,
        };

        let accounts = self
            .client
            .get_program_accounts_with_config(program_id, config)
            .await
            .map_err(|e| to_remote(&e))?;
        Ok(accounts.into_iter().map(|(key, account)| (key, account.data)).collect())
    }

    async fn get_token_account_balance(&self, address: &Pubkey) -> Result<TokenBalance, RemoteError> {
        let balance = self
            .client
            .get_token_account_balance(address)
            .await
            .map_err(|e| to_remote(&e))?;
        Ok(TokenBalance {
            amount: balance.amount,
            decimals: balance.decimals,
            ui_amount_string: balance.ui_amount_string,
        })
    }
}

fn to_remote(error: &ClientError) -> RemoteError {
    RemoteError { class: classify(error), message: error.to_string() }
}

// Codes JSON-RPC qui signalent un nœud saturé ou en retard, pas une requête fausse.
const TRANSIENT_RPC_CODES: [i64; 6] = [-32005, -32004, -32016, -32603, -32429, 429];

/// Détermine si une erreur du client est temporaire et si une nouvelle tentative doit être effectuée.
pub fn classify(error: &ClientError) -> ErrorClass {
    let retryable = match &error.kind {
        ClientErrorKind::Io(_) => true,
        ClientErrorKind::Reqwest(e) => match e.status() {
            Some(status) => status.as_u16() == 429 || status.is_server_error(),
            // Pas de statut : timeout, connexion refusée, corps tronqué...
            None => true,
        },
        ClientErrorKind::RpcError(RpcError::RpcRequestError(_)) => true,
        ClientErrorKind::RpcError(RpcError::RpcResponseError { code, .. }) => {
            TRANSIENT_RPC_CODES.contains(code)
        }
        _ => false,
    };

    if retryable { ErrorClass::Retryable } else { ErrorClass::NonRetryable }
}
