// src/error.rs

// Taxonomie des erreurs du pipeline. Seule `SnapshotError` est fatale à une passe :
// tout le reste est converti en "skip + log" au niveau du pool ou du compte.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Classification d'une erreur distante : faut-il retenter ou non ?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Retryable,
    NonRetryable,
}

/// Une erreur brute renvoyée par le service RPC, déjà classée.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    pub class: ErrorClass,
    pub message: String,
}

impl RemoteError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self { class: ErrorClass::Retryable, message: message.into() }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self { class: ErrorClass::NonRetryable, message: message.into() }
    }

    pub fn is_retryable(&self) -> bool {
        self.class == ErrorClass::Retryable
    }
}

/// Échec terminal d'une lecture, après application de la politique de ré-essai.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("compte introuvable")]
    NotFound,

    #[error("abandon après {attempts} tentative(s): {last}")]
    Exhausted { attempts: u32, last: RemoteError },

    #[error("requête rejetée: {0}")]
    Rejected(RemoteError),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("schéma inconnu pour le discriminateur {}", hex::encode(.0))]
    UnknownSchema([u8; 8]),

    #[error("données malformées pour {schema}: {reason}")]
    MalformedPayload { schema: &'static str, reason: String },
}

impl DecodeError {
    pub(crate) fn malformed(schema: &'static str, reason: impl Into<String>) -> Self {
        DecodeError::MalformedPayload { schema, reason: reason.into() }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DerivationError {
    #[error("aucun bump dans [255..0] ne produit une adresse hors courbe")]
    NoValidAddress,

    #[error("seeds invalides: {0}")]
    InvalidSeeds(String),
}

/// Raison pour laquelle un pool entier a été écarté de la passe.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolFailure {
    #[error("lecture de {address} impossible: {source}")]
    Fetch { address: Pubkey, source: FetchError },

    #[error("décodage de {address} impossible: {source}")]
    Decode { address: Pubkey, source: DecodeError },

    #[error("dérivation d'adresse impossible: {0}")]
    Derivation(#[from] DerivationError),

    #[error("scan des {what} de {address} impossible: {source}")]
    Scan { address: Pubkey, what: &'static str, source: FetchError },

    #[error("{address} n'est pas un compte {expected}")]
    UnexpectedRecord { address: Pubkey, expected: &'static str },
}

/// Erreur fatale à une passe complète.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("découverte des pools impossible: {0}")]
    Discovery(#[source] FetchError),
}
