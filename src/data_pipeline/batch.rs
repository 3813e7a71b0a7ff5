// src/data_pipeline/batch.rs

// Lignes de sortie et lots par catégorie. Un lot appartient à la passe qui l'a
// créé jusqu'au dépôt, puis il est sérialisé une seule fois.

use crate::decoders::DecodedAccount;
use crate::decoders::spl_token_decoders::TokenAccountRecord;
use crate::rpc::TokenBalance;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Pool,
    Tick,
    PersonalPosition,
    ProtocolPosition,
}

impl Category {
    pub const ALL: [Category; 4] =
        [Category::Pool, Category::Tick, Category::PersonalPosition, Category::ProtocolPosition];

    /// Répertoire de la clé objet.
    pub fn dir(&self) -> &'static str {
        match self {
            Category::Pool => "pool",
            Category::Tick => "tick",
            Category::PersonalPosition => "personal_position",
            Category::ProtocolPosition => "protocol_position",
        }
    }

    /// Suffixe du nom de fichier.
    pub fn suffix(&self) -> &'static str {
        match self {
            Category::Pool => "pools",
            Category::Tick => "ticks",
            Category::PersonalPosition => "personal_position",
            Category::ProtocolPosition => "protocol_position",
        }
    }
}

/// Horodatage d'extraction : capturé UNE fois par passe, copié sur chaque ligne.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionStamp(DateTime<Utc>);

impl ExtractionStamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    pub fn rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Forme utilisée dans les clés objet, sans `:` ni espace.
    pub fn key_fragment(&self) -> String {
        self.0.format("%Y-%m-%d_%H-%M-%S").to_string()
    }
}

impl Serialize for ExtractionStamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.rfc3339())
    }
}

/// `{prefix}/{category}/{mint}_{timestamp}_{suffix}.json`
pub fn object_key(prefix: &str, category: Category, mint: &Pubkey, stamp: &ExtractionStamp) -> String {
    let file = format!("{}/{}_{}_{}.json", category.dir(), mint, stamp.key_fragment(), category.suffix());
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() { file } else { format!("{prefix}/{file}") }
}

// --- Lignes ---

/// Etat d'un vault : solde RPC (Raydium) ou compte de jeton décodé (Orca).
/// Dans les deux cas `amount` est le montant brut, en plus petites unités.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum VaultState {
    Balance(TokenBalance),
    Account(TokenAccountRecord),
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultRow {
    #[serde_as(as = "DisplayFromStr")]
    pub address: Pubkey,
    #[serde(flatten)]
    pub state: VaultState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRow {
    pub pool: DecodedAccount,
    /// Extension de bitmap (Raydium seulement, et seulement si le compte existe).
    pub extension: Option<DecodedAccount>,
    pub current_tick: i32,
    pub tick_spacing: u16,
    pub current_array_start: i32,
    pub token_vault_0: Option<VaultRow>,
    pub token_vault_1: Option<VaultRow>,
    #[serde(rename = "extraction_timestamp")]
    pub extraction_timestamp: ExtractionStamp,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickRow {
    #[serde_as(as = "DisplayFromStr")]
    pub pool: Pubkey,
    /// Indexé par adresse du tick array.
    pub tick_arrays: BTreeMap<String, DecodedAccount>,
    #[serde(rename = "extraction_timestamp")]
    pub extraction_timestamp: ExtractionStamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionRow {
    #[serde(flatten)]
    pub account: DecodedAccount,
    pub extraction_timestamp: ExtractionStamp,
}

// --- Lots ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<T> {
    category: Category,
    rows: Vec<T>,
}

impl<T: Serialize> Batch<T> {
    pub fn new(category: Category) -> Self {
        Self { category, rows: Vec::new() }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = T>) {
        self.rows.extend(rows);
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Tableau JSON indenté. Un lot vide donne `[]`, qui est déposé quand même.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.rows)
    }
}

/// Les quatre lots d'une passe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batches {
    pub pools: Batch<PoolRow>,
    pub ticks: Batch<TickRow>,
    pub personal_positions: Batch<PositionRow>,
    pub protocol_positions: Batch<PositionRow>,
}

impl Default for Batches {
    fn default() -> Self {
        Self {
            pools: Batch::new(Category::Pool),
            ticks: Batch::new(Category::Tick),
            personal_positions: Batch::new(Category::PersonalPosition),
            protocol_positions: Batch::new(Category::ProtocolPosition),
        }
    }
}

impl Batches {
    pub fn len(&self, category: Category) -> usize {
        match category {
            Category::Pool => self.pools.len(),
            Category::Tick => self.ticks.len(),
            Category::PersonalPosition => self.personal_positions.len(),
            Category::ProtocolPosition => self.protocol_positions.len(),
        }
    }

    pub fn to_json(&self, category: Category) -> serde_json::Result<Vec<u8>> {
        match category {
            Category::Pool => self.pools.to_json(),
            Category::Tick => self.ticks.to_json(),
            Category::PersonalPosition => self.personal_positions.to_json(),
            Category::ProtocolPosition => self.protocol_positions.to_json(),
        }
    }
}
