// src/decoders/mod.rs

use crate::error::DecodeError;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;

// --- 1. Déclarer tous nos modules principaux ---
pub mod layout;
pub mod orca;
pub mod raydium;
pub mod spl_token_decoders;

use orca::whirlpool;
use raydium::clmm;

// --- 2. Les programmes sources ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SourceProgram {
    #[serde(rename = "raydium_amm_v3")]
    RaydiumClmm,
    #[serde(rename = "whirlpool")]
    OrcaWhirlpool,
}

impl SourceProgram {
    pub fn program_id(&self) -> Pubkey {
        match self {
            SourceProgram::RaydiumClmm => clmm::PROGRAM_ID,
            SourceProgram::OrcaWhirlpool => whirlpool::PROGRAM_ID,
        }
    }

    /// Nom court utilisé dans les logs, les métriques et la ligne de commande.
    pub fn label(&self) -> &'static str {
        match self {
            SourceProgram::RaydiumClmm => "raydium",
            SourceProgram::OrcaWhirlpool => "orca",
        }
    }
}

// --- 3. L'enum unifié des enregistrements décodés ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Pool,
    TickArray,
    TickArrayBitmapExtension,
    PersonalPosition,
    ProtocolPosition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedRecord {
    RaydiumPool(Box<clmm::PoolStateRecord>),
    RaydiumTickArray(Box<clmm::TickArrayRecord>),
    RaydiumBitmapExtension(Box<clmm::BitmapExtensionRecord>),
    RaydiumPersonalPosition(clmm::PersonalPositionRecord),
    RaydiumProtocolPosition(clmm::ProtocolPositionRecord),
    Whirlpool(Box<whirlpool::WhirlpoolRecord>),
    WhirlpoolTickArray(Box<whirlpool::WhirlpoolTickArrayRecord>),
    WhirlpoolPosition(whirlpool::WhirlpoolPositionRecord),
}

impl NormalizedRecord {
    /// Nom du type de compte on-chain.
    pub fn name(&self) -> &'static str {
        match self {
            NormalizedRecord::RaydiumPool(_) => clmm::pool::NAME,
            NormalizedRecord::RaydiumTickArray(_) => clmm::tick_array::NAME,
            NormalizedRecord::RaydiumBitmapExtension(_) => clmm::tickarray_bitmap_extension::NAME,
            NormalizedRecord::RaydiumPersonalPosition(_) => clmm::position::PERSONAL_NAME,
            NormalizedRecord::RaydiumProtocolPosition(_) => clmm::position::PROTOCOL_NAME,
            NormalizedRecord::Whirlpool(_) => whirlpool::pool::NAME,
            NormalizedRecord::WhirlpoolTickArray(_) => whirlpool::tick_array::NAME,
            NormalizedRecord::WhirlpoolPosition(_) => whirlpool::position::NAME,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            NormalizedRecord::RaydiumPool(_) | NormalizedRecord::Whirlpool(_) => RecordKind::Pool,
            NormalizedRecord::RaydiumTickArray(_) | NormalizedRecord::WhirlpoolTickArray(_) => RecordKind::TickArray,
            NormalizedRecord::RaydiumBitmapExtension(_) => RecordKind::TickArrayBitmapExtension,
            NormalizedRecord::RaydiumPersonalPosition(_) | NormalizedRecord::WhirlpoolPosition(_) => {
                RecordKind::PersonalPosition
            }
            NormalizedRecord::RaydiumProtocolPosition(_) => RecordKind::ProtocolPosition,
        }
    }
}

/// Sérialisé comme `{"name": <type>, "data": {...}, "type": "account"}`.
impl Serialize for NormalizedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut parsed = serializer.serialize_struct("Parsed", 3)?;
        parsed.serialize_field("name", self.name())?;
        match self {
            NormalizedRecord::RaydiumPool(data) => parsed.serialize_field("data", data)?,
            NormalizedRecord::RaydiumTickArray(data) => parsed.serialize_field("data", data)?,
            NormalizedRecord::RaydiumBitmapExtension(data) => parsed.serialize_field("data", data)?,
            NormalizedRecord::RaydiumPersonalPosition(data) => parsed.serialize_field("data", data)?,
            NormalizedRecord::RaydiumProtocolPosition(data) => parsed.serialize_field("data", data)?,
            NormalizedRecord::Whirlpool(data) => parsed.serialize_field("data", data)?,
            NormalizedRecord::WhirlpoolTickArray(data) => parsed.serialize_field("data", data)?,
            NormalizedRecord::WhirlpoolPosition(data) => parsed.serialize_field("data", data)?,
        }
        parsed.serialize_field("type", "account")?;
        parsed.end()
    }
}

/// Un compte décodé avec ses métadonnées : adresse, programme source, taille brute.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedAccount {
    #[serde_as(as = "DisplayFromStr")]
    pub address: Pubkey,
    pub parsed: NormalizedRecord,
    pub program: SourceProgram,
    pub space: usize,
}

// --- 4. Le registre discriminateur -> schéma ---
pub struct Schema {
    pub discriminator: [u8; layout::DISCRIMINATOR_LEN],
    pub name: &'static str,
    decode: fn(&[u8]) -> Result<NormalizedRecord, DecodeError>,
}

const RAYDIUM_CLMM_SCHEMAS: &[Schema] = &[
    Schema { discriminator: clmm::pool::DISCRIMINATOR, name: clmm::pool::NAME, decode: clmm::pool::decode_record },
    Schema {
        discriminator: clmm::tick_array::DISCRIMINATOR,
        name: clmm::tick_array::NAME,
        decode: clmm::tick_array::decode_record,
    },
    Schema {
        discriminator: clmm::tickarray_bitmap_extension::DISCRIMINATOR,
        name: clmm::tickarray_bitmap_extension::NAME,
        decode: clmm::tickarray_bitmap_extension::decode_record,
    },
    Schema {
        discriminator: clmm::position::PERSONAL_DISCRIMINATOR,
        name: clmm::position::PERSONAL_NAME,
        decode: clmm::position::decode_personal_record,
    },
    Schema {
        discriminator: clmm::position::PROTOCOL_DISCRIMINATOR,
        name: clmm::position::PROTOCOL_NAME,
        decode: clmm::position::decode_protocol_record,
    },
];

const ORCA_WHIRLPOOL_SCHEMAS: &[Schema] = &[
    Schema {
        discriminator: whirlpool::pool::DISCRIMINATOR,
        name: whirlpool::pool::NAME,
        decode: whirlpool::pool::decode_record,
    },
    Schema {
        discriminator: whirlpool::tick_array::DISCRIMINATOR,
        name: whirlpool::tick_array::NAME,
        decode: whirlpool::tick_array::decode_record,
    },
    Schema {
        discriminator: whirlpool::position::DISCRIMINATOR,
        name: whirlpool::position::NAME,
        decode: whirlpool::position::decode_record,
    },
];

/// Décodeur d'un programme : le discriminateur choisit le schéma AVANT toute
/// lecture de champ. Pas d'I/O, pas d'état global.
#[derive(Clone, Copy)]
pub struct AccountDecoder {
    program: SourceProgram,
    schemas: &'static [Schema],
}

impl AccountDecoder {
    pub fn raydium_clmm() -> Self {
        Self { program: SourceProgram::RaydiumClmm, schemas: RAYDIUM_CLMM_SCHEMAS }
    }

    pub fn orca_whirlpool() -> Self {
        Self { program: SourceProgram::OrcaWhirlpool, schemas: ORCA_WHIRLPOOL_SCHEMAS }
    }

    pub fn for_program(program: SourceProgram) -> Self {
        match program {
            SourceProgram::RaydiumClmm => Self::raydium_clmm(),
            SourceProgram::OrcaWhirlpool => Self::orca_whirlpool(),
        }
    }

    pub fn program(&self) -> SourceProgram {
        self.program
    }

    pub fn schema_for(&self, discriminator: &[u8; layout::DISCRIMINATOR_LEN]) -> Option<&'static Schema> {
        self.schemas.iter().find(|schema| schema.discriminator == *discriminator)
    }

    pub fn decode(&self, address: &Pubkey, data: &[u8]) -> Result<DecodedAccount, DecodeError> {
        if data.is_empty() {
            return Err(DecodeError::malformed("account", "compte vide"));
        }
        let (discriminator, body) = layout::split_discriminator(data).ok_or_else(|| {
            DecodeError::malformed("account", format!("{} octets, discriminateur incomplet", data.len()))
        })?;
        let schema = self
            .schema_for(&discriminator)
            .ok_or(DecodeError::UnknownSchema(discriminator))?;

        Ok(DecodedAccount {
            address: *address,
            parsed: (schema.decode)(body)?,
            program: self.program,
            space: data.len(),
        })
    }
}
