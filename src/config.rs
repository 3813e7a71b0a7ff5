// src/config.rs

use crate::data_pipeline::snapshot::SnapshotSettings;
use crate::decoders::SourceProgram;
use crate::rpc::{FetcherConfig, RetryPolicy};
use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

fn default_raydium_prefix() -> String {
    "raydium".to_string()
}

fn default_orca_prefix() -> String {
    "orca".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./snapshots")
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(alias = "token")]
    pub token_mint: String,
    #[serde(alias = "rpc_url")]
    pub raydium_rpc_url: String,
    pub orca_rpc_url: String,
    pub storage_bucket_name: String,
    #[serde(default = "default_raydium_prefix")]
    pub raydium_storage_key: String,
    #[serde(default = "default_orca_prefix")]
    pub orca_storage_key: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    pub storage_endpoint_url: Option<String>,
    pub storage_access_key: Option<String>,
    pub metrics_port: Option<u16>,
}

/// Surcharges d'un profil de fetch, lues sous `RAYDIUM_*` ou `ORCA_*`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FetcherOverrides {
    pub max_concurrency: Option<usize>,
    pub requests_per_second: Option<u32>,
    pub pacing_ms: Option<u64>,
    pub retry_max_attempts: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub retry_max_delay_ms: Option<u64>,
    pub pool_parallelism: Option<usize>,
}

impl FetcherOverrides {
    fn load(program: SourceProgram) -> Result<Self> {
        let prefix = match program {
            SourceProgram::RaydiumClmm => "RAYDIUM_",
            SourceProgram::OrcaWhirlpool => "ORCA_",
        };
        envy::prefixed(prefix)
            .from_env::<Self>()
            .with_context(|| format!("Surcharges {prefix}* invalides"))
    }

    /// Applique les surcharges au profil par défaut du programme.
    pub fn apply(&self, base: FetcherConfig) -> FetcherConfig {
        let retry = RetryPolicy::new(
            self.retry_max_attempts.unwrap_or(base.retry.max_attempts),
            self.retry_base_delay_ms.map(Duration::from_millis).unwrap_or(base.retry.base_delay),
            self.retry_max_delay_ms.map(Duration::from_millis).unwrap_or(base.retry.max_delay),
        );
        FetcherConfig {
            max_concurrency: self.max_concurrency.unwrap_or(base.max_concurrency),
            requests_per_second: self.requests_per_second.unwrap_or(base.requests_per_second),
            pacing: self.pacing_ms.map(Duration::from_millis).unwrap_or(base.pacing),
            retry,
        }
    }
}

/// Réglages complets d'un programme : profil de fetch + paramètres de la passe.
#[derive(Debug, Clone)]
pub struct ProgramProfile {
    pub program: SourceProgram,
    pub rpc_url: String,
    pub fetcher: FetcherConfig,
    pub snapshot: SnapshotSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>().context("Configuration d'environnement invalide")?;
        Ok(config)
    }

    pub fn target_mint(&self) -> Result<Pubkey> {
        Pubkey::from_str(self.token_mint.trim())
            .with_context(|| format!("TOKEN_MINT invalide: {}", self.token_mint))
    }

    /// Profil Raydium : séquentiel cadencé, un pool à la fois.
    /// Profil Orca : parallélisme borné, quatre pools à la fois.
    pub fn profile(&self, program: SourceProgram) -> Result<ProgramProfile> {
        let overrides = FetcherOverrides::load(program)?;
        self.profile_with(program, &overrides)
    }

    pub fn profile_with(&self, program: SourceProgram, overrides: &FetcherOverrides) -> Result<ProgramProfile> {
        let (rpc_url, base, prefix, parallelism) = match program {
            SourceProgram::RaydiumClmm => {
                (&self.raydium_rpc_url, FetcherConfig::sequential_paced(), &self.raydium_storage_key, 1)
            }
            SourceProgram::OrcaWhirlpool => {
                (&self.orca_rpc_url, FetcherConfig::parallel(), &self.orca_storage_key, 4)
            }
        };
        Ok(ProgramProfile {
            program,
            rpc_url: rpc_url.clone(),
            fetcher: overrides.apply(base),
            snapshot: SnapshotSettings {
                target_mint: self.target_mint()?,
                bucket: self.storage_bucket_name.clone(),
                storage_prefix: prefix.clone(),
                pool_parallelism: overrides.pool_parallelism.unwrap_or(parallelism),
            },
        })
    }
}
