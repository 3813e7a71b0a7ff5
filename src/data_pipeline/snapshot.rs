// src/data_pipeline/snapshot.rs

// Une passe complète pour un programme et un mint :
// découverte -> collecte pool par pool -> assemblage des lots -> dépôt.
// Seule la découverte peut faire échouer la passe.

use super::batch::{Batches, Category, ExtractionStamp, object_key};
use super::harvest::{PoolHarvest, PoolHarvester, SkippedAddress};
use super::sink::OutputSink;
use crate::decoders::SourceProgram;
use crate::error::{PoolFailure, SnapshotError};
use crate::monitoring::metrics::{POOLS_DISCOVERED, POOLS_SKIPPED, RECORDS_PRODUCED};
use crate::rpc::RateLimitedFetcher;
use futures::future;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};
use solana_sdk::pubkey::Pubkey;
use std::pin::pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSettings {
    pub target_mint: Pubkey,
    pub bucket: String,
    /// Préfixe des clés objet, propre à chaque programme ("raydium", "orca").
    pub storage_prefix: String,
    /// Nombre de pools collectés en même temps. Le budget RPC reste celui du fetcher.
    pub pool_parallelism: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Discover,
    /// Dérivation, lecture puis décodage, pool par pool.
    Harvest,
    Assemble,
    Handoff,
}

/// Métadonnées renvoyées au déclencheur.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub program: SourceProgram,
    #[serde_as(as = "DisplayFromStr")]
    pub target_mint: Pubkey,
    pub extraction_timestamp: ExtractionStamp,
    pub pools_discovered: usize,
    pub pools_completed: usize,
    pub output_keys: Vec<String>,
    pub failed_uploads: Vec<String>,
    pub skipped_pools: Vec<SkippedAddress>,
    pub skipped_accounts: Vec<SkippedAddress>,
    /// Vrai si l'annulation a empêché de traiter certains pools découverts.
    pub cancelled: bool,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    AbortedEarly {
        program: SourceProgram,
        target_mint: Pubkey,
        extraction_timestamp: ExtractionStamp,
        error: SnapshotError,
    },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }
}

pub struct SnapshotOrchestrator {
    fetcher: Arc<RateLimitedFetcher>,
    harvester: Arc<dyn PoolHarvester>,
    sink: Arc<dyn OutputSink>,
    settings: SnapshotSettings,
    cancel: CancellationToken,
}

impl SnapshotOrchestrator {
    pub fn new(
        fetcher: Arc<RateLimitedFetcher>,
        harvester: Arc<dyn PoolHarvester>,
        sink: Arc<dyn OutputSink>,
        settings: SnapshotSettings,
    ) -> Self {
        Self { fetcher, harvester, sink, settings, cancel: CancellationToken::new() }
    }

    /// L'annulation est vérifiée entre deux pools, jamais au milieu d'un pool :
    /// les pools déjà lancés vont au bout.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(&self) -> RunOutcome {
        let program = self.harvester.program();
        let span = info_span!("snapshot_run", program = program.label(), mint = %self.settings.target_mint);
        // Capturé une seule fois : toutes les lignes et toutes les clés de la passe le partagent.
        let stamp = ExtractionStamp::now();
        self.run_at(stamp).instrument(span).await
    }

    async fn run_at(&self, stamp: ExtractionStamp) -> RunOutcome {
        let program = self.harvester.program();
        let mint = self.settings.target_mint;

        info!(phase = ?RunPhase::Discover, extraction_timestamp = %stamp.rfc3339(), "Début de la passe");
        let pools = match self.harvester.discover(&self.fetcher, &mint).await {
            Ok(pools) => pools,
            Err(e) => {
                error!(error = %e, "Découverte impossible, passe abandonnée sans sortie");
                return RunOutcome::AbortedEarly {
                    program,
                    target_mint: mint,
                    extraction_timestamp: stamp,
                    error: SnapshotError::Discovery(e),
                };
            }
        };
        POOLS_DISCOVERED.with_label_values(&[program.label()]).set(pools.len() as i64);

        let mut report = RunReport {
            program,
            target_mint: mint,
            extraction_timestamp: stamp,
            pools_discovered: pools.len(),
            pools_completed: 0,
            output_keys: Vec::new(),
            failed_uploads: Vec::new(),
            skipped_pools: Vec::new(),
            skipped_accounts: Vec::new(),
            cancelled: false,
        };
        let mut batches = Batches::default();

        info!(phase = ?RunPhase::Harvest, pools = pools.len(), "Collecte des pools");
        let cancel = &self.cancel;
        let mut harvested = pin!(
            stream::iter(pools)
                .take_while(|_| future::ready(!cancel.is_cancelled()))
                .map(|pool| {
                    let span = info_span!("pool", pool = %pool);
                    async move { (pool, self.harvester.harvest(&self.fetcher, &pool, stamp).await) }.instrument(span)
                })
                .buffer_unordered(self.settings.pool_parallelism.max(1))
        );

        // Ordre d'arrivée, pas ordre de découverte.
        let mut processed = 0;
        while let Some((pool, outcome)) = harvested.next().await {
            processed += 1;
            match outcome {
                Ok(harvest) => {
                    report.pools_completed += 1;
                    assemble(&mut batches, &mut report, harvest);
                }
                Err(failure) => self.skip_pool(&mut report, pool, failure),
            }
        }
        report.cancelled = processed < report.pools_discovered;
        if report.cancelled {
            warn!(processed, discovered = report.pools_discovered, "Passe annulée entre deux pools");
        }

        info!(
            phase = ?RunPhase::Assemble,
            pools = batches.pools.len(),
            ticks = batches.ticks.len(),
            personal_positions = batches.personal_positions.len(),
            protocol_positions = batches.protocol_positions.len(),
            "Lots assemblés"
        );
        self.hand_off(&batches, &mut report).await;
        info!(
            pools_completed = report.pools_completed,
            pools_skipped = report.skipped_pools.len(),
            accounts_skipped = report.skipped_accounts.len(),
            "Passe terminée"
        );
        RunOutcome::Completed(report)
    }

    fn skip_pool(&self, report: &mut RunReport, pool: Pubkey, failure: PoolFailure) {
        let program = self.harvester.program();
        warn!(pool = %pool, error = %failure, "Pool ignoré");
        if matches!(failure, PoolFailure::Derivation(_)) {
            // Un schéma de seeds faux ne se corrige pas en ré-essayant.
            error!(pool = %pool, "Dérivation d'adresse impossible : seeds à vérifier");
        }
        POOLS_SKIPPED.with_label_values(&[program.label()]).inc();
        report.skipped_pools.push(SkippedAddress { address: pool, reason: failure.to_string() });
    }

    /// Chaque catégorie est déposée, même vide. Un dépôt raté est noté, pas ré-essayé.
    async fn hand_off(&self, batches: &Batches, report: &mut RunReport) {
        let program = self.harvester.program();
        info!(phase = ?RunPhase::Handoff, "Dépôt des lots");
        for category in Category::ALL {
            let rows = batches.len(category);
            let key = object_key(&self.settings.storage_prefix, category, &report.target_mint, &report.extraction_timestamp);
            RECORDS_PRODUCED
                .with_label_values(&[program.label(), category.dir()])
                .inc_by(rows as u64);

            let body = match batches.to_json(category) {
                Ok(body) => body,
                Err(e) => {
                    error!(key = %key, error = %e, "Sérialisation du lot impossible");
                    report.failed_uploads.push(key);
                    continue;
                }
            };
            match self.sink.put(&self.settings.bucket, &key, body).await {
                Ok(()) => {
                    info!(key = %key, rows, "Lot déposé");
                    report.output_keys.push(key);
                }
                Err(e) => {
                    error!(key = %key, error = %format!("{e:#}"), "Dépôt du lot impossible");
                    report.failed_uploads.push(key);
                }
            }
        }
    }
}

fn assemble(batches: &mut Batches, report: &mut RunReport, harvest: PoolHarvest) {
    let PoolHarvest { pool, ticks, personal_positions, protocol_positions, skipped_accounts } = harvest;
    batches.pools.extend([pool]);
    batches.ticks.extend([ticks]);
    batches.personal_positions.extend(personal_positions);
    batches.protocol_positions.extend(protocol_positions);
    report.skipped_accounts.extend(skipped_accounts);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_pipeline::harvest::RaydiumClmmHarvester;
    use crate::decoders::raydium::clmm::{self, pool};
    use crate::rpc::{FetcherConfig, TokenBalance};
    use crate::testing::{MemorySink, MockLedger, fixtures};

    const BUCKET: &str = "snapshots";

    fn settings(mint: Pubkey) -> SnapshotSettings {
        SnapshotSettings {
            target_mint: mint,
            bucket: BUCKET.to_string(),
            storage_prefix: "raydium".to_string(),
            pool_parallelism: 2,
        }
    }

    /// Pool complet : un tick array (départ 0), deux vaults, une position de chaque sorte.
    fn seed_pool(ledger: &MockLedger, mint: Pubkey) -> Pubkey {
        let pool_address = Pubkey::new_unique();
        let mut raw = fixtures::raydium_pool_layout(mint, Pubkey::new_unique(), 60);
        let mut bitmap = [0u64; 16];
        bitmap[8] = 1;
        raw.tick_array_bitmap = bitmap;
        for vault in [raw.token_vault_0, raw.token_vault_1] {
            ledger.set_token_balance(
                vault,
                TokenBalance { amount: "1".to_string(), decimals: 0, ui_amount_string: "1".to_string() },
            );
        }
        ledger.add_owned_account(
            clmm::PROGRAM_ID,
            pool_address,
            fixtures::with_discriminator(pool::DISCRIMINATOR, bytemuck::bytes_of(&raw)),
        );
        ledger.add_owned_account(
            clmm::PROGRAM_ID,
            clmm::tick_array_address(&pool_address, 0).unwrap(),
            fixtures::raydium_tick_array_account(pool_address, 0),
        );
        ledger.add_owned_account(
            clmm::PROGRAM_ID,
            Pubkey::new_unique(),
            fixtures::raydium_personal_position_account(pool_address),
        );
        ledger.add_owned_account(
            clmm::PROGRAM_ID,
            Pubkey::new_unique(),
            fixtures::raydium_protocol_position_account(pool_address),
        );
        pool_address
    }

    fn orchestrator(ledger: Arc<MockLedger>, sink: Arc<MemorySink>, mint: Pubkey) -> SnapshotOrchestrator {
        SnapshotOrchestrator::new(
            Arc::new(RateLimitedFetcher::new(ledger, FetcherConfig::parallel())),
            Arc::new(RaydiumClmmHarvester::default()),
            sink,
            settings(mint),
        )
    }

    fn rows(sink: &MemorySink, key: &str) -> Vec<serde_json::Value> {
        let value = sink.json(BUCKET, key).expect("lot déposé");
        value.as_array().cloned().expect("tableau JSON")
    }

    #[tokio::test(start_paused = true)]
    async fn failing_pool_is_skipped_and_the_run_completes() {
        let ledger = Arc::new(MockLedger::default());
        let sink = Arc::new(MemorySink::default());
        let mint = Pubkey::new_unique();

        let pool_a = seed_pool(&ledger, mint);
        let pool_b = ledger.add_owned_account(
            clmm::PROGRAM_ID,
            Pubkey::new_unique(),
            fixtures::raydium_pool_account(Pubkey::new_unique(), mint, 60),
        );
        ledger.fail_permanently(pool_b, "account index corrupted");

        let outcome = orchestrator(ledger.clone(), sink.clone(), mint).run().await;
        let RunOutcome::Completed(report) = outcome else { panic!("passe abandonnée: {outcome:?}") };

        assert_eq!(report.pools_discovered, 2);
        assert_eq!(report.pools_completed, 1);
        assert_eq!(report.skipped_pools.len(), 1);
        assert_eq!(report.skipped_pools[0].address, pool_b);
        assert!(report.skipped_pools[0].reason.contains("account index corrupted"));
        assert!(!report.cancelled);
        assert_eq!(report.output_keys.len(), 4);

        let stamp = report.extraction_timestamp.rfc3339();
        let [pools_key, ticks_key, personal_key, protocol_key] = [0, 1, 2, 3].map(|i| report.output_keys[i].clone());
        assert!(pools_key.starts_with(&format!("raydium/pool/{mint}_")));
        assert!(ticks_key.ends_with("_ticks.json"));

        let pools = rows(&sink, &pools_key);
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0]["pool"]["address"], pool_a.to_string());
        let ticks = rows(&sink, &ticks_key);
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0]["tickArrays"].as_object().map(|m| m.len()), Some(1));
        let personal = rows(&sink, &personal_key);
        let protocol = rows(&sink, &protocol_key);
        assert_eq!((personal.len(), protocol.len()), (1, 1));
        assert_eq!(personal[0]["parsed"]["data"]["poolId"], pool_a.to_string());

        // Un seul horodatage pour toute la passe.
        for row in pools.iter().chain(&ticks).chain(&personal).chain(&protocol) {
            assert_eq!(row["extraction_timestamp"], stamp);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn discovery_failure_aborts_without_output() {
        let ledger = Arc::new(MockLedger::default());
        let sink = Arc::new(MemorySink::default());
        let mint = Pubkey::new_unique();
        seed_pool(&ledger, mint);
        ledger.fail_scans_transiently(1_000);

        let outcome = orchestrator(ledger.clone(), sink.clone(), mint).run().await;
        assert!(matches!(
            outcome,
            RunOutcome::AbortedEarly { error: SnapshotError::Discovery(crate::error::FetchError::Exhausted { .. }), .. }
        ));
        assert!(sink.keys().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_discovery_still_hands_off_empty_batches() {
        let ledger = Arc::new(MockLedger::default());
        let sink = Arc::new(MemorySink::default());
        let mint = Pubkey::new_unique();

        let outcome = orchestrator(ledger, sink.clone(), mint).run().await;
        let RunOutcome::Completed(report) = outcome else { panic!("passe abandonnée") };
        assert_eq!(report.pools_discovered, 0);
        assert_eq!(sink.keys().len(), 4);
        for key in &report.output_keys {
            assert!(rows(&sink, key).is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_between_pools() {
        let ledger = Arc::new(MockLedger::default());
        let sink = Arc::new(MemorySink::default());
        let mint = Pubkey::new_unique();
        seed_pool(&ledger, mint);
        seed_pool(&ledger, mint);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = orchestrator(ledger.clone(), sink.clone(), mint).with_cancellation(cancel).run().await;
        let RunOutcome::Completed(report) = outcome else { panic!("passe abandonnée") };
        assert!(report.cancelled);
        assert_eq!(report.pools_completed, 0);
        assert_eq!(report.output_keys.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_upload_is_reported_not_retried() {
        let ledger = Arc::new(MockLedger::default());
        let sink = Arc::new(MemorySink::default());
        let mint = Pubkey::new_unique();
        seed_pool(&ledger, mint);
        sink.fail_keys_containing("/tick/");

        let outcome = orchestrator(ledger, sink.clone(), mint).run().await;
        let RunOutcome::Completed(report) = outcome else { panic!("passe abandonnée") };
        assert_eq!(report.output_keys.len(), 3);
        assert_eq!(report.failed_uploads.len(), 1);
        assert!(report.failed_uploads[0].contains("/tick/"));
        assert_eq!(sink.put_calls(), 4);
    }
}
