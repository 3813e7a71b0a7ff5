// src/bin/snapshot_runner.rs

use anyhow::Result;
use clap::{Parser, ValueEnum};
use dex_snapshot::{
    config::Config,
    data_pipeline::harvest::harvester_for,
    data_pipeline::sink::{HttpObjectSink, LocalDirSink, OutputSink},
    data_pipeline::snapshot::{RunOutcome, SnapshotOrchestrator},
    decoders::SourceProgram,
    monitoring::{logging, metrics},
    rpc::{RateLimitedFetcher, SolanaLedger},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ProgramArg {
    Raydium,
    Orca,
}

impl From<ProgramArg> for SourceProgram {
    fn from(arg: ProgramArg) -> Self {
        match arg {
            ProgramArg::Raydium => SourceProgram::RaydiumClmm,
            ProgramArg::Orca => SourceProgram::OrcaWhirlpool,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Instantané des pools concentrés contenant un mint", long_about = None)]
struct Cli {
    /// Programmes à extraire, dans l'ordre. Les deux si rien n'est donné.
    #[arg(value_enum)]
    programs: Vec<ProgramArg>,
}

impl Cli {
    fn programs(&self) -> Vec<SourceProgram> {
        if self.programs.is_empty() {
            return vec![SourceProgram::RaydiumClmm, SourceProgram::OrcaWhirlpool];
        }
        let mut programs: Vec<SourceProgram> = Vec::new();
        for arg in &self.programs {
            let program = SourceProgram::from(*arg);
            if !programs.contains(&program) {
                programs.push(program);
            }
        }
        programs
    }
}

fn build_sink(config: &Config) -> Arc<dyn OutputSink> {
    match &config.storage_endpoint_url {
        Some(endpoint) => {
            info!(endpoint = %endpoint, "[Runner] Dépôt vers la passerelle de stockage");
            Arc::new(HttpObjectSink::new(endpoint.clone(), config.storage_access_key.clone()))
        }
        None => {
            info!(dir = %config.output_dir.display(), "[Runner] Dépôt dans un répertoire local");
            Arc::new(LocalDirSink::new(config.output_dir.clone()))
        }
    }
}

async fn run_program(
    config: &Config,
    program: SourceProgram,
    sink: Arc<dyn OutputSink>,
    cancel: CancellationToken,
) -> Result<RunOutcome> {
    let profile = config.profile(program)?;
    info!(
        program = program.label(),
        max_concurrency = profile.fetcher.max_concurrency,
        requests_per_second = profile.fetcher.requests_per_second,
        pool_parallelism = profile.snapshot.pool_parallelism,
        "[Runner] Lancement de la passe"
    );

    let ledger = Arc::new(SolanaLedger::new(profile.rpc_url.clone()));
    let fetcher = Arc::new(RateLimitedFetcher::new(ledger, profile.fetcher));
    let orchestrator = SnapshotOrchestrator::new(fetcher, harvester_for(program), sink, profile.snapshot)
        .with_cancellation(cancel);
    Ok(orchestrator.run().await)
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::setup_logging();
    let cli = Cli::parse();
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("[Runner] Configuration invalide : {:?}", e);
            std::process::exit(1);
        }
    };

    if let Some(port) = config.metrics_port {
        tokio::spawn(metrics::start_metrics_server(port));
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("[Runner] Interruption reçue, arrêt après les pools en cours");
            on_signal.cancel();
        }
    });

    let sink = build_sink(&config);
    let mut failed = false;

    for program in cli.programs() {
        if cancel.is_cancelled() {
            warn!(program = program.label(), "[Runner] Passe non lancée (interruption)");
            failed = true;
            continue;
        }
        match run_program(&config, program, sink.clone(), cancel.clone()).await {
            Ok(RunOutcome::Completed(report)) => {
                println!("{}", serde_json::to_string_pretty(&report)?);
                if !report.failed_uploads.is_empty() {
                    failed = true;
                }
            }
            Ok(RunOutcome::AbortedEarly { program, target_mint, error, .. }) => {
                error!(program = program.label(), mint = %target_mint, "[Runner] Passe abandonnée : {}", error);
                failed = true;
            }
            Err(e) => {
                error!(program = program.label(), "[Runner] Passe impossible : {:?}", e);
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
    info!("[Runner] Toutes les passes sont terminées.");
    Ok(())
}
