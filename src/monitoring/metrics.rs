// DANS : src/monitoring/metrics.rs

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder, register_histogram_vec,
    register_int_counter_vec, register_int_gauge_vec,
};
use tracing::{error, info};
use warp::Filter;

// Les noms sont des constantes : un échec d'enregistrement est un bug de démarrage.
lazy_static! {
    // --- RPC ---
    pub static ref RPC_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dex_snapshot_rpc_requests_total",
        "Compteur total des requêtes RPC, segmenté par méthode et statut",
        &["method", "status"] // Labels: "get_account", "success" / "retry" / "failure"
    ).expect("métrique rpc_requests_total");
    pub static ref RPC_RETRIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dex_snapshot_rpc_retries_total",
        "Nouvelles tentatives après une erreur temporaire, par méthode",
        &["method"]
    ).expect("métrique rpc_retries_total");
    pub static ref RPC_REQUEST_LATENCY: HistogramVec = register_histogram_vec!(
        "dex_snapshot_rpc_request_latency_seconds",
        "Latence des appels RPC, attente du limiteur exclue",
        &["method"]
    ).expect("métrique rpc_request_latency");

    // --- Passe de snapshot ---
    pub static ref POOLS_DISCOVERED: IntGaugeVec = register_int_gauge_vec!(
        "dex_snapshot_pools_discovered",
        "Pools trouvés par la dernière découverte",
        &["program"]
    ).expect("métrique pools_discovered");
    pub static ref POOLS_SKIPPED: IntCounterVec = register_int_counter_vec!(
        "dex_snapshot_pools_skipped_total",
        "Pools écartés d'une passe suite à un échec",
        &["program"]
    ).expect("métrique pools_skipped");
    pub static ref RECORDS_PRODUCED: IntCounterVec = register_int_counter_vec!(
        "dex_snapshot_records_produced_total",
        "Lignes ajoutées aux lots de sortie",
        &["program", "category"]
    ).expect("métrique records_produced");
}

/// Expose `/metrics` en texte Prometheus. Ne rend la main qu'à l'arrêt du serveur.
pub async fn start_metrics_server(port: u16) {
    let metrics_route = warp::path!("metrics").map(|| {
        let encoder = TextEncoder::new();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            error!(error = %e, "Encodage des métriques impossible");
        }
        warp::reply::with_header(buffer, "content-type", encoder.format_type().to_string())
    });
    info!(port, "[Monitoring] Serveur de métriques exposé sur /metrics");
    warp::serve(metrics_route).run(([0, 0, 0, 0], port)).await;
}
