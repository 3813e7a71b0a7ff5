// src/data_pipeline/mod.rs

// Du mint cible aux lots déposés : découverte, collecte par pool, lots, dépôt.
pub mod batch;
pub mod discovery;
pub mod harvest;
pub mod onchain_scanner;
pub mod sink;
pub mod snapshot;
