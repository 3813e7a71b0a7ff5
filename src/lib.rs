// src/lib.rs

// Modules publics, utilisés par le binaire `snapshot_runner`.
pub mod addressing;
pub mod config;
pub mod data_pipeline;
pub mod decoders;
pub mod error;
pub mod monitoring;
pub mod rpc;

#[cfg(test)]
mod testing;
