// src/addressing/mod.rs

// Tout ce qui calcule des adresses sans toucher au réseau : PDA et scan de bitmaps.
pub mod bitmap;
pub mod pda;

pub use bitmap::{array_start_index, scan, scan_extension};
pub use pda::{derive, derive_address};
