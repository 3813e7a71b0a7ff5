// src/decoders/layout.rs

use crate::error::DecodeError;
use bytemuck::Pod;
use std::mem::size_of;

/// Longueur du préfixe Anchor (`sha256("account:<Nom>")[..8]`).
pub const DISCRIMINATOR_LEN: usize = 8;

/// Sépare le discriminateur du corps du compte.
pub fn split_discriminator(data: &[u8]) -> Option<([u8; DISCRIMINATOR_LEN], &[u8])> {
    let (head, body) = data.split_first_chunk::<DISCRIMINATOR_LEN>()?;
    Some((*head, body))
}

/// Copie le début de `body` dans une struct `#[repr(C, packed)]`.
///
/// Les comptes peuvent être plus grands que la struct (réallocation) : seul un
/// corps trop court est une erreur.
pub fn read_layout<T: Pod>(schema: &'static str, body: &[u8]) -> Result<T, DecodeError> {
    let expected = size_of::<T>();
    let bytes = body.get(..expected).ok_or_else(|| {
        DecodeError::malformed(schema, format!("{} octets reçus, {} attendus", body.len(), expected))
    })?;
    bytemuck::try_pod_read_unaligned(bytes).map_err(|e| DecodeError::malformed(schema, e.to_string()))
}

/// Découpe `count` entrées de taille fixe à partir de `offset`.
pub fn read_entries<T: Pod>(
    schema: &'static str,
    body: &[u8],
    offset: usize,
    count: usize,
) -> Result<Vec<T>, DecodeError> {
    let entry_size = size_of::<T>();
    let end = offset + entry_size * count;
    let region = body.get(offset..end).ok_or_else(|| {
        DecodeError::malformed(schema, format!("{} octets reçus, {} attendus", body.len(), end))
    })?;
    Ok(region.chunks_exact(entry_size).map(bytemuck::pod_read_unaligned).collect())
}
