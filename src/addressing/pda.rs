// src/addressing/pda.rs

use crate::error::DerivationError;
use solana_sdk::pubkey::{MAX_SEED_LEN, MAX_SEEDS, Pubkey, PubkeyError};

/// Dérive une Program-Derived Address en essayant les bumps de 255 à 0.
///
/// Chaque candidat est `sha256(seeds ‖ [bump] ‖ owner ‖ "ProgramDerivedAddress")` ;
/// le premier hash qui n'est PAS un point valide de la courbe ed25519 gagne.
/// C'est exactement l'algorithme du runtime Solana, donc les adresses obtenues
/// sont directement utilisables comme clés de lecture sur le réseau.
pub fn derive(seeds: &[&[u8]], owner: &Pubkey) -> Result<(Pubkey, u8), DerivationError> {
    // Le bump occupe une place de seed.
    if seeds.len() >= MAX_SEEDS {
        return Err(DerivationError::InvalidSeeds(format!(
            "{} seeds fournies, maximum {}",
            seeds.len(),
            MAX_SEEDS - 1
        )));
    }
    if let Some(seed) = seeds.iter().find(|seed| seed.len() > MAX_SEED_LEN) {
        return Err(DerivationError::InvalidSeeds(format!(
            "seed de {} octets, maximum {}",
            seed.len(),
            MAX_SEED_LEN
        )));
    }

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut candidate: Vec<&[u8]> = seeds.to_vec();
        candidate.push(&bump_seed);

        match Pubkey::create_program_address(&candidate, owner) {
            Ok(address) => return Ok((address, bump)),
            // Le hash tombe sur la courbe : on passe au bump suivant.
            Err(PubkeyError::InvalidSeeds) => continue,
            Err(e) => return Err(DerivationError::InvalidSeeds(e.to_string())),
        }
    }

    Err(DerivationError::NoValidAddress)
}

/// Raccourci quand le bump ne nous intéresse pas.
pub fn derive_address(seeds: &[&[u8]], owner: &Pubkey) -> Result<Pubkey, DerivationError> {
    derive(seeds, owner).map(|(address, _)| address)
}
