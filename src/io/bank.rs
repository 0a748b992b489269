//! Binary particle-bank snapshots.
//!
//! Banks are serialized with bincode behind buffered readers and writers.
//! The main use is restart-style workflows: dump the final fission source of
//! an eigenvalue run and preload it as the initial source bank of the next.

use crate::particle::Bank;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Saves a bank to `path`, creating parent directories as needed.
pub fn save_bank(path: &Path, bank: &[crate::particle::Particle]) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    bincode::serialize_into(writer, bank)?;
    Ok(())
}

/// Loads a bank previously written by [`save_bank`].
pub fn load_bank(path: &Path) -> Result<Bank, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("bank file not found: {}", path.display()).into());
    }
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(bincode::deserialize_from::<_, Bank>(reader)?)
}
