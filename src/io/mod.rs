//! # IO Module - Result Persistence
//!
//! Two persistence concerns live here:
//!
//! 1. [`output`] writes the final results of a run (runtime, tally grids,
//!    means and standard deviations, the k-eff sequence) as a JSON tree
//!    whose keys mirror the dataset paths of the archival HDF5 layout, so
//!    downstream tooling can address `"<tally>/<score>/mean"` either way.
//! 2. [`bank`] serializes particle banks with bincode, which is how a
//!    converged fission source is dumped and fed back into a later run.

pub mod bank;
pub mod output;
