//! Cost optimisation of power-to-X process chains.
//!
//! Given a renewable generation, electrolysis and optional derivative synthesis chain, the
//! optimiser sizes all units and storage so that a fixed quantity of final product is delivered at
//! minimum annualised cost. The main entry point is [`optimisation::solve`].
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cache;
pub mod cli;
pub mod commodity;
pub mod id;
pub mod input;
pub mod log;
pub mod optimisation;
pub mod output;
pub mod problem;
pub mod process;
pub mod profile;
pub mod runner;
pub mod settings;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the directory in which program configuration files are stored.
///
/// # Panics
///
/// If the platform provides no configuration directory.
pub fn get_flh_opt_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().expect("Could not determine configuration directory");
    path.push("flh-opt");
    path
}
