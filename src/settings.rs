//! Code for loading program settings.
use crate::get_flh_opt_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use crate::optimisation::SolverOptions;
use anyhow::Result;
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// If this environment variable is set, the settings file is ignored and defaults are used
pub const USE_DEFAULT_SETTINGS_ENV_VAR: &str = "FLH_OPT_USE_DEFAULT_SETTINGS";

const DEFAULT_SETTINGS_FILE_HEADER: &str = concat!(
    "# This file contains the program settings for flh-opt.
#
# The default options for flh-opt v",
    env!("CARGO_PKG_VERSION"),
    " are shown below, commented out. To change an option, uncomment it and set the value
# appropriately.
#
# To show the default options for the current version of flh-opt, run:
# \tflh-opt settings show-default
"
);

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    let mut path = get_flh_opt_config_dir();
    path.push(SETTINGS_FILE_NAME);

    path
}

/// Program settings from config file
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// The default program log level
    pub log_level: String,
    /// Directory containing aggregated renewable profiles
    pub profiles_dir: PathBuf,
    /// Directory in which to cache results. Caching is disabled if this is empty.
    pub cache_dir: PathBuf,
    /// Maximum time the solver may run for each problem, in seconds
    pub time_limit: f64,
    /// Primal and dual feasibility tolerance for the solver
    pub feasibility_tolerance: f64,
    /// Whether to retry once with relaxed solver options if the solver fails to converge
    pub retry_numerical_failures: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let solver_options = SolverOptions::default();
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            profiles_dir: PathBuf::from("profiles"),
            cache_dir: PathBuf::new(),
            time_limit: solver_options.time_limit,
            feasibility_tolerance: solver_options.feasibility_tolerance,
            retry_numerical_failures: true,
        }
    }
}

impl Settings {
    /// Read the contents of the settings file from the config directory.
    ///
    /// If the file is not present or the `FLH_OPT_USE_DEFAULT_SETTINGS` environment variable is
    /// set, default settings will be used.
    ///
    /// # Returns
    ///
    /// The program settings as a `Settings` struct or an error if loading fails.
    pub fn load() -> Result<Settings> {
        if env::var_os(USE_DEFAULT_SETTINGS_ENV_VAR).is_some() {
            return Ok(Settings::default());
        }

        Self::load_from_path(&get_settings_file_path())
    }

    /// Read from the specified path, returning defaults if the file doesn't exist
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        read_toml(file_path)
    }

    /// The cache directory, if caching is enabled
    pub fn cache_dir(&self) -> Option<&Path> {
        (!self.cache_dir.as_os_str().is_empty()).then_some(self.cache_dir.as_path())
    }

    /// Options for the solver
    pub fn solver_options(&self) -> SolverOptions {
        SolverOptions {
            time_limit: self.time_limit,
            feasibility_tolerance: self.feasibility_tolerance,
            ..SolverOptions::default()
        }
    }

    /// The contents of the default settings file.
    pub fn default_file_contents() -> String {
        // Settings object with default values for params
        let settings = Settings::default();

        // Convert to TOML
        let settings_raw = toml::to_string(&settings).expect("Could not convert settings to TOML");

        // Iterate through the generated TOML, commenting out parameter lines and inserting
        // their documentation comments
        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for line in settings_raw.split('\n') {
            if let Some((field, _)) = line.split_once('=') {
                // Use doc comment to document parameter. All fields should have doc comments.
                let field = field.trim();
                let docs = Settings::get_field_docs(field).expect("Missing doc comment for field");
                for line in docs.split('\n') {
                    write!(&mut out, "\n# # {}\n", line.trim()).unwrap();
                }

                writeln!(&mut out, "# {}", line.trim()).unwrap();
            }
        }

        out
    }
}
