//! Code related to the CLI commands for the settings file.
use crate::settings::{Settings, get_settings_file_path};
use anyhow::Result;
use clap::Subcommand;

/// The available subcommands for managing the settings file.
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Show the path to the settings file.
    Path,
    /// Show the contents of the default settings file.
    ShowDefault,
}

impl SettingsSubcommands {
    /// Execute the supplied settings subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Path => handle_path_command(),
            Self::ShowDefault => handle_show_default_command(),
        }

        Ok(())
    }
}

fn handle_path_command() {
    let file_path = get_settings_file_path();
    if file_path.is_file() {
        println!("{}", file_path.display());
    } else {
        println!(
            "{} (file does not exist; default settings are used)",
            file_path.display()
        );
    }
}

fn handle_show_default_command() {
    print!("{}", Settings::default_file_contents());
}
