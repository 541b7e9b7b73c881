//! Offline conversion between editor and API documents.

use anyhow::Result;
use blogdesk_shared::{from_api, to_api};

use crate::{
    cli::TranslateCommands,
    utils::{print_json, read_api_body, read_editor_document},
};

/// Runs one `translate` subcommand.
pub fn run(command: TranslateCommands) -> Result<()> {
    match command {
        TranslateCommands::ToApi {
            file,
        } => {
            let blocks = read_editor_document(&file)?;
            print_json(&to_api(&blocks))
        },
        TranslateCommands::FromApi {
            file,
        } => {
            let stored = read_api_body(&file)?;
            print_json(&from_api(Some(&stored)))
        },
    }
}
