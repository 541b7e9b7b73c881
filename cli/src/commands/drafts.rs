//! Inspection of local drafts.

use anyhow::{bail, Result};
use blogdesk_client::{draft::read_local_draft, store::DRAFT_KEY_PREFIX, KeyValueStore};

use super::AppContext;
use crate::{
    cli::DraftCommands,
    utils::{clip, format_millis, format_table, normalize_draft_key, print_json},
};

/// Runs one `drafts` subcommand against the local store.
pub fn run(ctx: &AppContext, command: DraftCommands) -> Result<()> {
    let store = ctx.store.as_ref();
    match command {
        DraftCommands::List => {
            let mut rows = Vec::new();
            for key in store.keys()? {
                if !key.starts_with(DRAFT_KEY_PREFIX) {
                    continue;
                }
                match read_local_draft(store, &key) {
                    Some(draft) => rows.push(vec![
                        key,
                        draft.status.to_string(),
                        format_millis(draft.last_saved),
                        clip(&draft.title),
                    ]),
                    None => rows.push(vec![key, "-".to_string(), "-".to_string(), "(unreadable)".to_string()]),
                }
            }
            tracing::info!(
                "Local drafts ({}):\n{}",
                rows.len(),
                format_table(&["KEY", "STATE", "SAVED", "TITLE"], &rows)
            );
            Ok(())
        },
        DraftCommands::Show {
            key,
        } => {
            let key = normalize_draft_key(&key);
            match read_local_draft(store, &key) {
                Some(draft) => print_json(&draft),
                None => bail!("no readable local draft `{key}`"),
            }
        },
        DraftCommands::Discard {
            key,
        } => {
            let key = normalize_draft_key(&key);
            if store.get(&key)?.is_none() {
                bail!("no local draft `{key}`");
            }
            store.remove(&key)?;
            tracing::info!("Discarded {key}.");
            Ok(())
        },
    }
}
