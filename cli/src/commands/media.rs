//! Media library commands.

use anyhow::{bail, Context, Result};
use blogdesk_client::{dashboard::media_list, media::MediaLibrary, MediaApi, UploadFile};
use blogdesk_shared::{
    category::UNCATEGORIZED_SLUG,
    listing::{Filter, DEFAULT_PAGE_SIZE},
    BulkAction, MediaType,
};
use serde_json::json;

use super::{
    articles::{apply_list_args, confirmer, select_ids},
    AppContext,
};
use crate::{
    cli::{ListArgs, MediaCommands},
    utils::{category_arg, clip, format_table, format_timestamp, print_json},
};

/// Runs one `media` subcommand.
pub async fn run(ctx: &AppContext, command: MediaCommands) -> Result<()> {
    match command {
        MediaCommands::List {
            list,
            kind,
        } => list_media(ctx, list, kind).await,
        MediaCommands::Upload {
            file,
            category,
        } => {
            let upload = UploadFile::from_path(&file).await?;
            let category = match category {
                Some(raw) => category_arg(&raw, &ctx.categories().await).slug,
                None => UNCATEGORIZED_SLUG.to_string(),
            };
            let mut library = MediaLibrary::new(ctx.api.clone(), None, DEFAULT_PAGE_SIZE);
            let response = library
                .upload(&upload, &category)
                .await
                .with_context(|| format!("failed to upload {}", file.display()))?;
            print_json(&response)
        },
        MediaCommands::UploadInline {
            file,
        } => {
            let upload = UploadFile::from_path(&file).await?;
            let library = MediaLibrary::new(ctx.api.clone(), None, DEFAULT_PAGE_SIZE);
            let url = library
                .upload_inline(&upload)
                .await
                .with_context(|| format!("failed to upload {}", file.display()))?;
            println!("{url}");
            Ok(())
        },
        MediaCommands::Attach {
            media_id,
            file,
            caption,
        } => {
            let upload = UploadFile::from_path(&file).await?;
            let library = MediaLibrary::new(ctx.api.clone(), None, DEFAULT_PAGE_SIZE);
            let url = library
                .attach_with_caption(&media_id, &upload, &caption)
                .await
                .with_context(|| format!("failed to attach {} to {media_id}", file.display()))?;
            print_json(&json!({
                "id": media_id,
                "url": url,
            }))
        },
        MediaCommands::Show {
            id,
        } => {
            let item = ctx
                .api
                .get_media(&id)
                .await
                .with_context(|| format!("failed to load media {id}"))?;
            print_json(&item)
        },
        MediaCommands::SetCategory {
            id,
            category,
        } => {
            let category = category_arg(&category, &ctx.categories().await);
            ctx.api
                .update_media_category(&id, &category.slug)
                .await
                .with_context(|| format!("failed to move {id} to {}", category.slug))?;
            tracing::info!("Moved {id} to {}.", category.name);
            Ok(())
        },
        MediaCommands::Delete {
            ids,
            yes,
        } => {
            let mut list = media_list(ctx.api.clone(), None);
            list.reload().await.context("failed to load media")?;
            if select_ids(&mut list, &ids) == 0 {
                bail!("none of the given ids exist");
            }
            let outcome = list
                .run_bulk(BulkAction::Delete, confirmer(yes).as_ref())
                .await?;
            let summary = outcome.summary(BulkAction::Delete);
            if outcome.has_failures() {
                bail!("{summary}");
            }
            tracing::info!("{summary}");
            Ok(())
        },
    }
}

async fn list_media(ctx: &AppContext, args: ListArgs, kind: Filter<MediaType>) -> Result<()> {
    let canonical = ctx.categories().await;
    // Typed listings use the by-type route; the kind filter then admits everything loaded.
    let server_kind = match &kind {
        Filter::All => None,
        Filter::Only(kind) => Some(*kind),
    };
    let mut list = media_list(ctx.api.clone(), server_kind);
    list.reload().await.context("failed to load media")?;

    let state = list.state_mut();
    state.set_kind(kind);
    apply_list_args(state, &args, &canonical)?;

    let page = list.visible_page(&canonical);
    if args.json {
        return print_json(&json!({
            "page": page.page,
            "totalPages": page.total_pages,
            "totalItems": page.total_items,
            "items": page.items,
        }));
    }

    let rows: Vec<Vec<String>> = page
        .items
        .iter()
        .map(|item| {
            vec![
                item.id.clone(),
                item.media_type.to_string(),
                item.category_slug(&canonical),
                format_timestamp(item.date),
                clip(&item.name),
                item.url.clone(),
            ]
        })
        .collect();
    tracing::info!(
        "Media, page {}/{} ({} matching):\n{}",
        page.page,
        page.total_pages,
        page.total_items,
        format_table(&["ID", "TYPE", "CATEGORY", "DATE", "NAME", "URL"], &rows)
    );
    Ok(())
}
