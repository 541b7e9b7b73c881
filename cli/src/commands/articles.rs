//! `articles` commands: listing, editing sessions and bulk actions.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use blogdesk_client::{
    dashboard::{article_list, AssumeYes, Confirm, ListController},
    ArticleApi, Autosave, DraftContext, DraftSession, EditorEvent, FormEdit,
};
use blogdesk_shared::{
    document::normalize_body,
    listing::{Filter, ListFilterState, Listable, SortKey},
    ArticleRecord, ArticleState, BlogType, BulkAction, CategoryRef,
};
use serde_json::json;
use tokio::sync::broadcast;

use super::AppContext;
use crate::{
    cli::{ArticleCommands, EditArgs, ListArgs},
    utils::{category_arg, clip, format_table, format_timestamp, print_json, read_editor_document, StdinConfirm},
};

/// Runs one `articles` subcommand.
pub async fn run(ctx: &AppContext, command: ArticleCommands) -> Result<()> {
    match command {
        ArticleCommands::List {
            list,
            kind,
            tab,
        } => list_articles(ctx, list, kind, tab).await,
        ArticleCommands::Show {
            id,
        } => show(ctx, &id).await,
        ArticleCommands::Edit(args) => edit(ctx, args).await,
        ArticleCommands::Bulk {
            action,
            ids,
            yes,
        } => bulk(ctx, action, &ids, yes).await,
    }
}

/// Applies the shared list options to a filter state. The category filter
/// accepts names as well as slugs.
pub fn apply_list_args<K: Copy + PartialEq>(state: &mut ListFilterState<K>, args: &ListArgs, canonical: &[CategoryRef]) -> Result<()> {
    state.set_search_text(args.search.clone());
    state.set_category(match &args.category {
        Filter::All => Filter::All,
        Filter::Only(raw) => Filter::Only(category_arg(raw, canonical).slug),
    });
    state.set_sort(SortKey {
        field: args.sort,
        direction: args.direction,
    });
    state.set_items_per_page(args.per_page)?;
    state.set_page(args.page);
    Ok(())
}

async fn list_articles(
    ctx: &AppContext,
    args: ListArgs,
    kind: Filter<BlogType>,
    tab: Filter<ArticleState>,
) -> Result<()> {
    let canonical = ctx.categories().await;
    let mut list = article_list(ctx.api.clone());
    list.reload().await.context("failed to load articles")?;

    let state = list.state_mut();
    state.set_kind(kind);
    state.set_tab(tab);
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
        .map(|article| {
            vec![
                article.id.clone(),
                article.state.to_string(),
                article.blog_type.to_string(),
                article.category_slug(&canonical),
                format_timestamp(article.last_updated),
                clip(&article.title),
            ]
        })
        .collect();
    tracing::info!(
        "Articles, page {}/{} ({} matching):\n{}",
        page.page,
        page.total_pages,
        page.total_items,
        format_table(&["ID", "STATE", "TYPE", "CATEGORY", "UPDATED", "TITLE"], &rows)
    );
    Ok(())
}

async fn show(ctx: &AppContext, id: &str) -> Result<()> {
    let article: ArticleRecord = ctx
        .api
        .get_article(id)
        .await
        .with_context(|| format!("failed to load article {id}"))?;
    let body = normalize_body(&article.body);
    let mut value = serde_json::to_value(&article)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("currentPageBody".to_string(), serde_json::to_value(&body)?);
    }
    print_json(&value)
}

/// Field edits requested on the command line, in form order.
pub fn form_edits(args: &EditArgs, canonical: &[CategoryRef]) -> Result<Vec<FormEdit>> {
    let mut edits = Vec::new();
    if let Some(title) = &args.title {
        edits.push(FormEdit::Title(title.clone()));
    }
    if let Some(name) = &args.author_name {
        edits.push(FormEdit::AuthorName(name.clone()));
    }
    if let Some(url) = &args.author_avatar {
        edits.push(FormEdit::AuthorAvatar(url.clone()));
    }
    if let Some(affiliation) = &args.author_affiliation {
        edits.push(FormEdit::AuthorAffiliation(affiliation.clone()));
    }
    if let Some(category) = &args.category {
        edits.push(FormEdit::Category(Some(category_arg(category, canonical))));
    }
    if let Some(url) = &args.feature_image {
        edits.push(FormEdit::FeatureImageUrl(url.clone()));
    }
    if let Some(kind) = args.blog_type {
        edits.push(FormEdit::BlogType(kind));
    }
    if let Some(path) = &args.body {
        edits.push(FormEdit::EditorDocument(read_editor_document(path)?));
    }
    Ok(edits)
}

async fn edit(ctx: &AppContext, args: EditArgs) -> Result<()> {
    let canonical = ctx.categories().await;
    let edits = form_edits(&args, &canonical)?;

    let draft_ctx = DraftContext::new(ctx.api.clone(), ctx.store.clone());
    let mut events = draft_ctx.subscribe();
    let session = DraftSession::open(draft_ctx, args.target.clone(), canonical).await;
    tracing::info!("Editor: {}", session.phase());
    report_events(&mut events);

    let autosave = Autosave::spawn(session, ctx.config.autosave_delay);
    let has_edits = !edits.is_empty();
    for edit in edits {
        autosave.edit(edit).await?;
    }
    let result = if args.publish {
        autosave.publish().await
    } else if args.unpublish {
        autosave.unpublish().await
    } else if has_edits {
        autosave.flush().await
    } else {
        Ok(())
    };
    let status = autosave.status().borrow().clone();
    autosave.close().await;
    report_events(&mut events);

    result.context("save failed; changes are kept in the local draft")?;
    print_json(&json!({
        "id": status.article_id,
        "phase": status.phase,
    }))
}

fn report_events(events: &mut broadcast::Receiver<EditorEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            EditorEvent::RestoredLocalDraft => tracing::info!("Restored local draft."),
            EditorEvent::LoadFailed {
                message,
            } => tracing::warn!("Could not load the article: {message}"),
            EditorEvent::Created {
                id,
            } => tracing::info!("Created article {id}."),
            EditorEvent::RouteChanged(route) => tracing::info!("Editor route is now {route}"),
            EditorEvent::Saved => tracing::info!("Saved."),
            EditorEvent::SaveFailed {
                notice,
                ..
            } => tracing::warn!("{notice}"),
        }
    }
}

/// Selects `ids` in `list`, warning about ids that are not loaded.
pub fn select_ids<T: Listable + Send + Sync>(list: &mut ListController<T>, ids: &[String]) -> usize {
    let mut selected = 0;
    for id in ids {
        if list.state().is_selected(id) {
            continue;
        }
        if list.state_mut().toggle(id) {
            selected += 1;
        } else {
            tracing::warn!("Skipping unknown id {id}");
        }
    }
    selected
}

/// Confirmation source for bulk actions: assume yes, or prompt on stdin.
pub fn confirmer(yes: bool) -> Box<dyn Confirm> {
    if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirm)
    }
}

async fn bulk(ctx: &AppContext, action: BulkAction, ids: &[String], yes: bool) -> Result<()> {
    let api: Arc<dyn ArticleApi> = ctx.api.clone();
    let mut list = article_list(api);
    list.reload().await.context("failed to load articles")?;
    if select_ids(&mut list, ids) == 0 {
        bail!("none of the given ids exist");
    }

    let outcome = list.run_bulk(action, confirmer(yes).as_ref()).await?;
    let summary = outcome.summary(action);
    if outcome.has_failures() {
        bail!("{summary}");
    }
    tracing::info!("{summary}");
    Ok(())
}
