//! Filtering, sorting, pagination and selection over a loaded collection.
//!
//! Everything here is a pure derivation from [`ListFilterState`] and the
//! loaded items; remote effects of bulk actions live in the client crate.

use std::{
    cmp::Ordering,
    collections::BTreeSet,
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    category::{CategoryRef, UNCATEGORIZED_SLUG},
    models::{ArticleRecord, ArticleState, BlogType, MediaItem, MediaType, Timestamp},
};

/// Page sizes offered to the user.
pub const PAGE_SIZES: [usize; 4] = [10, 20, 50, 100];
/// Page size used until the user picks another.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Errors raised by list state changes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    /// The page size is not one of the allowed values.
    #[error("page size {0} is not one of 10, 20, 50, 100")]
    UnsupportedPageSize(usize),
}

/// One filter dimension: either everything or one value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Filter<T> {
    /// No filtering on this dimension.
    #[default]
    All,
    /// Only items equal to this value.
    Only(T),
}

impl<T: PartialEq> Filter<T> {
    /// Whether `value` passes this filter.
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == value,
        }
    }
}

impl<T: FromStr> FromStr for Filter<T> {
    type Err = T::Err;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            raw.parse().map(Self::Only)
        }
    }
}

/// Field a list is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    /// Last modification time.
    #[default]
    LastUpdated,
    /// Creation time.
    DateCreated,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "lastupdated" | "updated" => Ok(Self::LastUpdated),
            "datecreated" | "created" => Ok(Self::DateCreated),
            other => Err(format!("unknown sort field `{other}` (expected last-updated|date-created)")),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Oldest first.
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort direction `{other}` (expected asc|desc)")),
        }
    }
}

/// Composite sort key. Newest first by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortKey {
    /// Timestamp the list is ordered by.
    pub field: SortField,
    /// Order of the timestamps.
    pub direction: SortDirection,
}

/// Something that can be shown in a filtered list.
pub trait Listable {
    /// Classification matched by the type filter.
    type Kind: Copy + PartialEq;

    /// Stable id used for selection.
    fn id(&self) -> &str;
    /// Texts the search box matches against.
    fn search_fields(&self) -> [&str; 2];
    /// Slug the category filter compares against.
    fn category_slug(&self, canonical: &[CategoryRef]) -> String;
    /// Value the type filter compares against.
    fn kind(&self) -> Self::Kind;
    /// `None` for items that have no publication lifecycle.
    fn publication_state(&self) -> Option<ArticleState>;
    /// Timestamp used when sorting by `field`.
    fn timestamp(&self, field: SortField) -> Option<Timestamp>;
}

impl Listable for ArticleRecord {
    type Kind = BlogType;

    fn id(&self) -> &str {
        &self.id
    }

    fn search_fields(&self) -> [&str; 2] {
        [&self.title, &self.id]
    }

    fn category_slug(&self, _canonical: &[CategoryRef]) -> String {
        self.category
            .as_ref()
            .map(|category| category.slug.clone())
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| UNCATEGORIZED_SLUG.to_string())
    }

    fn kind(&self) -> BlogType {
        self.blog_type
    }

    fn publication_state(&self) -> Option<ArticleState> {
        Some(self.state)
    }

    fn timestamp(&self, field: SortField) -> Option<Timestamp> {
        match field {
            SortField::LastUpdated => self.last_updated,
            SortField::DateCreated => self.date_created,
        }
    }
}

impl Listable for MediaItem {
    type Kind = MediaType;

    fn id(&self) -> &str {
        &self.id
    }

    fn search_fields(&self) -> [&str; 2] {
        [&self.name, &self.url]
    }

    fn category_slug(&self, canonical: &[CategoryRef]) -> String {
        MediaItem::category_slug(self, canonical)
    }

    fn kind(&self) -> MediaType {
        self.media_type
    }

    fn publication_state(&self) -> Option<ArticleState> {
        None
    }

    fn timestamp(&self, _field: SortField) -> Option<Timestamp> {
        self.date
    }
}

/// Case-insensitive substring match over the item's search fields.
pub fn matches_search<T: Listable>(item: &T, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty()
        || item
            .search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
}

/// Category filter; names are resolved through `canonical`.
pub fn matches_category<T: Listable>(item: &T, filter: &Filter<String>, canonical: &[CategoryRef]) -> bool {
    match filter {
        Filter::All => true,
        Filter::Only(slug) => item.category_slug(canonical) == *slug,
    }
}

/// Type filter.
pub fn matches_kind<T: Listable>(item: &T, filter: &Filter<T::Kind>) -> bool {
    filter.admits(&item.kind())
}

/// Publication tab; items without a lifecycle pass only `All`.
pub fn matches_tab<T: Listable>(item: &T, filter: &Filter<ArticleState>) -> bool {
    match filter {
        Filter::All => true,
        Filter::Only(state) => item.publication_state() == Some(*state),
    }
}

fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.max(1).min(total_pages)
}

fn calculate_total_pages(len: usize, per_page: usize) -> usize {
    if len == 0 {
        1
    } else {
        let numerator = len.saturating_add(per_page - 1);
        usize::max(numerator / per_page, 1)
    }
}

/// The slice of items to display plus paging totals.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView<'a, T> {
    /// Items on this page, in display order.
    pub items: Vec<&'a T>,
    /// 1-based page actually shown, after clamping.
    pub page: usize,
    /// Page count, at least 1.
    pub total_pages: usize,
    /// Items matching the filters across all pages.
    pub total_items: usize,
}

impl<T: Listable> PageView<'_, T> {
    /// Ids of the items on this page.
    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|item| item.id().to_string()).collect()
    }
}

/// Filter, sort, page and selection state of one list view.
#[derive(Debug, Clone, PartialEq)]
pub struct ListFilterState<K> {
    search_text: String,
    category: Filter<String>,
    kind: Filter<K>,
    tab: Filter<ArticleState>,
    sort: SortKey,
    current_page: usize,
    items_per_page: usize,
    selected: BTreeSet<String>,
    known: BTreeSet<String>,
}

impl<K> Default for ListFilterState<K> {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            category: Filter::All,
            kind: Filter::All,
            tab: Filter::All,
            sort: SortKey::default(),
            current_page: 1,
            items_per_page: DEFAULT_PAGE_SIZE,
            selected: BTreeSet::new(),
            known: BTreeSet::new(),
        }
    }
}

impl<K: Copy + PartialEq> ListFilterState<K> {
    /// Defaults: no filters, newest first, page 1 of 20 items.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current search text.
    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    /// Current category filter.
    pub fn category(&self) -> &Filter<String> {
        &self.category
    }

    /// Current type filter.
    pub fn kind(&self) -> &Filter<K> {
        &self.kind
    }

    /// Current publication tab.
    pub fn tab(&self) -> &Filter<ArticleState> {
        &self.tab
    }

    /// Current sort key.
    pub fn sort(&self) -> SortKey {
        self.sort
    }

    /// Requested 1-based page.
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Items per page.
    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    /// Sets the search text and goes back to page 1.
    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
        self.current_page = 1;
    }

    /// Sets the category filter and goes back to page 1.
    pub fn set_category(&mut self, category: Filter<String>) {
        self.category = category;
        self.current_page = 1;
    }

    /// Sets the type filter and goes back to page 1.
    pub fn set_kind(&mut self, kind: Filter<K>) {
        self.kind = kind;
        self.current_page = 1;
    }

    /// Sets the publication tab and goes back to page 1.
    pub fn set_tab(&mut self, tab: Filter<ArticleState>) {
        self.tab = tab;
        self.current_page = 1;
    }

    /// Sets the sort key and goes back to page 1.
    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
        self.current_page = 1;
    }

    /// Sets the page size and goes back to page 1.
    pub fn set_items_per_page(&mut self, per_page: usize) -> Result<(), ListingError> {
        if !PAGE_SIZES.contains(&per_page) {
            return Err(ListingError::UnsupportedPageSize(per_page));
        }
        self.items_per_page = per_page;
        self.current_page = 1;
        Ok(())
    }

    /// Moves to `page`; out-of-range values are clamped when the page is
    /// derived.
    pub fn set_page(&mut self, page: usize) {
        self.current_page = page.max(1);
    }

    fn admits<T: Listable<Kind = K>>(&self, item: &T, canonical: &[CategoryRef]) -> bool {
        matches_search(item, &self.search_text)
            && matches_category(item, &self.category, canonical)
            && matches_kind(item, &self.kind)
            && matches_tab(item, &self.tab)
    }

    /// All items passing every filter, sorted.
    pub fn filtered<'a, T: Listable<Kind = K>>(&self, items: &'a [T], canonical: &[CategoryRef]) -> Vec<&'a T> {
        let mut matching: Vec<&T> = items.iter().filter(|item| self.admits(*item, canonical)).collect();
        let SortKey {
            field,
            direction,
        } = self.sort;
        // 缺失时间戳的条目始终排在最后
        matching.sort_by(|a, b| match (a.timestamp(field), b.timestamp(field)) {
            (Some(a), Some(b)) => match direction {
                SortDirection::Asc => a.cmp(&b),
                SortDirection::Desc => b.cmp(&a),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        matching
    }

    /// The page the user should see.
    pub fn visible_page<'a, T: Listable<Kind = K>>(&self, items: &'a [T], canonical: &[CategoryRef]) -> PageView<'a, T> {
        let matching = self.filtered(items, canonical);
        let total_items = matching.len();
        let total_pages = calculate_total_pages(total_items, self.items_per_page);
        let page = clamp_page(self.current_page, total_pages);
        let items = matching
            .into_iter()
            .skip((page - 1) * self.items_per_page)
            .take(self.items_per_page)
            .collect();
        PageView {
            items,
            page,
            total_pages,
            total_items,
        }
    }

    /// Records ids of a freshly loaded collection and drops selected ids
    /// that are no longer present.
    pub fn retain_loaded<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        self.known = ids.into_iter().map(str::to_string).collect();
        let known = &self.known;
        self.selected.retain(|id| known.contains(id));
    }

    /// Selected ids.
    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    /// Whether `id` is selected.
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Flips one id. Ids that were never loaded are ignored.
    pub fn toggle(&mut self, id: &str) -> bool {
        if !self.known.contains(id) {
            return false;
        }
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
        true
    }

    /// Select-all over the visible page only: deselects the page when all of
    /// it is selected, otherwise selects the rest of it.
    pub fn toggle_select_all(&mut self, visible: &[String]) {
        let visible: Vec<&String> = visible.iter().filter(|id| self.known.contains(*id)).collect();
        if visible.is_empty() {
            return;
        }
        if visible.iter().all(|id| self.selected.contains(*id)) {
            for id in visible {
                self.selected.remove(id);
            }
        } else {
            self.selected.extend(visible.into_iter().cloned());
        }
    }

    /// Deselects everything.
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }
}

/// State transition applied to every selected item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkAction {
    /// Delete the items.
    Delete,
    /// Publish the items.
    Publish,
    /// Move the items back to draft.
    Draft,
}

impl BulkAction {
    /// Target state of a publication change; `None` for deletes.
    pub fn target_state(self) -> Option<ArticleState> {
        match self {
            Self::Delete => None,
            Self::Publish => Some(ArticleState::Published),
            Self::Draft => Some(ArticleState::Draft),
        }
    }

    /// Text of the confirmation prompt shown before running the action.
    pub fn confirmation(self, count: usize) -> String {
        let noun = if count == 1 { "item" } else { "items" };
        match self {
            Self::Delete => {
                format!("Delete {count} {noun}? This action cannot be undone.")
            },
            Self::Publish => format!("Publish {count} {noun}?"),
            Self::Draft => format!("Move {count} {noun} back to draft?"),
        }
    }
}

impl FromStr for BulkAction {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "delete" => Ok(Self::Delete),
            "publish" => Ok(Self::Publish),
            "draft" | "unpublish" => Ok(Self::Draft),
            other => Err(format!("unknown bulk action `{other}` (expected delete|publish|draft)")),
        }
    }
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Delete => "delete",
            Self::Publish => "publish",
            Self::Draft => "draft",
        })
    }
}
