//! Command-line arguments.

use std::path::PathBuf;

use blogdesk_client::DraftTarget;
use blogdesk_shared::{
    listing::{Filter, SortDirection, SortField, DEFAULT_PAGE_SIZE},
    ArticleState, BlogType, BulkAction, MediaType,
};
use clap::{Args, Parser, Subcommand};

/// Top-level arguments of the `blogdesk` binary.
#[derive(Parser)]
#[command(name = "blogdesk", version, about = "Blog admin console client")]
pub struct Cli {
    /// API base URL (overrides BLOGDESK_API_BASE).
    #[arg(long, global = true)]
    pub api_base: Option<String>,
    /// Directory for tokens and local drafts (overrides BLOGDESK_DATA_DIR).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    /// Also write daily-rolling log files into this directory.
    #[arg(long, global = true, env = "BLOGDESK_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
    /// Command to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session tokens.
    Login {
        /// Login email.
        #[arg(long, env = "BLOGDESK_EMAIL")]
        email: String,
        /// Login password.
        #[arg(long, env = "BLOGDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session tokens.
    Logout,
    /// GET v1/admins/me
    Whoami,
    /// Article listing, editing and bulk actions.
    Articles {
        /// Subcommand.
        #[command(subcommand)]
        command: ArticleCommands,
    },
    /// Canonical category list.
    Categories {
        /// Subcommand.
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Media library.
    Media {
        /// Subcommand.
        #[command(subcommand)]
        command: MediaCommands,
    },
    /// Local drafts kept in the data directory.
    Drafts {
        /// Subcommand.
        #[command(subcommand)]
        command: DraftCommands,
    },
    /// Convert documents between the editor and API formats.
    Translate {
        /// Subcommand.
        #[command(subcommand)]
        command: TranslateCommands,
    },
}

/// Search, filter, sort and page options shared by list commands.
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Case-insensitive substring match.
    #[arg(long, default_value = "")]
    pub search: String,
    /// Category slug or name, or `all`.
    #[arg(long, default_value = "all")]
    pub category: Filter<String>,
    /// Sort field: `last-updated` or `date-created`.
    #[arg(long, default_value = "last-updated")]
    pub sort: SortField,
    /// Sort direction: `asc` or `desc`.
    #[arg(long, default_value = "desc")]
    pub direction: SortDirection,
    /// 1-based page number; clamped to the last page.
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// One of 10, 20, 50, 100.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub per_page: usize,
    /// Print the page as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// `articles` subcommands.
#[derive(Subcommand)]
pub enum ArticleCommands {
    /// List articles.
    List {
        /// Search, category, sort and paging options.
        #[command(flatten)]
        list: ListArgs,
        /// Blog type (`normal`, `editors-pick`, `hero-section`,
        /// `featured-story`) or `all`.
        #[arg(long = "type", default_value = "all")]
        kind: Filter<BlogType>,
        /// Publication tab: `published`, `draft` or `all`.
        #[arg(long, default_value = "all")]
        tab: Filter<ArticleState>,
    },
    /// Print one article with its decoded body.
    Show {
        /// Article id.
        id: String,
    },
    /// Open an editing session, apply the given changes and save once.
    Edit(EditArgs),
    /// Apply one action to several articles.
    Bulk {
        /// `delete`, `publish` or `draft`.
        action: BulkAction,
        /// Article ids.
        #[arg(required = true)]
        ids: Vec<String>,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

/// Arguments of `articles edit`.
#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Article id, or `new` for a new article.
    pub target: DraftTarget,
    /// New title.
    #[arg(long)]
    pub title: Option<String>,
    /// Author display name.
    #[arg(long)]
    pub author_name: Option<String>,
    /// Author avatar URL.
    #[arg(long)]
    pub author_avatar: Option<String>,
    /// Author affiliation line.
    #[arg(long)]
    pub author_affiliation: Option<String>,
    /// Category slug or name.
    #[arg(long)]
    pub category: Option<String>,
    /// Feature image URL.
    #[arg(long)]
    pub feature_image: Option<String>,
    /// Blog type (`normal`, `editors-pick`, `hero-section`, `featured-story`).
    #[arg(long)]
    pub blog_type: Option<BlogType>,
    /// Editor document (JSON) to use as the body.
    #[arg(long)]
    pub body: Option<PathBuf>,
    /// Publish after applying the changes.
    #[arg(long, conflicts_with = "unpublish")]
    pub publish: bool,
    /// Move back to draft after applying the changes.
    #[arg(long)]
    pub unpublish: bool,
}

/// `categories` subcommands.
#[derive(Subcommand)]
pub enum CategoryCommands {
    /// GET the canonical category list.
    List,
}

/// `media` subcommands.
#[derive(Subcommand)]
pub enum MediaCommands {
    /// List media items.
    List {
        /// Search, category, sort and paging options.
        #[command(flatten)]
        list: ListArgs,
        /// `image`, `video` or `all`.
        #[arg(long = "type", default_value = "all")]
        kind: Filter<MediaType>,
    },
    /// Upload a file into the library.
    Upload {
        /// File to upload.
        file: PathBuf,
        /// Category slug or name.
        #[arg(long)]
        category: Option<String>,
    },
    /// Upload an image for use inside an article body; prints its URL.
    UploadInline {
        /// Image file to upload.
        file: PathBuf,
    },
    /// Attach a captioned file to an existing media entry.
    Attach {
        /// Id of the media entry.
        media_id: String,
        /// File to attach.
        file: PathBuf,
        /// Caption stored with the file.
        #[arg(long)]
        caption: String,
    },
    /// Print one media item.
    Show {
        /// Media id.
        id: String,
    },
    /// Move a media item to another category.
    SetCategory {
        /// Media id.
        id: String,
        /// Category slug or name.
        category: String,
    },
    /// Delete media items.
    Delete {
        /// Media ids.
        #[arg(required = true)]
        ids: Vec<String>,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

/// `drafts` subcommands.
#[derive(Subcommand)]
pub enum DraftCommands {
    /// List local drafts.
    List,
    /// Print one local draft. Accepts `draft_<id>`, an article id or `new`.
    Show {
        /// Draft key, article id or `new`.
        key: String,
    },
    /// Delete one local draft.
    Discard {
        /// Draft key, article id or `new`.
        key: String,
    },
}

/// `translate` subcommands.
#[derive(Subcommand)]
pub enum TranslateCommands {
    /// Editor document to API body.
    ToApi {
        /// Editor document (JSON).
        file: PathBuf,
    },
    /// API body (or a whole article) to editor document.
    FromApi {
        /// API body or whole article (JSON).
        file: PathBuf,
    },
}
