#[cfg(test)]
mod tests {
    use blogdesk_cli::{
        cli::{ArticleCommands, Cli, Commands, DraftCommands, MediaCommands},
        commands::articles::{apply_list_args, form_edits},
    };
    use blogdesk_client::{DraftTarget, FormEdit};
    use blogdesk_shared::{
        listing::{Filter, ListFilterState, SortDirection, SortField},
        ArticleState, BlogType, BulkAction, CategoryRef, MediaType,
    };
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("blogdesk").chain(args.iter().copied())).expect("parse args")
    }

    #[test]
    fn article_list_options_parse_into_filters() {
        let cli = parse(&[
            "articles",
            "list",
            "--search",
            "derby",
            "--category",
            "News",
            "--type",
            "editors-pick",
            "--tab",
            "published",
            "--sort",
            "date-created",
            "--direction",
            "asc",
            "--page",
            "3",
            "--per-page",
            "50",
        ]);
        let Commands::Articles {
            command: ArticleCommands::List {
                list,
                kind,
                tab,
            },
        } = cli.command
        else {
            panic!("expected articles list");
        };
        assert_eq!(list.search, "derby");
        assert_eq!(list.category, Filter::Only("News".to_string()));
        assert_eq!(kind, Filter::Only(BlogType::EditorsPick));
        assert_eq!(tab, Filter::Only(ArticleState::Published));
        assert_eq!(list.sort, SortField::DateCreated);
        assert_eq!(list.direction, SortDirection::Asc);
        assert_eq!(list.page, 3);
        assert_eq!(list.per_page, 50);

        let mut state = ListFilterState::<BlogType>::new();
        apply_list_args(&mut state, &list, &[CategoryRef::new("News", "news")]).expect("apply");
        assert_eq!(state.category(), &Filter::Only("news".to_string()));
        assert_eq!(state.items_per_page(), 50);
        assert_eq!(state.current_page(), 3);
    }

    #[test]
    fn list_defaults_show_everything_newest_first() {
        let cli = parse(&["media", "list"]);
        let Commands::Media {
            command: MediaCommands::List {
                list,
                kind,
            },
        } = cli.command
        else {
            panic!("expected media list");
        };
        assert_eq!(kind, Filter::<MediaType>::All);
        assert_eq!(list.category, Filter::All);
        assert_eq!(list.sort, SortField::LastUpdated);
        assert_eq!(list.direction, SortDirection::Desc);
        assert_eq!(list.per_page, 20);
        assert!(!list.json);
    }

    #[test]
    fn unsupported_page_size_is_rejected_when_applied() {
        let cli = parse(&["articles", "list", "--per-page", "25"]);
        let Commands::Articles {
            command: ArticleCommands::List {
                list, ..
            },
        } = cli.command
        else {
            panic!("expected articles list");
        };
        let mut state = ListFilterState::<BlogType>::new();
        assert!(apply_list_args(&mut state, &list, &[]).is_err());
    }

    #[test]
    fn edit_target_and_fields() {
        let cli = parse(&["articles", "edit", "new", "--title", "Hello", "--category", "news", "--publish"]);
        let Commands::Articles {
            command: ArticleCommands::Edit(args),
        } = cli.command
        else {
            panic!("expected articles edit");
        };
        assert_eq!(args.target, DraftTarget::New);
        assert!(args.publish);

        let edits = form_edits(&args, &[CategoryRef::new("News", "news")]).expect("edits");
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0], FormEdit::Title("Hello".to_string()));
        match &edits[1] {
            FormEdit::Category(Some(category)) => assert_eq!(category.name, "News"),
            other => panic!("unexpected edit {other:?}"),
        }
    }

    #[test]
    fn publish_and_unpublish_conflict() {
        let result = Cli::try_parse_from(["blogdesk", "articles", "edit", "abc", "--publish", "--unpublish"]);
        assert!(result.is_err());
    }

    #[test]
    fn bulk_requires_ids_and_known_action() {
        let cli = parse(&["articles", "bulk", "unpublish", "a1", "a2", "--yes"]);
        let Commands::Articles {
            command: ArticleCommands::Bulk {
                action,
                ids,
                yes,
            },
        } = cli.command
        else {
            panic!("expected articles bulk");
        };
        assert_eq!(action, BulkAction::Draft);
        assert_eq!(ids, vec!["a1".to_string(), "a2".to_string()]);
        assert!(yes);

        assert!(Cli::try_parse_from(["blogdesk", "articles", "bulk", "delete"]).is_err());
        assert!(Cli::try_parse_from(["blogdesk", "articles", "bulk", "archive", "a1"]).is_err());
    }

    #[test]
    fn media_set_category_takes_id_and_category() {
        let cli = parse(&["media", "set-category", "m7", "Match Reports"]);
        let Commands::Media {
            command: MediaCommands::SetCategory {
                id,
                category,
            },
        } = cli.command
        else {
            panic!("expected media set-category");
        };
        assert_eq!(id, "m7");
        assert_eq!(category, "Match Reports");

        assert!(Cli::try_parse_from(["blogdesk", "media", "set-category", "m7"]).is_err());
        assert!(matches!(
            parse(&["media", "show", "m7"]).command,
            Commands::Media {
                command: MediaCommands::Show { ref id },
            } if id == "m7"
        ));
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = parse(&["drafts", "show", "abc", "--data-dir", "/tmp/blogdesk", "--api-base", "http://localhost:8000"]);
        assert_eq!(cli.data_dir.as_deref(), Some(std::path::Path::new("/tmp/blogdesk")));
        assert_eq!(cli.api_base.as_deref(), Some("http://localhost:8000"));
        assert!(matches!(
            cli.command,
            Commands::Drafts {
                command: DraftCommands::Show { ref key },
            } if key == "abc"
        ));
    }
}
