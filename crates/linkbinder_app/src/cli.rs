use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use linkbinder_core::{ExportFormat, DEFAULT_MAX_CONCURRENCY, DEFAULT_TIMEOUT_MS};

#[derive(Parser)]
#[command(name = "linkbinder", version)]
#[command(about = "Collect article links and bind them into an EPUB")]
#[command(after_help = "EXAMPLES:
    linkbinder export --title \"Rust Notes\" https://blog.test/a https://blog.test/b
    linkbinder export --title \"Saved\" --collection https://blog.test/archive
    linkbinder collection add https://blog.test/archive https://blog.test/a
    linkbinder collection list")]
pub struct Cli {
    /// Path of the collections file.
    #[arg(long, global = true, default_value = ".linkbinder_collections.json")]
    pub collections_file: PathBuf,

    /// Also log to the terminal, not just ./engine.log.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Export articles into an ebook file.
    Export(ExportArgs),
    /// Manage saved link collections.
    Collection {
        #[command(subcommand)]
        command: CollectionCommand,
    },
}

#[derive(Args)]
pub struct ExportArgs {
    /// Article URLs, in chapter order.
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// Export a saved collection (by the page URL it was collected from)
    /// instead of URL arguments.
    #[arg(long, value_name = "PAGE_URL", conflicts_with = "urls")]
    pub collection: Option<String>,

    /// Book title. Defaults to the collection name when exporting a
    /// saved collection.
    #[arg(short, long, required_unless_present = "collection")]
    pub title: Option<String>,

    /// Output file path.
    #[arg(short, long, default_value = "book.epub")]
    pub output: PathBuf,

    #[arg(long, value_enum, default_value_t = FormatArg::Epub)]
    pub format: FormatArg,

    /// Download remote images and embed them as data URIs.
    #[arg(long)]
    pub offline_images: bool,

    /// Keep hyperlinks intact instead of flattening them to plain text.
    #[arg(long)]
    pub keep_hyperlinks: bool,

    /// Per-article extraction timeout in milliseconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Maximum simultaneous extractions.
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Epub,
    Pdf,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Epub => ExportFormat::Epub,
            FormatArg::Pdf => ExportFormat::Pdf,
        }
    }
}

#[derive(Subcommand)]
pub enum CollectionCommand {
    /// Add article URLs to the collection keyed by a page URL.
    Add {
        /// Page the links were collected from; becomes the collection key
        /// with query and fragment stripped.
        #[arg(value_name = "PAGE_URL")]
        page_url: String,
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,
        /// Display name for a newly created collection.
        #[arg(long)]
        name: Option<String>,
    },
    /// List saved collection keys.
    List,
    /// Show the articles of one collection.
    Show {
        #[arg(value_name = "PAGE_URL")]
        page_url: String,
    },
    /// Delete a collection.
    Remove {
        #[arg(value_name = "PAGE_URL")]
        page_url: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn export_parses_urls_and_flags() {
        let cli = Cli::parse_from([
            "linkbinder",
            "export",
            "--title",
            "Book",
            "--offline-images",
            "https://blog.test/a",
            "https://blog.test/b",
        ]);
        let Command::Export(args) = cli.command else {
            panic!("expected export command");
        };
        assert_eq!(args.urls.len(), 2);
        assert_eq!(args.title.as_deref(), Some("Book"));
        assert!(args.offline_images);
        assert!(!args.keep_hyperlinks);
        assert_eq!(args.format, FormatArg::Epub);
    }
}
