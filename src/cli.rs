use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "dokang",
    version,
    about = "A lightweight search engine for HTML documents"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Index location (defaults to <data-dir>/index)
    #[arg(long, global = true)]
    pub index: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an empty index
    Init(InitArgs),
    /// Manage document sets
    Docset {
        #[command(subcommand)]
        action: DocsetAction,
    },
    /// Harvest document sets and replace their entries in the index
    Index(IndexArgs),
    /// Search the index
    Search(SearchArgs),
    /// Show index and document set statistics
    Status(StatusArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Init --

#[derive(Debug, Parser)]
pub struct InitArgs {
    /// Delete the index if it already exists
    #[arg(long)]
    pub force: bool,
}

// -- Document set subcommands --

#[derive(Debug, Subcommand)]
pub enum DocsetAction {
    /// Register a directory of HTML files as a document set
    Add {
        /// Root directory of the set
        path: PathBuf,
        /// Identifier of the set
        #[arg(long)]
        name: String,
        /// Glob of files to leave out, relative to the root (repeatable)
        #[arg(long = "ignore", value_name = "GLOB")]
        ignore: Vec<String>,
        /// CSS selector for the searchable region of each page
        #[arg(long, value_name = "CSS")]
        selector: Option<String>,
    },
    /// Unregister a document set and drop its entries from the index
    Remove {
        /// Identifier of the set
        name: String,
    },
    /// List registered document sets
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

// -- Index --

#[derive(Debug, Parser)]
pub struct IndexArgs {
    /// Only index the given document set
    #[arg(long, value_name = "DOC_SET_ID")]
    pub docset: Option<String>,
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query
    pub query: String,

    /// Maximum number of results (all matches when omitted)
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Search only within this document set
    #[arg(long, value_name = "DOC_SET_ID")]
    pub docset: Option<String>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "dokang",
            &mut std::io::stdout(),
        );
    }
}
