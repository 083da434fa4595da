//! CLI argument definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use chatvault_core::Source;
use chatvault_indexer::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_BATCH};

/// Import, browse and search personal chat exports
#[derive(Parser, Debug)]
#[command(name = "chatvault")]
#[command(version)]
#[command(about = "Import, browse and search personal chat exports")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Custom database path
    #[arg(long, global = true, env = "CHATVAULT_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Directory of reference datasets added to search
    #[arg(long, global = true, env = "CHATVAULT_REFERENCE_DIR")]
    pub reference_dir: Option<PathBuf>,

    /// Output format (auto-detects based on TTY if not specified)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON with indentation
    #[arg(long, short = 'p', global = true)]
    pub pretty: bool,

    /// Disable color output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Get the effective output format
    pub fn effective_format(&self) -> OutputFormat {
        if let Some(f) = self.format {
            return f;
        }
        if atty::is(atty::Stream::Stdout) {
            OutputFormat::Human
        } else {
            OutputFormat::Json
        }
    }

    /// Check if colors should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && atty::is(atty::Stream::Stdout)
    }

    /// Resolved database path
    pub fn db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|home| home.join(".chatvault").join("vault.db"))
                .unwrap_or_else(chatvault_db::default_db_path)
        })
    }

    /// Resolved reference directory, if one exists
    pub fn reference_dir(&self) -> Option<PathBuf> {
        let dir = self.reference_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|home| home.join(".chatvault").join("reference"))
                .unwrap_or_else(chatvault_indexer::default_reference_dir)
        });
        dir.is_dir().then_some(dir)
    }

    /// Tracing filter level for the `-v` count
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

/// Output format for commands
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output
    Json,
    /// Minimal text output (content only)
    Minimal,
}

/// Export kind as accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SourceArg {
    Transcript,
    Thread,
    Markup,
}

impl From<SourceArg> for Source {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Transcript => Source::Transcript,
            SourceArg::Thread => Source::Thread,
            SourceArg::Markup => Source::Markup,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import export files or directories of them
    Import {
        /// Files or directories to import
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Bytes read per chunk
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Records written per transaction
        #[arg(long, default_value_t = DEFAULT_MAX_BATCH)]
        batch_size: usize,
    },

    /// List conversations, most recent first
    List {
        /// Number of conversations to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Only conversations whose id or title matches
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show the messages of a conversation
    View {
        /// Conversation id or title
        conversation: String,

        /// Show last N messages
        #[arg(long)]
        last: Option<usize>,

        /// Show first N messages
        #[arg(long)]
        first: Option<usize>,

        /// Reverse order (newest first)
        #[arg(short, long)]
        reverse: bool,
    },

    /// Latest messages across every conversation, newest first
    Recent {
        /// Number of messages to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Relevance search across stored messages and reference datasets
    Search {
        /// Search query
        query: String,

        /// Limit results
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Plain substring scan over stored messages instead of ranking
        #[arg(long)]
        scan: bool,
    },

    /// Filter stored messages by keyword, sender, kind and date
    Find {
        /// Keyword contained in the content
        #[arg(short, long)]
        keyword: Option<String>,

        /// Sender (aliases of the same person match too)
        #[arg(short, long)]
        sender: Option<String>,

        /// Export kind
        #[arg(long, value_enum)]
        source: Option<SourceArg>,

        /// Earliest date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Latest date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Minimum content length in characters
        #[arg(long)]
        min_length: Option<usize>,

        /// Limit results
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },

    /// Message statistics for the whole store or one conversation
    Stats {
        /// Conversation id or title
        conversation: Option<String>,
    },

    /// Print the transcript context handed to a text collaborator
    Context {
        /// Conversation id or title
        conversation: String,

        /// Number of trailing messages to include
        #[arg(short = 'n', long, default_value = "50")]
        max_messages: usize,
    },

    /// Show store status
    Status,

    /// Clear the store or rebuild its summaries
    Reset {
        /// Recompute summaries from records instead of deleting everything
        #[arg(long)]
        rebuild: bool,

        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}
