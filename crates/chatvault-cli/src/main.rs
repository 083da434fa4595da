//! chatvault - CLI for importing, browsing and searching chat exports

mod cli;
mod commands;
mod output;

use anyhow::{Context, Result};
use chatvault_db::VaultDb;
use clap::Parser;

use cli::{Cli, Command};
use commands::find::FindArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if !cli.use_color() {
        colored::control::set_override(false);
    }

    let db_path = cli.db_path();
    let mut db = VaultDb::open_or_create(&db_path)
        .with_context(|| format!("Failed to open vault at {}", db_path.display()))?;

    let result = match &cli.command {
        Command::Import {
            paths,
            chunk_size,
            batch_size,
        } => commands::import::run(&cli, &mut db, paths, *chunk_size, *batch_size).await,

        Command::List { limit, search } => {
            commands::list::run(&cli, &db, *limit, search.as_deref())
        }

        Command::View {
            conversation,
            last,
            first,
            reverse,
        } => commands::view::run(&cli, &db, conversation, *last, *first, *reverse),

        Command::Recent { limit } => commands::recent::run(&cli, &db, *limit),

        Command::Search { query, limit, scan } => {
            commands::search::run(&cli, &db, query, *limit, *scan)
        }

        Command::Find {
            keyword,
            sender,
            source,
            from,
            to,
            min_length,
            limit,
        } => {
            let args = FindArgs {
                keyword: keyword.as_deref(),
                sender: sender.as_deref(),
                source: source.map(Into::into),
                from: from.as_deref(),
                to: to.as_deref(),
                min_length: *min_length,
            };
            commands::find::run(&cli, &db, &args, *limit)
        }

        Command::Stats { conversation } => {
            commands::stats::run(&cli, &db, conversation.as_deref())
        }

        Command::Context {
            conversation,
            max_messages,
        } => commands::context::run(&cli, &db, conversation, *max_messages),

        Command::Status => commands::status::run(&cli, &db),

        Command::Reset { rebuild, yes } => commands::reset::run(&cli, &mut db, *rebuild, *yes),
    };

    db.close().context("Failed to close vault")?;
    result
}
