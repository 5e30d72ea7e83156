//! `folio`: serve a local directory as a browsable, editable documentation site.

mod html;
mod server;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser};
use folio_core::{app_data_dir, load_config, scan_tree, set_default_root, Indexer};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "folio", version)]
#[command(about = "Folio: browse, edit and search a directory of markdown documents")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Args)]
struct ServeArgs {
    /// Directory to serve (defaults to the configured root, then the current directory).
    #[arg(value_name = "ROOT")]
    root: Option<PathBuf>,
    /// Port number to listen on.
    #[arg(short, long)]
    port: Option<u16>,
    /// Host address to bind to.
    #[arg(short = 'H', long)]
    host: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Index a directory and serve it over HTTP (the default).
    Serve(ServeArgs),
    /// Index a directory and list what was found.
    Scan {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Index a directory and print ranked matches for a query.
    Search {
        #[arg(value_name = "PATH")]
        path: PathBuf,
        query: String,
    },
    /// Show where folio stores its config.
    DataDir,
    /// Remember a directory as the default root.
    SetRoot {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve(cli.serve)) {
        Commands::Serve(args) => serve(args).await,
        Commands::Scan { path } => {
            let index = scan_tree(&path)?;
            println!("Indexed {} file(s) under {}", index.len(), path.display());
            for e in index.sorted() {
                println!("  {:<12} {}  {}", e.kind.as_str(), e.route, e.title);
            }
            Ok(())
        }
        Commands::Search { path, query } => {
            let indexer = Indexer::new(path.canonicalize().context("cannot resolve root")?);
            indexer.index_files().await?;
            let hits = indexer.search(&query);
            println!("{} match(es) for \"{}\"", hits.len(), query);
            for h in hits {
                let preview: String = h.snippet.text.split_whitespace().collect::<Vec<_>>().join(" ");
                let preview = if preview.chars().count() > 60 {
                    format!("{}...", preview.chars().take(60).collect::<String>())
                } else {
                    preview
                };
                println!("  {:>4}  {}  {}", h.score, h.route, preview);
            }
            Ok(())
        }
        Commands::DataDir => {
            match app_data_dir() {
                Some(p) => println!("{}", p.display()),
                None => eprintln!("Could not determine app data directory."),
            }
            Ok(())
        }
        Commands::SetRoot { path } => {
            let root = set_default_root(&path)?;
            println!("Default root set to {}", root.display());
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let settings = load_config().settings(args.root, args.host, args.port);
    let root = settings
        .root
        .canonicalize()
        .with_context(|| format!("cannot serve {}", settings.root.display()))?;

    // Requests are only accepted once the whole tree is indexed.
    let indexer = Indexer::new(&root);
    indexer.index_files().await?;

    let app = server::router(server::AppState::new(indexer));
    let listener = TcpListener::bind((settings.host.as_str(), settings.port))
        .await
        .with_context(|| format!("cannot bind {}:{}", settings.host, settings.port))?;
    tracing::info!(
        "folio {} serving {} at http://{}:{} (press CTRL+C to exit)",
        env!("CARGO_PKG_VERSION"),
        root.display(),
        settings.host,
        settings.port
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
