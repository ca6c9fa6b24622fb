use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use reposync::cache::{
    CachePaths, DEFAULT_DEPTH, LogProgress, RepoLock, RepoSync, SyncError, SyncRequest,
    expand_root,
};

#[derive(Parser)]
#[command(
    name = "reposync",
    about = "Keep a local git working tree pinned to a remote ref"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring a cache root to a ref and print the resulting commit
    Sync {
        /// Origin URL the cache root is bound to
        url: String,

        /// Branch, refs/... path, commit id or revision expression
        reference: String,

        /// Cache root (defaults to a directory derived from the URL)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Create the root if missing and fetch the ref from origin
        #[arg(long)]
        download: bool,

        /// History depth to fetch; 0 fetches full history
        #[arg(long, default_value_t = DEFAULT_DEPTH, allow_negative_numbers = true)]
        depth: i32,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the origin and HEAD of a cache root
    Status {
        /// Origin URL, used to derive the default root
        url: String,

        /// Cache root (defaults to a directory derived from the URL)
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sync {
            url,
            reference,
            root,
            download,
            depth,
            json,
        } => cmd_sync(&url, &reference, root, download, depth, json),
        Commands::Status { url, root } => cmd_status(&url, root),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if e.is_not_found() {
            eprintln!();
            eprintln!("Hint: rerun with --download to clone it");
        }
        std::process::exit(1);
    }
}

fn resolve_root(url: &str, root: Option<PathBuf>) -> PathBuf {
    root.unwrap_or_else(|| CachePaths::default().root_for_url(url))
}

fn lock_root(root: &Path) -> Result<RepoLock, SyncError> {
    RepoLock::for_root(root).map_err(|e| match e.kind() {
        io::ErrorKind::TimedOut => SyncError::LockFailed,
        _ => SyncError::Io(e),
    })
}

fn cmd_sync(
    url: &str,
    reference: &str,
    root: Option<PathBuf>,
    download: bool,
    depth: i32,
    json: bool,
) -> Result<(), SyncError> {
    let root = expand_root(&resolve_root(url, root))?;
    let request = SyncRequest::new(&root, url, reference)
        .download(download)
        .depth(depth);
    // Bad arguments are reported before the lock file is created.
    request.validate()?;
    let _lock = lock_root(&root)?;

    let mut progress = LogProgress::default();
    let result = RepoSync::default().sync(&request, &mut progress)?;

    if json {
        let out = serde_json::to_string_pretty(&result).map_err(io::Error::other)?;
        println!("{}", out);
    } else {
        println!("{}", result.commit);
        log::info!(
            "{} at {} ({})",
            root.display(),
            result.commit.short(12),
            result.reference.as_deref().unwrap_or("detached")
        );
    }

    Ok(())
}

fn cmd_status(url: &str, root: Option<PathBuf>) -> Result<(), SyncError> {
    let root = resolve_root(url, root);
    let status = RepoSync::default().status(&root)?;

    println!("Cache root: {}", status.root.display());
    println!(
        "  Origin:    {}",
        status.origin.as_deref().unwrap_or("(none)")
    );
    println!(
        "  HEAD:      {}",
        status
            .head
            .as_ref()
            .map(|c| c.short(12))
            .unwrap_or("(unborn)")
    );
    if status.origin.as_deref().is_some_and(|o| o != url) {
        println!("  Warning:   bound to a different URL than {}", url);
    }

    Ok(())
}
