use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "kestrel")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "A browser session manager built on the Chrome DevTools Protocol",
    long_about = "Kestrel opens and manages browser sessions: it attaches to remote debug \
                  endpoints, adopts or spawns a local debuggable instance, or launches an \
                  isolated browser, and can scan the process table for browsers already \
                  exposing a debug port."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a browser session and report its state
    Open {
        /// Engine keyword (chrome, chromium, firefox, webkit) or a path to a
        /// browser executable
        #[arg(default_value = "chromium")]
        engine: String,

        /// Navigate to this URL once the session is open
        #[arg(long)]
        url: Option<String>,

        /// Run the browser without a visible window
        #[arg(long)]
        headless: bool,

        /// Attach to a remote browser over its CDP URL
        #[arg(long, conflicts_with = "wss_url")]
        cdp_url: Option<String>,

        /// Attach to a remote browser over a WebSocket URL
        #[arg(long)]
        wss_url: Option<String>,

        /// Browser executable for the local-instance strategy
        #[arg(long)]
        executable: Option<PathBuf>,

        /// Leave the browser running after the session closes
        #[arg(long)]
        keep_alive: bool,

        /// Restrict page requests to URLs containing this domain (repeatable)
        #[arg(long = "allowed-domain", value_name = "DOMAIN")]
        allowed_domains: Vec<String>,

        /// JSON cookies file to load into the session context
        #[arg(long)]
        cookies: Option<PathBuf>,

        /// Browser window size, e.g. 1280x720
        #[arg(long, value_name = "WIDTHxHEIGHT")]
        window_size: Option<String>,

        /// Write a PNG screenshot of the page to this path before closing
        #[arg(long, requires = "url")]
        screenshot: Option<PathBuf>,
    },

    /// List local browser processes exposing a debug port
    Discover {
        /// Emit the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether a local debug endpoint is responding
    Probe {
        /// Debug port to probe
        #[arg(long, default_value_t = kestrel_browser::DEFAULT_DEBUG_PORT)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Open {
            engine,
            url,
            headless,
            cdp_url,
            wss_url,
            executable,
            keep_alive,
            allowed_domains,
            cookies,
            window_size,
            screenshot,
        } => {
            commands::open::execute(commands::open::OpenArgs {
                engine,
                url,
                headless,
                cdp_url,
                wss_url,
                executable,
                keep_alive,
                allowed_domains,
                cookies,
                window_size,
                screenshot,
            })
            .await
        }
        Commands::Discover { json } => commands::discover::execute(json),
        Commands::Probe { port } => commands::probe::execute(port).await,
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("kestrel=debug,kestrel_core=debug,kestrel_browser=debug")
    } else {
        EnvFilter::new("kestrel=info,kestrel_browser=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}
