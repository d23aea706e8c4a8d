use anyhow::{Context, Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use console::style;
use kestrel_browser::SessionManager;
use kestrel_core::BrowserConfig;
use std::path::PathBuf;

pub struct OpenArgs {
    pub engine: String,
    pub url: Option<String>,
    pub headless: bool,
    pub cdp_url: Option<String>,
    pub wss_url: Option<String>,
    pub executable: Option<PathBuf>,
    pub keep_alive: bool,
    pub allowed_domains: Vec<String>,
    pub cookies: Option<PathBuf>,
    pub window_size: Option<String>,
    pub screenshot: Option<PathBuf>,
}

pub async fn execute(args: OpenArgs) -> Result<()> {
    let config = build_config(&args)?;
    let mut manager = SessionManager::new(&args.engine, config);

    println!("🌐 Opening browser session ({})...", args.engine);
    manager
        .open_browser()
        .await
        .context("failed to open browser session")?;
    println!("✅ Session open");

    let result = drive_session(&mut manager, &args).await;

    if args.keep_alive {
        println!("📌 Leaving the browser running (--keep-alive)");
    }
    manager
        .close_browser()
        .await
        .context("failed to close browser session")?;
    println!("✅ Session closed");

    result
}

async fn drive_session(manager: &mut SessionManager, args: &OpenArgs) -> Result<()> {
    if let Some(url) = &args.url {
        println!("📍 Navigating to {url}...");
        manager
            .navigate(url)
            .await
            .with_context(|| format!("navigation to {url} failed"))?;
    }

    let state = manager.state();
    println!();
    println!("{}", style("Session state").bold());
    println!("  open pages: {}", state.open_pages);
    if let Some(url) = &state.url {
        println!("  url:        {url}");
    }
    if let Some(title) = &state.page_title {
        println!("  title:      {title}");
    }

    if let Some(path) = &args.screenshot {
        let encoded = manager
            .screenshot()
            .await
            .context("failed to capture screenshot")?;
        let bytes = BASE64
            .decode(encoded)
            .context("screenshot was not valid base64")?;
        std::fs::write(path, bytes)
            .with_context(|| format!("failed to write screenshot to {}", path.display()))?;
        println!("📸 Screenshot written to {}", path.display());
    }

    Ok(())
}

fn build_config(args: &OpenArgs) -> Result<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .headless(args.headless)
        .keep_alive(args.keep_alive);

    if let Some(url) = &args.cdp_url {
        builder = builder.cdp_url(url);
    }
    if let Some(url) = &args.wss_url {
        builder = builder.wss_url(url);
    }
    if let Some(path) = &args.executable {
        builder = builder.executable(path);
    }
    if let Some(path) = &args.cookies {
        builder = builder.cookies_file(path);
    }
    if !args.allowed_domains.is_empty() {
        builder = builder.allowed_domains(args.allowed_domains.clone());
    }
    if let Some(spec) = &args.window_size {
        let (width, height) = parse_window_size(spec)?;
        builder = builder.window_size(width, height);
    }

    Ok(builder.build())
}

/// Parse a `WIDTHxHEIGHT` window-size argument.
fn parse_window_size(spec: &str) -> Result<(u32, u32)> {
    let invalid =
        || anyhow!("invalid window size '{spec}': expected WIDTHxHEIGHT, e.g. 1280x720");

    let (width, height) = spec.split_once('x').ok_or_else(invalid)?;
    let width: u32 = width.parse().map_err(|_| invalid())?;
    let height: u32 = height.parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }

    Ok((width, height))
}
