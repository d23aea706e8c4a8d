use crate::engine::EngineSelection;
use crate::handle::BrowserHandle;
use crate::probe::{DEFAULT_DEBUG_PORT, DebugProbe};
use crate::profile::ScratchProfile;
use crate::{Error, Result};
use chromiumoxide::browser::{Browser, BrowserConfig as DriverConfig, HeadlessMode};
use chromiumoxide::handler::Handler;
use kestrel_core::{BrowserConfig, RetryPolicy};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::time::timeout;

pub(crate) const ATTACH_TIMEOUT: Duration = Duration::from_secs(20);

/// Baseline flags for a standard launch: keep the browser quiet, stable, and
/// free of automation tells.
const BASELINE_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-background-networking",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-hang-monitor",
    "--disable-prompt-on-repost",
    "--disable-popup-blocking",
    "--metrics-recording-only",
    "--password-store=basic",
    "--use-mock-keychain",
    "--mute-audio",
];

const SECURITY_ARGS: &[&str] = &[
    "--disable-web-security",
    "--disable-features=IsolateOrigins,site-per-process",
    "--ignore-certificate-errors",
    "--no-sandbox",
    "--disable-setuid-sandbox",
];

/// Which of the four mutually-exclusive connection strategies applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectPlan {
    /// Attach to a remote browser over its CDP URL.
    Cdp(String),
    /// Attach to a remote browser over a WebSocket URL.
    Wss(String),
    /// Attach to a local debuggable instance at the default debug port,
    /// spawning the executable first if nothing is listening.
    LocalInstance(PathBuf),
    /// Launch a fresh isolated browser process.
    Launch,
}

impl ConnectPlan {
    /// Evaluate strategy precedence, highest first: configured CDP URL,
    /// configured WebSocket URL, a resolved local executable, standard
    /// launch.
    pub fn select(config: &BrowserConfig, selection: &EngineSelection) -> ConnectPlan {
        if let Some(url) = config.cdp_url() {
            ConnectPlan::Cdp(url.to_string())
        } else if let Some(url) = config.wss_url() {
            ConnectPlan::Wss(url.to_string())
        } else if let Some(path) = selection
            .executable()
            .or_else(|| config.executable().map(PathBuf::as_path))
        {
            ConnectPlan::LocalInstance(path.to_path_buf())
        } else {
            ConnectPlan::Launch
        }
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            ConnectPlan::Cdp(_) => "cdp attach",
            ConnectPlan::Wss(_) => "wss attach",
            ConnectPlan::LocalInstance(_) => "local instance",
            ConnectPlan::Launch => "standard launch",
        }
    }
}

/// Run the chosen strategy to completion, producing a live browser handle.
pub(crate) async fn establish(plan: &ConnectPlan, config: &BrowserConfig) -> Result<BrowserHandle> {
    tracing::info!(strategy = plan.strategy(), "establishing browser connection");

    match plan {
        ConnectPlan::Cdp(url) | ConnectPlan::Wss(url) => {
            let (browser, handler) = attach(url, plan.strategy()).await?;
            Ok(BrowserHandle::new(browser, handler, None))
        }
        ConnectPlan::LocalInstance(executable) => {
            let (browser, handler) = attach_local_instance(executable, config).await?;
            Ok(BrowserHandle::new(browser, handler, None))
        }
        ConnectPlan::Launch => launch(config).await,
    }
}

async fn attach(url: &str, strategy: &'static str) -> Result<(Browser, Handler)> {
    timeout(ATTACH_TIMEOUT, Browser::connect(url))
        .await
        .map_err(|_| {
            Error::Connection(format!(
                "{strategy}: timed out connecting to {url} after {}s",
                ATTACH_TIMEOUT.as_secs()
            ))
        })?
        .map_err(|e| Error::Connection(format!("{strategy}: failed to connect to {url}: {e}")))
}

/// Attach to an already-running local instance, spawning the executable if
/// nothing answers the debug probe.
async fn attach_local_instance(
    executable: &Path,
    config: &BrowserConfig,
) -> Result<(Browser, Handler)> {
    let probe = DebugProbe::new(DEFAULT_DEBUG_PORT)?;
    let attach_url = format!("http://localhost:{DEFAULT_DEBUG_PORT}");

    if probe.is_live().await {
        tracing::info!("attaching to running local instance at {attach_url}");
        return attach(&attach_url, "local instance").await;
    }

    tracing::info!("no local instance responding; spawning {}", executable.display());
    spawn_detached(executable, config.extra_args())?;
    probe.wait_until_live(&RetryPolicy::local_attach()).await;

    // One final attach attempt; this failure is fatal and not retried.
    attach(&attach_url, "local instance").await.map_err(|e| {
        Error::Connection(format!(
            "could not attach to the spawned browser at {attach_url}; \
             close any running instances of {} and retry ({e})",
            executable.display()
        ))
    })
}

/// Spawn the executable with the debug port flag, detached: stdio discarded,
/// child never waited on.
fn spawn_detached(executable: &Path, extra_args: &[String]) -> Result<()> {
    let child = Command::new(executable)
        .arg(format!("--remote-debugging-port={DEFAULT_DEBUG_PORT}"))
        .args(extra_args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            Error::Connection(format!("failed to spawn {}: {e}", executable.display()))
        })?;

    tracing::debug!("spawned browser process pid {}", child.id());
    Ok(())
}

async fn launch(config: &BrowserConfig) -> Result<BrowserHandle> {
    let profile = ScratchProfile::create()?;
    let driver_config = build_driver_config(config, profile.path())?;

    let (browser, handler) = Browser::launch(driver_config)
        .await
        .map_err(|e| Error::Connection(format!("standard launch: failed to launch browser: {e}")))?;

    Ok(BrowserHandle::new(browser, handler, Some(profile)))
}

fn build_driver_config(config: &BrowserConfig, profile_dir: &Path) -> Result<DriverConfig> {
    let mut builder = DriverConfig::builder()
        .request_timeout(Duration::from_secs(30))
        .user_data_dir(profile_dir);

    builder = if config.headless() {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };

    // A configured executable always selects the local-instance plan, so the
    // driver's own browser detection applies here.
    for arg in BASELINE_ARGS {
        builder = builder.arg(*arg);
    }
    if config.disable_security() {
        for arg in SECURITY_ARGS {
            builder = builder.arg(*arg);
        }
    }
    for arg in config.extra_args() {
        builder = builder.arg(arg.as_str());
    }

    if let Some(size) = config.window_size() {
        builder = builder.window_size(size.width, size.height);
    }

    if let Some(proxy) = config.proxy() {
        builder = builder.arg(format!("--proxy-server={}", proxy.server));
        if !proxy.bypass.is_empty() {
            builder = builder.arg(format!("--proxy-bypass-list={}", proxy.bypass.join(";")));
        }
    }

    builder.build().map_err(Error::Configuration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine;

    fn selection_for(identifier: &str) -> EngineSelection {
        engine::resolve(identifier)
    }

    #[test]
    fn test_cdp_url_takes_highest_precedence() {
        let config = BrowserConfig::builder()
            .cdp_url("http://remote:9222")
            .wss_url("ws://remote:9222/session")
            .build();

        let plan = ConnectPlan::select(&config, &selection_for("chromium"));
        assert_eq!(plan, ConnectPlan::Cdp("http://remote:9222".into()));
    }

    #[test]
    fn test_wss_url_beats_local_strategies() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = BrowserConfig::builder()
            .wss_url("ws://remote:9222/session")
            .build();

        let plan = ConnectPlan::select(&config, &selection_for(file.path().to_str().unwrap()));
        assert_eq!(plan, ConnectPlan::Wss("ws://remote:9222/session".into()));
    }

    #[test]
    fn test_executable_selection_yields_local_instance() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = BrowserConfig::default();

        let plan = ConnectPlan::select(&config, &selection_for(file.path().to_str().unwrap()));
        assert_eq!(plan, ConnectPlan::LocalInstance(file.path().to_path_buf()));
    }

    #[test]
    fn test_configured_executable_yields_local_instance() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = BrowserConfig::builder().executable(file.path()).build();

        let plan = ConnectPlan::select(&config, &selection_for("chromium"));
        assert_eq!(plan, ConnectPlan::LocalInstance(file.path().to_path_buf()));
    }

    #[test]
    fn test_no_configuration_falls_back_to_launch() {
        let config = BrowserConfig::default();
        let plan = ConnectPlan::select(&config, &selection_for("firefox"));
        assert_eq!(plan, ConnectPlan::Launch);
    }

    #[test]
    fn test_cdp_attach_never_spawns_even_with_executable() {
        // With a CDP URL configured the local executable must be ignored.
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = BrowserConfig::builder()
            .cdp_url("http://remote:9222")
            .executable(file.path())
            .build();

        let plan = ConnectPlan::select(&config, &selection_for(file.path().to_str().unwrap()));
        assert!(matches!(plan, ConnectPlan::Cdp(_)));
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(ConnectPlan::Launch.strategy(), "standard launch");
        assert_eq!(ConnectPlan::Cdp(String::new()).strategy(), "cdp attach");
        assert_eq!(ConnectPlan::Wss(String::new()).strategy(), "wss attach");
        assert_eq!(
            ConnectPlan::LocalInstance(PathBuf::new()).strategy(),
            "local instance"
        );
    }
}
