use crate::connect::{self, ConnectPlan};
use crate::context::SessionContext;
use crate::engine::{self, EngineSelection};
use crate::handle::BrowserHandle;
use crate::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chromiumoxide::cdp::browser_protocol::network::{
    Cookie, CookieParam, EnableParams as NetworkEnableParams, EventRequestWillBeSent,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use kestrel_core::{BrowserConfig, ContextOptions};
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;

/// A navigation counts as settled once no new request has started for this
/// long after the load event.
const NETWORK_QUIET_PERIOD: Duration = Duration::from_millis(500);
/// Upper bound on waiting for the network to go quiet.
const NETWORK_QUIET_BUDGET: Duration = Duration::from_secs(10);

/// Point-in-time view of a session, safe to hand to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// URL of the most recent successful navigation, if any.
    pub url: Option<String>,
    /// Title recorded alongside that navigation.
    pub page_title: Option<String>,
    /// Whether a browser connection is currently held.
    pub open: bool,
    /// Number of pages currently tracked.
    pub open_pages: usize,
}

/// Everything that only exists while a browser connection is held.
struct OpenSession {
    handle: BrowserHandle,
    context: Option<SessionContext>,
    pages: Vec<Page>,
    active: Option<usize>,
}

enum SessionState {
    Closed,
    Open(OpenSession),
}

/// Owns one browser session end to end: engine resolution, connection,
/// context and page lifecycle, and teardown.
///
/// All page-level operations require an open session and an active page;
/// calling them beforehand yields [`Error::State`] rather than panicking.
pub struct SessionManager {
    config: BrowserConfig,
    selection: EngineSelection,
    state: SessionState,
    url: Option<String>,
    page_title: Option<String>,
}

impl SessionManager {
    /// Build a manager for the given engine identifier. The identifier is a
    /// keyword (`chrome`, `chromium`, `firefox`, `webkit`) or a filesystem
    /// path to a browser executable; anything else falls back to Chromium.
    pub fn new(engine: &str, config: BrowserConfig) -> Self {
        let selection = engine::resolve(engine);
        tracing::debug!(
            engine = %selection.kind(),
            executable = selection.is_executable_path(),
            "resolved engine selection"
        );

        Self {
            config,
            selection,
            state: SessionState::Closed,
            url: None,
            page_title: None,
        }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub fn selection(&self) -> &EngineSelection {
        &self.selection
    }

    /// Establish the browser connection, create the default context, and open
    /// and return the initial page.
    ///
    /// Calling this while a session is already open tears the old one down
    /// first; stale state never leaks into the new session.
    pub async fn open_browser(&mut self) -> Result<Page> {
        if matches!(self.state, SessionState::Open(_)) {
            tracing::warn!("open_browser called on an open session; closing the previous one");
            self.close_browser().await?;
        }

        let plan = ConnectPlan::select(&self.config, &self.selection);
        let handle = connect::establish(&plan, &self.config).await?;

        let options = self.config.layered_context_options();
        let context = SessionContext::create(handle.browser(), options, &self.config).await?;

        if let Some(path) = self.config.cookies_file() {
            let cookies = load_cookies_file(path)?;
            if !cookies.is_empty() {
                tracing::info!(count = cookies.len(), "loading cookies from {}", path.display());
                context.set_cookies(handle.browser(), cookies).await?;
            }
        }

        let page = context.new_page(handle.browser()).await?;

        self.state = SessionState::Open(OpenSession {
            handle,
            context: Some(context),
            pages: vec![page.clone()],
            active: Some(0),
        });
        self.url = None;
        self.page_title = None;

        tracing::info!(strategy = plan.strategy(), "browser session open");
        Ok(page)
    }

    /// Tear the session down. On a closed session this is a no-op.
    ///
    /// Best-effort throughout: pages and the context are closed individually
    /// with failures logged, and the connection is released even if they
    /// fail. With keep-alive set the browser process is left running.
    pub async fn close_browser(&mut self) -> Result<()> {
        let SessionState::Open(session) = std::mem::replace(&mut self.state, SessionState::Closed)
        else {
            return Ok(());
        };

        for page in session.pages {
            if let Err(e) = page.close().await {
                tracing::warn!("failed to close page: {e}");
            }
        }

        if let Some(context) = session.context {
            if let Err(e) = context.dispose(session.handle.browser()).await {
                tracing::warn!("failed to dispose context: {e}");
            }
        }

        if self.config.keep_alive() {
            session.handle.detach();
        } else {
            session.handle.shutdown().await;
        }

        self.url = None;
        self.page_title = None;
        tracing::info!("browser session closed");
        Ok(())
    }

    /// Navigate the active page and wait for the network to settle.
    pub async fn navigate(&mut self, url: &str) -> Result<()> {
        let idle_wait = self.config.network_idle_wait();
        let page = self.active_page()?.clone();

        page.goto(url)
            .await
            .map_err(|e| Error::Cdp(format!("navigation to {url} failed: {e}")))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| Error::Cdp(format!("navigation to {url} did not complete: {e}")))?;
        wait_for_network_quiet(&page).await;

        if let Some(wait) = idle_wait {
            tokio::time::sleep(wait).await;
        }

        self.url = page
            .url()
            .await
            .map_err(|e| Error::Cdp(format!("failed to read URL after navigating to {url}: {e}")))?;
        self.page_title = page
            .get_title()
            .await
            .map_err(|e| Error::Cdp(format!("failed to read title after navigating to {url}: {e}")))?;

        tracing::info!(url = self.url.as_deref().unwrap_or(url), "navigation complete");
        Ok(())
    }

    /// Open and return a fresh page in the session context, making it the
    /// active tab.
    ///
    /// On a closed session this opens the browser first; the initial page of
    /// the new session is the requested tab.
    pub async fn open_tab(&mut self) -> Result<Page> {
        if matches!(self.state, SessionState::Closed) {
            return self.open_browser().await;
        }

        let session = self.open_session_mut()?;
        let context = session
            .context
            .as_ref()
            .ok_or(Error::State("session has no browser context"))?;

        let page = context.new_page(session.handle.browser()).await?;
        session.pages.push(page.clone());
        session.active = Some(session.pages.len() - 1);

        tracing::debug!(open_pages = session.pages.len(), "opened tab");
        Ok(page)
    }

    /// Close the given page if the session tracks it; untracked pages are
    /// ignored. When the active tab goes away the last remaining tab becomes
    /// active.
    pub async fn close_tab(&mut self, page: &Page) -> Result<()> {
        let SessionState::Open(session) = &mut self.state else {
            return Ok(());
        };

        let Some(index) = session
            .pages
            .iter()
            .position(|candidate| candidate.target_id() == page.target_id())
        else {
            tracing::debug!("close_tab: page not tracked by this session; ignoring");
            return Ok(());
        };

        // Untrack first so a failed close never leaves a dead page listed.
        let page = session.pages.remove(index);
        session.active = match session.active {
            Some(active) if active == index => session.pages.len().checked_sub(1),
            Some(active) if active > index => Some(active - 1),
            other => other,
        };

        if let Err(e) = page.close().await {
            tracing::warn!("failed to close tab: {e}");
        }

        tracing::debug!(open_pages = session.pages.len(), "closed tab");
        Ok(())
    }

    /// Make the tab at `index` active and bring it to the foreground.
    pub async fn switch_tab(&mut self, index: usize) -> Result<()> {
        let session = self.open_session_mut()?;

        let page = session
            .pages
            .get(index)
            .ok_or(Error::State("no tab at that index"))?
            .clone();
        session.active = Some(index);

        page.bring_to_front()
            .await
            .map_err(|e| Error::Cdp(format!("failed to focus tab {index}: {e}")))?;
        Ok(())
    }

    /// The currently active page.
    pub fn active_page(&self) -> Result<&Page> {
        let SessionState::Open(session) = &self.state else {
            return Err(Error::State("browser session is not open"));
        };
        session
            .active
            .and_then(|index| session.pages.get(index))
            .ok_or(Error::State("session has no active page"))
    }

    /// Every page the session currently tracks.
    pub fn pages(&self) -> &[Page] {
        match &self.state {
            SessionState::Open(session) => &session.pages,
            SessionState::Closed => &[],
        }
    }

    /// PNG screenshot of the active page, base64-encoded.
    pub async fn screenshot(&self) -> Result<String> {
        let page = self.active_page()?;

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let bytes = page
            .screenshot(params)
            .await
            .map_err(|e| Error::Cdp(format!("screenshot failed: {e}")))?;

        Ok(BASE64.encode(bytes))
    }

    /// Cookies currently held by the session context.
    pub async fn get_cookies(&self) -> Result<Vec<Cookie>> {
        let SessionState::Open(session) = &self.state else {
            return Err(Error::State("browser session is not open"));
        };
        let context = session
            .context
            .as_ref()
            .ok_or(Error::State("session has no browser context"))?;
        context.get_cookies(session.handle.browser()).await
    }

    /// Install cookies into the session context.
    pub async fn set_cookies(&self, cookies: Vec<CookieParam>) -> Result<()> {
        let SessionState::Open(session) = &self.state else {
            return Err(Error::State("browser session is not open"));
        };
        let context = session
            .context
            .as_ref()
            .ok_or(Error::State("session has no browser context"))?;
        context.set_cookies(session.handle.browser(), cookies).await
    }

    /// Replace the session context with a fresh one layering `extra` over the
    /// configured options, connecting first if the session is closed.
    ///
    /// The previous context and its pages are torn down best-effort before
    /// the replacement is stored; tabs opened afterwards use the new context.
    pub async fn new_context(&mut self, extra: ContextOptions) -> Result<&SessionContext> {
        if matches!(self.state, SessionState::Closed) {
            let plan = ConnectPlan::select(&self.config, &self.selection);
            let handle = connect::establish(&plan, &self.config).await?;
            self.state = SessionState::Open(OpenSession {
                handle,
                context: None,
                pages: Vec::new(),
                active: None,
            });
        }

        let options = extra.overlay(self.config.layered_context_options());
        let config = self.config.clone();

        let session = self.open_session_mut()?;

        // Disposing a context closes its pages, so stop tracking them first.
        for page in session.pages.drain(..) {
            if let Err(e) = page.close().await {
                tracing::warn!("failed to close page: {e}");
            }
        }
        session.active = None;
        if let Some(old) = session.context.take() {
            if let Err(e) = old.dispose(session.handle.browser()).await {
                tracing::warn!("failed to dispose previous context: {e}");
            }
        }

        let context = SessionContext::create(session.handle.browser(), options, &config).await?;
        Ok(session.context.insert(context))
    }

    /// Snapshot of the session for status reporting.
    pub fn state(&self) -> SessionSnapshot {
        let (open, open_pages) = match &self.state {
            SessionState::Open(session) => (true, session.pages.len()),
            SessionState::Closed => (false, 0),
        };

        SessionSnapshot {
            url: self.url.clone(),
            page_title: self.page_title.clone(),
            open,
            open_pages,
        }
    }

    fn open_session_mut(&mut self) -> Result<&mut OpenSession> {
        match &mut self.state {
            SessionState::Open(session) => Ok(session),
            SessionState::Closed => Err(Error::State("browser session is not open")),
        }
    }
}

/// Wait until no new request has started on `page` for
/// [`NETWORK_QUIET_PERIOD`], bounded by [`NETWORK_QUIET_BUDGET`].
///
/// Best-effort: a page that never goes quiet, or a driver that cannot
/// deliver network events, only costs the budget and is logged.
async fn wait_for_network_quiet(page: &Page) {
    if let Err(e) = page.execute(NetworkEnableParams::default()).await {
        tracing::debug!("network quiet wait unavailable: {e}");
        return;
    }
    let mut requests = match page.event_listener::<EventRequestWillBeSent>().await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::debug!("network quiet wait unavailable: {e}");
            return;
        }
    };

    let settle = async {
        // A quiet-period timeout or the end of the event stream means settled;
        // every new request starts the quiet period over.
        while let Ok(Some(_)) = timeout(NETWORK_QUIET_PERIOD, requests.next()).await {}
    };
    if timeout(NETWORK_QUIET_BUDGET, settle).await.is_err() {
        tracing::debug!("network still busy after {}s", NETWORK_QUIET_BUDGET.as_secs());
    }
}

/// Parse a cookies file: a JSON array of CDP cookie parameters.
fn load_cookies_file(path: &Path) -> Result<Vec<CookieParam>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::Cookies(format!("failed to read cookies file {}: {e}", path.display()))
    })?;

    serde_json::from_str(&raw).map_err(|e| {
        Error::Cookies(format!(
            "cookies file {} is not a JSON array of cookies: {e}",
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn manager() -> SessionManager {
        SessionManager::new("chromium", BrowserConfig::default())
    }

    #[test]
    fn test_new_session_starts_closed() {
        let manager = manager();
        let state = manager.state();

        assert!(!state.open);
        assert_eq!(state.open_pages, 0);
        assert!(state.url.is_none());
        assert!(state.page_title.is_none());
        assert!(manager.pages().is_empty());
    }

    #[test]
    fn test_page_operations_require_open_session() {
        let manager = manager();
        assert!(matches!(
            manager.active_page(),
            Err(Error::State("browser session is not open"))
        ));
    }

    #[tokio::test]
    async fn test_navigate_before_open_is_a_state_error() {
        let mut manager = manager();
        let result = manager.navigate("https://example.com").await;
        assert!(matches!(result, Err(Error::State(_))));
    }

    #[tokio::test]
    async fn test_cookie_operations_require_open_session() {
        let manager = manager();
        assert!(matches!(manager.get_cookies().await, Err(Error::State(_))));
        assert!(matches!(
            manager.set_cookies(Vec::new()).await,
            Err(Error::State(_))
        ));
    }

    #[tokio::test]
    async fn test_close_browser_on_closed_session_is_a_noop() {
        let mut manager = manager();
        manager.close_browser().await.unwrap();
        assert!(!manager.state().open);
    }

    #[tokio::test]
    async fn test_switch_tab_before_open_is_a_state_error() {
        let mut manager = manager();
        assert!(matches!(manager.switch_tab(0).await, Err(Error::State(_))));
    }

    #[test]
    fn test_cookies_file_missing_is_a_cookies_error() {
        let result = load_cookies_file(Path::new("/nonexistent/cookies.json"));
        assert!(matches!(result, Err(Error::Cookies(_))));
    }

    #[test]
    fn test_cookies_file_must_be_an_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"not\": \"an array\"}}").unwrap();

        let result = load_cookies_file(file.path());
        assert!(matches!(result, Err(Error::Cookies(_))));
    }

    #[test]
    fn test_cookies_file_parses_cdp_cookie_params() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "sid", "value": "abc123", "domain": "example.com", "path": "/"}}]"#
        )
        .unwrap();

        let cookies = load_cookies_file(file.path()).unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "sid");
        assert_eq!(cookies[0].value, "abc123");
    }

    #[test]
    fn test_engine_identifier_flows_into_selection() {
        let manager = SessionManager::new("firefox", BrowserConfig::default());
        assert_eq!(manager.selection().kind().as_str(), "firefox");
        assert!(!manager.selection().is_executable_path());
    }
}
