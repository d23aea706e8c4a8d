use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Target window dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl WindowSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Proxy settings forwarded to the browser process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    /// Proxy server URL, e.g. `http://proxy.example:3128`.
    pub server: String,
    /// Hosts that bypass the proxy.
    #[serde(default)]
    pub bypass: Vec<String>,
}

/// Per-context overrides applied to every page created in a context.
///
/// Fields left as `None` fall back to values computed from the session
/// configuration; explicitly set fields win over all computed defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextOptions {
    pub viewport: Option<WindowSize>,
    pub locale: Option<String>,
    pub user_agent: Option<String>,
}

impl ContextOptions {
    /// Overlay `self` on top of `base`: set fields win, unset fields inherit.
    pub fn overlay(&self, base: ContextOptions) -> ContextOptions {
        ContextOptions {
            viewport: self.viewport.or(base.viewport),
            locale: self.locale.clone().or(base.locale),
            user_agent: self.user_agent.clone().or(base.user_agent),
        }
    }
}

/// Immutable session configuration.
///
/// Built once via [`BrowserConfig::builder`]; defaults are merged with caller
/// overrides at construction time and never change afterwards.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    cookies_file: Option<PathBuf>,
    network_idle_wait: Option<Duration>,
    window_size: Option<WindowSize>,
    locale: Option<String>,
    user_agent: Option<String>,
    highlight_elements: bool,
    viewport_expansion: u32,
    allowed_domains: Vec<String>,
    headless: bool,
    disable_security: bool,
    extra_args: Vec<String>,
    executable: Option<PathBuf>,
    wss_url: Option<String>,
    cdp_url: Option<String>,
    proxy: Option<ProxySettings>,
    extra_context_options: ContextOptions,
    keep_alive: bool,
}

impl BrowserConfig {
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::default()
    }

    pub fn cookies_file(&self) -> Option<&PathBuf> {
        self.cookies_file.as_ref()
    }

    /// Extra settle time applied after a navigation reports complete.
    pub fn network_idle_wait(&self) -> Option<Duration> {
        self.network_idle_wait
    }

    pub fn window_size(&self) -> Option<WindowSize> {
        self.window_size
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn highlight_elements(&self) -> bool {
        self.highlight_elements
    }

    pub fn viewport_expansion(&self) -> u32 {
        self.viewport_expansion
    }

    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }

    pub fn headless(&self) -> bool {
        self.headless
    }

    pub fn disable_security(&self) -> bool {
        self.disable_security
    }

    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }

    pub fn executable(&self) -> Option<&PathBuf> {
        self.executable.as_ref()
    }

    pub fn wss_url(&self) -> Option<&str> {
        self.wss_url.as_deref()
    }

    pub fn cdp_url(&self) -> Option<&str> {
        self.cdp_url.as_deref()
    }

    pub fn proxy(&self) -> Option<&ProxySettings> {
        self.proxy.as_ref()
    }

    pub fn extra_context_options(&self) -> &ContextOptions {
        &self.extra_context_options
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Resolve the effective context options for this configuration.
    ///
    /// Layering, lowest priority first: computed viewport (window size plus
    /// viewport expansion on each axis, only when a window size is set), then
    /// configured locale and user agent, then caller-supplied extras.
    pub fn layered_context_options(&self) -> ContextOptions {
        let computed = ContextOptions {
            viewport: self.window_size.map(|size| WindowSize {
                width: size.width + self.viewport_expansion,
                height: size.height + self.viewport_expansion,
            }),
            locale: self.locale.clone(),
            user_agent: self.user_agent.clone(),
        };
        self.extra_context_options.overlay(computed)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfigBuilder::default().build()
    }
}

/// By-value builder for [`BrowserConfig`].
#[derive(Debug, Clone)]
pub struct BrowserConfigBuilder {
    config: BrowserConfig,
}

impl Default for BrowserConfigBuilder {
    fn default() -> Self {
        Self {
            config: BrowserConfig {
                cookies_file: None,
                network_idle_wait: None,
                window_size: None,
                locale: None,
                user_agent: None,
                highlight_elements: false,
                viewport_expansion: 0,
                allowed_domains: Vec::new(),
                headless: false,
                disable_security: true,
                extra_args: Vec::new(),
                executable: None,
                wss_url: None,
                cdp_url: None,
                proxy: None,
                extra_context_options: ContextOptions::default(),
                keep_alive: false,
            },
        }
    }
}

impl BrowserConfigBuilder {
    pub fn cookies_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cookies_file = Some(path.into());
        self
    }

    pub fn network_idle_wait(mut self, wait: Duration) -> Self {
        self.config.network_idle_wait = Some(wait);
        self
    }

    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.config.window_size = Some(WindowSize::new(width, height));
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.config.locale = Some(locale.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    pub fn highlight_elements(mut self, enabled: bool) -> Self {
        self.config.highlight_elements = enabled;
        self
    }

    pub fn viewport_expansion(mut self, pixels: u32) -> Self {
        self.config.viewport_expansion = pixels;
        self
    }

    pub fn allowed_domains(mut self, domains: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.allowed_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn disable_security(mut self, disable: bool) -> Self {
        self.config.disable_security = disable;
        self
    }

    pub fn extra_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.executable = Some(path.into());
        self
    }

    pub fn wss_url(mut self, url: impl Into<String>) -> Self {
        self.config.wss_url = Some(url.into());
        self
    }

    pub fn cdp_url(mut self, url: impl Into<String>) -> Self {
        self.config.cdp_url = Some(url.into());
        self
    }

    pub fn proxy(mut self, proxy: ProxySettings) -> Self {
        self.config.proxy = Some(proxy);
        self
    }

    pub fn extra_context_options(mut self, options: ContextOptions) -> Self {
        self.config.extra_context_options = options;
        self
    }

    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.config.keep_alive = keep_alive;
        self
    }

    pub fn build(self) -> BrowserConfig {
        self.config
    }
}
