use crate::{Error, Result};
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetLocaleOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams as FetchEnableParams, EventRequestPaused,
    FailRequestParams,
};
use chromiumoxide::cdp::browser_protocol::network::{Cookie, CookieParam, ErrorReason};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::storage::{GetCookiesParams, SetCookiesParams};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use kestrel_core::{BrowserConfig, ContextOptions};

/// Style injected into every document when element highlighting is enabled.
const HIGHLIGHT_SCRIPT: &str = r#"
(() => {
  const style = document.createElement('style');
  style.textContent = '*:hover { outline: 2px solid #2563eb !important; outline-offset: 1px; }';
  const attach = () => (document.head || document.documentElement).appendChild(style);
  if (document.readyState === 'loading') {
    document.addEventListener('DOMContentLoaded', attach);
  } else {
    attach();
  }
})();
"#;

/// An isolated browsing profile (cookies, storage) hosting the session's
/// pages.
///
/// Wraps a CDP browser context id together with the resolved per-page
/// overrides; every page created through it gets the same viewport, locale,
/// user agent, request gate, and highlight treatment.
pub struct SessionContext {
    id: BrowserContextId,
    options: ContextOptions,
    allowed_domains: Vec<String>,
    highlight_elements: bool,
}

impl SessionContext {
    pub(crate) async fn create(
        browser: &Browser,
        options: ContextOptions,
        config: &BrowserConfig,
    ) -> Result<Self> {
        let response = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| Error::Cdp(format!("failed to create browser context: {e}")))?;
        let id = response.result.browser_context_id.clone();

        tracing::debug!(context = %id.inner(), "created browser context");

        Ok(Self {
            id,
            options,
            allowed_domains: config.allowed_domains().to_vec(),
            highlight_elements: config.highlight_elements(),
        })
    }

    pub fn id(&self) -> &BrowserContextId {
        &self.id
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// Create a page inside this context and apply the context's overrides
    /// and gates to it.
    pub(crate) async fn new_page(&self, browser: &Browser) -> Result<Page> {
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(self.id.clone())
            .build()
            .map_err(Error::Configuration)?;

        let page = browser
            .new_page(params)
            .await
            .map_err(|e| Error::Cdp(format!("failed to create page: {e}")))?;

        self.apply_overrides(&page).await?;

        if !self.allowed_domains.is_empty() {
            install_request_gate(&page, self.allowed_domains.clone()).await?;
        }
        if self.highlight_elements {
            install_highlight_style(&page).await?;
        }

        Ok(page)
    }

    async fn apply_overrides(&self, page: &Page) -> Result<()> {
        if let Some(viewport) = self.options.viewport {
            let params = SetDeviceMetricsOverrideParams::builder()
                .width(viewport.width as i64)
                .height(viewport.height as i64)
                .device_scale_factor(1.0)
                .mobile(false)
                .build()
                .map_err(Error::Configuration)?;
            page.execute(params)
                .await
                .map_err(|e| Error::Cdp(format!("failed to set viewport: {e}")))?;
        }

        if let Some(locale) = &self.options.locale {
            page.execute(SetLocaleOverrideParams {
                locale: Some(locale.clone()),
            })
            .await
            .map_err(|e| Error::Cdp(format!("failed to set locale: {e}")))?;
        }

        if let Some(user_agent) = &self.options.user_agent {
            page.set_user_agent(user_agent.as_str())
                .await
                .map_err(|e| Error::Cdp(format!("failed to set user agent: {e}")))?;
        }

        Ok(())
    }

    /// Read every cookie in this context's store.
    pub(crate) async fn get_cookies(&self, browser: &Browser) -> Result<Vec<Cookie>> {
        let response = browser
            .execute(GetCookiesParams {
                browser_context_id: Some(self.id.clone()),
            })
            .await
            .map_err(|e| Error::Cdp(format!("failed to read cookies: {e}")))?;
        Ok(response.result.cookies.clone())
    }

    /// Install cookies into this context's store.
    pub(crate) async fn set_cookies(
        &self,
        browser: &Browser,
        cookies: Vec<CookieParam>,
    ) -> Result<()> {
        browser
            .execute(SetCookiesParams {
                cookies,
                browser_context_id: Some(self.id.clone()),
            })
            .await
            .map_err(|e| Error::Cdp(format!("failed to set cookies: {e}")))?;
        Ok(())
    }

    pub(crate) async fn dispose(&self, browser: &Browser) -> Result<()> {
        let params = DisposeBrowserContextParams::builder()
            .browser_context_id(self.id.clone())
            .build()
            .map_err(Error::Configuration)?;
        browser
            .execute(params)
            .await
            .map_err(|e| Error::Cdp(format!("failed to dispose browser context: {e}")))?;
        Ok(())
    }
}

/// Substring match of a request URL against the allowed-domain list. Not an
/// exact-host match: `wikipedia.org` admits `en.wikipedia.org/page`.
pub(crate) fn is_url_allowed(url: &str, allowed_domains: &[String]) -> bool {
    allowed_domains.iter().any(|domain| url.contains(domain.as_str()))
}

/// Intercept every outgoing request on `page`; abort anything whose URL lacks
/// all of the allowed-domain substrings.
async fn install_request_gate(page: &Page, allowed_domains: Vec<String>) -> Result<()> {
    // The listener must exist before interception starts; a request paused
    // with nobody subscribed would never be resolved.
    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(|e| Error::Cdp(format!("failed to listen for paused requests: {e}")))?;

    page.execute(FetchEnableParams::default())
        .await
        .map_err(|e| Error::Cdp(format!("failed to enable request interception: {e}")))?;

    let gate_page = page.clone();
    tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let url = event.request.url.clone();
            let request_id = event.request_id.clone();

            let outcome = if is_url_allowed(&url, &allowed_domains) {
                match ContinueRequestParams::builder().request_id(request_id).build() {
                    Ok(params) => gate_page.execute(params).await.map(|_| ()),
                    Err(e) => {
                        tracing::debug!("request gate: bad continue params: {e}");
                        continue;
                    }
                }
            } else {
                tracing::debug!("request gate: aborting {url}");
                match FailRequestParams::builder()
                    .request_id(request_id)
                    .error_reason(ErrorReason::Aborted)
                    .build()
                {
                    Ok(params) => gate_page.execute(params).await.map(|_| ()),
                    Err(e) => {
                        tracing::debug!("request gate: bad fail params: {e}");
                        continue;
                    }
                }
            };

            if let Err(e) = outcome {
                // The page may already be closing; nothing to recover.
                tracing::debug!("request gate: failed to resolve {url}: {e}");
            }
        }
    });

    Ok(())
}

/// Outline hovered elements on every document loaded in `page`.
async fn install_highlight_style(page: &Page) -> Result<()> {
    let params = AddScriptToEvaluateOnNewDocumentParams::builder()
        .source(HIGHLIGHT_SCRIPT)
        .build()
        .map_err(Error::Configuration)?;
    page.execute(params)
        .await
        .map_err(|e| Error::Cdp(format!("failed to install highlight style: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domains(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_allowed_domain_substring_match() {
        let allowed = domains(&["wikipedia.org"]);

        assert!(is_url_allowed("https://en.wikipedia.org/page", &allowed));
        assert!(is_url_allowed("https://wikipedia.org/", &allowed));
        assert!(!is_url_allowed("https://example.com/", &allowed));
    }

    #[test]
    fn test_any_listed_domain_admits_the_request() {
        let allowed = domains(&["wikipedia.org", "example.com"]);

        assert!(is_url_allowed("https://example.com/page", &allowed));
        assert!(is_url_allowed("https://de.wikipedia.org/", &allowed));
        assert!(!is_url_allowed("https://rust-lang.org/", &allowed));
    }

    #[test]
    fn test_empty_list_blocks_everything() {
        // The gate is only installed when domains are configured, but the
        // matcher itself admits nothing on an empty list.
        assert!(!is_url_allowed("https://example.com/", &[]));
    }
}
