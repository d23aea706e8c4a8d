use crate::profile::ScratchProfile;
use chromiumoxide::browser::Browser;
use chromiumoxide::handler::Handler;
use futures::StreamExt;
use tokio::task::JoinHandle;

/// A live browser connection: the driver handle plus the task that drives its
/// CDP message stream.
///
/// The event task must run for the lifetime of the connection or every
/// command on the browser stalls. Launched browsers additionally own their
/// scratch profile directory so it outlives the process.
pub struct BrowserHandle {
    browser: Browser,
    event_task: JoinHandle<()>,
    profile: Option<ScratchProfile>,
}

impl BrowserHandle {
    pub(crate) fn new(browser: Browser, mut handler: Handler, profile: Option<ScratchProfile>) -> Self {
        let event_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    // Some CDP events are not fully parseable; keep draining.
                    tracing::debug!("CDP handler event error (continuing): {e}");
                }
            }
            tracing::debug!("CDP event stream ended");
        });

        Self {
            browser,
            event_task,
            profile,
        }
    }

    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Close the browser and stop event processing. Best-effort: individual
    /// failures are logged, never propagated.
    pub(crate) async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("failed to close browser cleanly: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            tracing::warn!("failed to wait for browser exit: {e}");
        }
        self.event_task.abort();
        // Dropping here removes the scratch profile, after the process exited.
    }

    /// Tear down our side of the connection but leave the browser process
    /// running (the keep-alive path).
    pub(crate) fn detach(self) {
        let BrowserHandle {
            browser,
            event_task,
            profile,
        } = self;

        event_task.abort();
        if let Some(profile) = profile {
            tracing::info!(
                "leaving browser running; profile retained at {}",
                profile.path().display()
            );
            std::mem::forget(profile);
        }
        // Dropping a launched Browser kills its child process, so the handle
        // is deliberately leaked.
        std::mem::forget(browser);
    }
}
