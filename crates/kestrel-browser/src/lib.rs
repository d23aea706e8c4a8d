//! Browser session acquisition and lifecycle.
//!
//! A [`SessionManager`] resolves an engine identifier, picks one of four
//! mutually exclusive connection strategies (remote CDP attach, remote
//! WebSocket attach, local debuggable instance, standard launch), and then
//! owns the contexts, pages, and teardown of the resulting session.
//! [`InstanceDiscovery`] scans the local process table for browsers already
//! exposing a debug port.

pub mod actions;
mod connect;
mod context;
mod discovery;
mod engine;
mod error;
mod handle;
mod probe;
mod profile;
mod session;

pub use connect::ConnectPlan;
pub use context::SessionContext;
pub use discovery::{DiscoveredInstance, InstanceDiscovery, ProcessEntry, ProcessLister};
pub use engine::{EngineKind, EngineSelection, resolve};
pub use error::{Error, Result};
pub use probe::{DEFAULT_DEBUG_PORT, DebugProbe};
pub use session::{SessionManager, SessionSnapshot};

// Callers hold pages and cookies typed by the driver.
pub use chromiumoxide::cdp::browser_protocol::network::{Cookie, CookieParam};
pub use chromiumoxide::page::Page;
