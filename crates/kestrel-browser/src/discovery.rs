use crate::Result;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;

lazy_static! {
    // Leading quoted-or-bare executable token of a command line.
    static ref EXECUTABLE_TOKEN: Regex = Regex::new(r#"^(?:"([^"]+)"|(\S+))"#).unwrap();
    static ref DEBUG_PORT_FLAG: Regex = Regex::new(r"--remote-debugging-port=(\d+)").unwrap();
}

/// A process as reported by the OS: name plus full command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub name: String,
    pub command_line: String,
}

/// Supplies the process table to [`InstanceDiscovery`]. The default
/// implementation shells out to `ps`; tests substitute a fixed list.
pub trait ProcessLister {
    fn processes(&self) -> Result<Vec<ProcessEntry>>;
}

/// Default [`ProcessLister`] backed by the system `ps` command.
#[derive(Debug, Default)]
pub struct PsLister;

impl ProcessLister for PsLister {
    #[cfg(unix)]
    fn processes(&self) -> Result<Vec<ProcessEntry>> {
        use crate::Error;
        use std::process::Command;

        let output = Command::new("ps")
            .args(["-eo", "args="])
            .output()
            .map_err(|e| Error::Discovery(format!("failed to run ps: {e}")))?;

        if !output.status.success() {
            return Err(Error::Discovery(format!(
                "ps exited with status {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let entries = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| ProcessEntry {
                name: process_name_of(line),
                command_line: line.to_string(),
            })
            .collect();

        Ok(entries)
    }

    #[cfg(not(unix))]
    fn processes(&self) -> Result<Vec<ProcessEntry>> {
        tracing::warn!("process discovery is only implemented for unix platforms");
        Ok(Vec::new())
    }
}

/// Derive a process name from a command line's leading executable token.
#[cfg_attr(not(unix), allow(dead_code))]
fn process_name_of(command_line: &str) -> String {
    parse_executable(command_line)
        .and_then(|path| {
            PathBuf::from(path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_default()
}

/// A running browser process exposing a remote-debug port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredInstance {
    pub executable_path: PathBuf,
    pub debug_port: u16,
}

/// Finds already-running debuggable browser processes.
pub struct InstanceDiscovery<L: ProcessLister = PsLister> {
    lister: L,
}

impl InstanceDiscovery<PsLister> {
    pub fn new() -> Self {
        Self { lister: PsLister }
    }
}

impl Default for InstanceDiscovery<PsLister> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ProcessLister> InstanceDiscovery<L> {
    pub fn with_lister(lister: L) -> Self {
        Self { lister }
    }

    /// List browser processes that expose a `--remote-debugging-port`.
    ///
    /// Candidates without a command line or without the port flag are
    /// silently skipped.
    pub fn instances(&self) -> Result<Vec<DiscoveredInstance>> {
        let mut found = Vec::new();

        for entry in self.lister.processes()? {
            if !is_browser_process(&entry.name) {
                continue;
            }
            if entry.command_line.is_empty() {
                continue;
            }
            let Some(debug_port) = parse_debug_port(&entry.command_line) else {
                continue;
            };
            let Some(executable) = parse_executable(&entry.command_line) else {
                continue;
            };

            found.push(DiscoveredInstance {
                executable_path: PathBuf::from(executable),
                debug_port,
            });
        }

        tracing::debug!("discovered {} debuggable browser instance(s)", found.len());
        Ok(found)
    }
}

fn is_browser_process(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("chrome") || name.contains("chromium") || name.contains("firefox")
}

/// Extract the `--remote-debugging-port=<digits>` value from a command line.
pub(crate) fn parse_debug_port(command_line: &str) -> Option<u16> {
    DEBUG_PORT_FLAG
        .captures(command_line)
        .and_then(|caps| caps.get(1))
        .and_then(|port| port.as_str().parse().ok())
}

/// Extract the leading executable token, honoring a double-quoted first token
/// so paths containing spaces survive.
pub(crate) fn parse_executable(command_line: &str) -> Option<&str> {
    let caps = EXECUTABLE_TOKEN.captures(command_line)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLister(Vec<ProcessEntry>);

    impl ProcessLister for FixedLister {
        fn processes(&self) -> Result<Vec<ProcessEntry>> {
            Ok(self.0.clone())
        }
    }

    fn entry(name: &str, command_line: &str) -> ProcessEntry {
        ProcessEntry {
            name: name.to_string(),
            command_line: command_line.to_string(),
        }
    }

    #[test]
    fn test_parse_debug_port() {
        assert_eq!(
            parse_debug_port("/usr/bin/chromium --remote-debugging-port=9222 --headless"),
            Some(9222)
        );
        assert_eq!(
            parse_debug_port("/usr/bin/chromium --remote-debugging-port=13337"),
            Some(13337)
        );
        assert_eq!(parse_debug_port("/usr/bin/chromium --headless"), None);
    }

    #[test]
    fn test_parse_executable_bare_token() {
        assert_eq!(
            parse_executable("/usr/bin/google-chrome --headless"),
            Some("/usr/bin/google-chrome")
        );
    }

    #[test]
    fn test_parse_executable_quoted_token_preserves_spaces() {
        assert_eq!(
            parse_executable(r#""C:\Program Files\Google\Chrome\chrome.exe" --headless"#),
            Some(r"C:\Program Files\Google\Chrome\chrome.exe")
        );
    }

    #[test]
    fn test_instances_filters_to_debuggable_browsers() {
        let discovery = InstanceDiscovery::with_lister(FixedLister(vec![
            entry("chromium", "/usr/bin/chromium --remote-debugging-port=9222"),
            entry("chromium", "/usr/bin/chromium --type=renderer"),
            entry("firefox", "/usr/lib/firefox/firefox --remote-debugging-port=6000"),
            entry("bash", "/bin/bash --remote-debugging-port=9999"),
            entry("chrome", ""),
        ]));

        let instances = discovery.instances().unwrap();
        assert_eq!(
            instances,
            vec![
                DiscoveredInstance {
                    executable_path: PathBuf::from("/usr/bin/chromium"),
                    debug_port: 9222,
                },
                DiscoveredInstance {
                    executable_path: PathBuf::from("/usr/lib/firefox/firefox"),
                    debug_port: 6000,
                },
            ]
        );
    }

    #[test]
    fn test_instances_matches_names_case_insensitively() {
        let discovery = InstanceDiscovery::with_lister(FixedLister(vec![entry(
            "Google Chrome",
            r#""/Applications/Google Chrome.app/Contents/MacOS/Google Chrome" --remote-debugging-port=9222"#,
        )]));

        let instances = discovery.instances().unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(
            instances[0].executable_path,
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome")
        );
    }

    #[test]
    fn test_process_name_from_command_line() {
        assert_eq!(
            process_name_of("/usr/bin/google-chrome --remote-debugging-port=9222"),
            "google-chrome"
        );
        assert_eq!(
            process_name_of(r#""/opt/app dir/chromium" --headless"#),
            "chromium"
        );
    }
}
