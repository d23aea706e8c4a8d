use anyhow::{Result, bail};
use kestrel_browser::DebugProbe;

pub async fn execute(port: u16) -> Result<()> {
    let probe = DebugProbe::new(port)?;

    if probe.is_live().await {
        println!("✅ Debug endpoint responding at {}", probe.version_url());
        Ok(())
    } else {
        bail!("no debug endpoint responding at {}", probe.version_url());
    }
}
