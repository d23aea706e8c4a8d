use anyhow::{Context, Result};
use console::style;
use kestrel_browser::InstanceDiscovery;

pub fn execute(json: bool) -> Result<()> {
    let instances = InstanceDiscovery::new()
        .instances()
        .context("failed to scan the process table")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&instances)?);
        return Ok(());
    }

    if instances.is_empty() {
        println!("No debuggable browser instances found");
        return Ok(());
    }

    println!(
        "{}",
        style(format!(
            "Found {} debuggable browser instance(s)",
            instances.len()
        ))
        .bold()
    );
    for instance in &instances {
        println!(
            "  port {:<5} {}",
            instance.debug_port,
            instance.executable_path.display()
        );
    }

    Ok(())
}
