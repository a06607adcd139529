//! Utility commands

use anyhow::Result;
use sketchctl::ports::{PortPolicy, PortSelector};
use sketchctl::sketch::SketchResolver;

/// List serial ports that look like boards
pub fn cmd_list_ports(board_tag: &str) -> Result<()> {
    let selector = PortSelector::host(board_tag);

    let ports = match selector.policy() {
        PortPolicy::DescriptionFiltered { tag } => {
            println!("{tag} ports on system:\n");
            selector.candidates()?
        }
        PortPolicy::Unfiltered => {
            println!("Boards cannot be identified on this system. Listing all ports:\n");
            selector.all_ports()?
        }
    };

    if ports.is_empty() {
        println!("  No serial ports found");
        return Ok(());
    }

    for port in ports {
        println!("  {} ({})", port.device, port.description);
    }

    Ok(())
}

/// List the files in sketches/<name>
pub fn cmd_dir_list(name: &str) -> Result<()> {
    let resolver = SketchResolver::from_current_dir()?;
    let files = resolver.list_dir(name)?;

    println!("Files in {}:", resolver.root().join(name).display());
    for file in files {
        println!("  {file}");
    }

    Ok(())
}
