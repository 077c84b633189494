use handbridge_core::config::Config;
use handbridge_core::{io, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(root)?;
    println!("Initializing handbridge in: {}", root.display());

    let config = serde_yaml::to_string(&Config::new())?;
    let files: [(&str, &[u8]); 3] = [
        (paths::CONFIG_FILE, config.as_bytes()),
        (paths::SIGNALS_FILE, b"{}\n"),
        (paths::MAPPING_FILE, b"{}\n"),
    ];
    for (name, content) in files {
        if io::write_if_missing(&root.join(name), content)? {
            println!("  created: {name}");
        } else {
            println!("  exists:  {name}");
        }
    }

    println!("\nhandbridge initialized.");
    println!("Next: handbridge signal add <name> <values...>");
    Ok(())
}
