use anyhow::Result;

use feedloom_core::AppConfig;

/// Print the effective configuration, or write it out with `init`
pub fn run(config: &AppConfig, init: bool) -> Result<()> {
    let path = AppConfig::config_path();

    if init {
        if path.exists() {
            println!("Config already exists: {}", path.display());
        } else {
            config.save()?;
            println!("Wrote {}", path.display());
        }
        return Ok(());
    }

    println!("# {}", path.display());
    print!("{}", config.to_toml()?);

    Ok(())
}
