//! `loreweave config` — Configuration management commands.

use loreweave_config::EngineConfig;

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = EngineConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = EngineConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        println!("⚠️  Config already exists at: {}", config_path.display());
        return Ok(());
    }
    tokio::fs::create_dir_all(&config_dir).await?;
    tokio::fs::write(&config_path, EngineConfig::default_toml()).await?;
    println!("✅ Created config.toml at: {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn config_path_is_valid() {
        let path = loreweave_config::EngineConfig::config_dir().join("config.toml");
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }
}
