//! `rookery config`: Print the default configuration.

use rookery_config::AppConfig;

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("# Save as {} and edit as needed", config_path.display());
    println!("{}", AppConfig::default_toml());
    Ok(())
}
