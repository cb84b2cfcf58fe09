use crate::config::model::BalancerConfig;

pub fn load_config() -> Result<BalancerConfig, anyhow::Error> {
    load_config_from_path("helios.toml")
}

pub fn load_config_from_path(config_path: &str) -> Result<BalancerConfig, anyhow::Error> {
    let config_str = std::fs::read_to_string(config_path)?;
    load_config_from_str(&config_str)
}

pub fn load_config_from_str(config_str: &str) -> Result<BalancerConfig, anyhow::Error> {
    let config: BalancerConfig = toml::from_str(config_str)?;
    config.validate()?;
    Ok(config)
}
