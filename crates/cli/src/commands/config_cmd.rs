//! `webmind config` — inspect the configuration.

use webmind_config::{AppConfig, ConfigError};

pub fn show(config: AppConfig) {
    print!("{}", config.to_toml_redacted());
}

pub fn path() {
    println!("{}", AppConfig::config_dir().join("config.toml").display());
}

pub fn validate(config: Result<AppConfig, ConfigError>) {
    let config = match config.and_then(|c| c.validate().map(|()| c)) {
        Ok(config) => config,
        Err(e) => {
            println!("  ❌ {e}");
            return;
        }
    };

    println!("  ✅ Configuration is valid");
    if config.has_api_key() {
        println!("  ✅ API key configured ({})", config.api_url);
    } else {
        println!("  ⚠️  No API key configured. Chat is disabled.");
    }
    println!(
        "  ✅ Memory: {} records per kind, context budget {} chars",
        config.memory.max_history, config.context.budget_chars
    );
}
