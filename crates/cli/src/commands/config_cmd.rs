//! `parley config`: Configuration management commands.

use parley_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();
            if config.engine.retry.unbounded {
                warnings.push("Retries are unbounded: a silent executor will never give up");
            }
            if config.store.backend == "none" {
                warnings.push("Persistence is disabled (store.backend = \"none\")");
            }
            if config.projection.presentable_tools.is_empty() {
                warnings.push("No presentable tools: tool results will replay as empty entries");
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Context:   {} turns", config.engine.max_context);
            println!(
                "   Retries:   {}",
                if config.engine.retry.unbounded {
                    "unbounded".to_string()
                } else {
                    config.engine.retry.max_attempts.to_string()
                }
            );
            println!(
                "   Store:     {} ({})",
                config.store.backend,
                config.store.resolved_path().display()
            );
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
