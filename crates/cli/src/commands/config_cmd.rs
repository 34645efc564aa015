//! `lexiscope config`: configuration management commands.

use lexiscope_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();
            if config.composer.curriculum_max_chars > config.composer.max_context_chars {
                warnings.push("Curriculum cap exceeds the whole-context cap");
            }
            if config.composer.curriculum_timeout_ms == 0 {
                warnings.push("Curriculum timeout is 0ms, every fetch will miss");
            }
            if config.composer.search_timeout_ms == 0 {
                warnings.push("Search timeout is 0ms, every search will miss");
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
            println!(
                "   Search cache:     {} entries, {}s TTL",
                config.cache.search.capacity, config.cache.search.ttl_secs
            );
            println!(
                "   Lesson cache:     {} entries, {}s TTL",
                config.cache.curriculum.capacity, config.cache.curriculum.ttl_secs
            );
            println!("   Fuzzy threshold:  {}", config.matching.response_threshold);
            println!("   Context cap:      {} chars", config.composer.max_context_chars);
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
