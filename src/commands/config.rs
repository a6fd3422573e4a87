use anyhow::Result;
use colored::Colorize;

use crate::config::{self, Config};

/// Show the effective configuration, optionally writing it to the config file
pub fn show(config: &Config, save: bool) -> Result<()> {
    println!("\n{}", "Configuration".bold().cyan());
    println!("{}", "─".repeat(40).dimmed());

    let key = config
        .masked_api_key()
        .map(|k| k.green().to_string())
        .unwrap_or_else(|| format!("not set ({})", config::API_KEY_ENV).red().to_string());

    print_row("Config file", &Config::config_path()?.display().to_string());
    print_row("Data directory", &config.data_dir()?.display().to_string());
    print_row("Listen address", &config.bind_addr());
    print_row("API key", &key);
    print_row("Endpoint", &config.ai_url);
    print_row("Model", &config.model);
    print_row("Timeout", &format!("{}s", config.request_timeout_secs));
    print_row("Prompt limit", &format!("{} chars", config.max_prompt_chars));
    print_row(
        "Keywords",
        &format!(
            "top {} (min length {})",
            config.keywords.top_n, config.keywords.min_word_len
        ),
    );

    if save {
        config.save()?;
        println!(
            "\n{} Saved to {}",
            "✓".green(),
            Config::config_path()?.display()
        );
    }

    Ok(())
}

fn print_row(label: &str, value: &str) {
    println!("  {} {}", format!("{:<15}", label).dimmed(), value);
}
