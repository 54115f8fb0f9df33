use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;

const CONFIG_TEMPLATE: &str = r#"# deepduck configuration
#
# API keys are read from environment variables by default:
#   GEMINI_API_KEY, OPENAI_API_KEY
# Any setting can be overridden with DEEPDUCK_<SECTION>__<KEY>,
# e.g. DEEPDUCK_RESEARCH__URLS_PER_ROUND=2

# ── Language model ───────────────────────────────────────────────
[provider]
name = "gemini"
# type = "gemini"                 # gemini | openai (inferred when unset)
# api_key = "AIza..."             # or set GEMINI_API_KEY env var
model = "gemini-2.0-flash-exp"

# OpenAI-compatible servers (Ollama, vLLM, OpenRouter, ...):
# name = "ollama"
# base_url = "http://localhost:11434/v1"
# model = "llama3.2"

# ── Research loop ────────────────────────────────────────────────
[research]
# max_search_results = 10        # candidate URLs requested per search
# urls_per_round = 3             # fresh pages fetched per round; values above 3
                                 # also let the visited set grow faster than 3/round
# raw_text_policy = "window"     # window | current-round
# raw_text_max_chars = 200000    # window size across rounds
# query_dedup_attempts = 1       # re-prompts for a repeated query (0 = off)
# mark_failed_visited = false    # never retry URLs that failed to fetch

# ── Web access ───────────────────────────────────────────────────
[web]
# user_agent = "deepduck/0.1"
# timeout_secs = 30
# max_page_chars = 50000
"#;

pub fn run() -> Result<()> {
    let config_dir = Config::config_dir()?;
    let config_path = config_dir.join("config.toml");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;

    if config_path.exists() {
        println!("Existing config file found:");
        println!("  {}", config_path.display());
        print!("\nOverwrite? (Existing file will be backed up) [y/N] ");

        use std::io::Write;
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Setup cancelled.");
            return Ok(());
        }
    }

    write_template(&config_path)?;
    println!("Created {}", config_path.display());

    println!("\nNext steps:");
    println!("  1. Set your API key:  export GEMINI_API_KEY=\"AIza...\"");
    println!("  2. Start researching: deepduck");
    println!("  3. Or non-interactive: deepduck -q \"latest advances in battery recycling\" -n 2");

    Ok(())
}

/// Write the template to `path`, backing up any existing file first.
fn write_template(path: &Path) -> Result<()> {
    if path.exists() {
        backup_file(path)?;
    }
    std::fs::write(path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Back up a file to <name>.bak, appending a timestamp if .bak already exists.
fn backup_file(path: &Path) -> Result<()> {
    let mut backup = path.with_extension("toml.bak");

    if backup.exists() {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        backup = path.with_extension(format!("toml.bak.{}", timestamp));
    }

    std::fs::rename(path, &backup)
        .with_context(|| format!("Failed to back up {} to {}", path.display(), backup.display()))?;
    println!("  Backed up to {}", backup.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.provider.name.as_deref(), Some("gemini"));
        assert_eq!(config.provider.model.as_deref(), Some("gemini-2.0-flash-exp"));
        assert_eq!(config.research.urls_per_round, 3);
        assert!(CONFIG_TEMPLATE.contains("values above 3"));
    }

    #[test]
    fn test_write_template_backs_up_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "old = true").unwrap();

        write_template(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), CONFIG_TEMPLATE);
        let backup = dir.path().join("config.toml.bak");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "old = true");
    }
}
