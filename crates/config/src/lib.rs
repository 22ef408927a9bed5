use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Persistent Researcher".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API (the `/chat/completions` suffix
    /// is appended).  Overridden by `LLM_BASE_URL`.
    pub base_url: String,
    /// Overridden by `LLM_MODEL`.
    pub model: String,
    /// Prefer the `LLM_API_KEY` env var over storing the key here; the env
    /// var takes precedence when both are set.
    pub api_key: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://chatapi.akash.network/api/v1".to_string(),
            model: "meta-llama/Meta-Llama-3-8B-Instruct".to_string(),
            api_key: String::new(),
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// `you` (default), `brave`, or `none`.
    pub provider: String,
    /// Key for the selected provider.  `YOU_API_KEY` / `BRAVE_API_KEY`
    /// override it for the matching provider.
    pub api_key: String,
    pub max_results: usize,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: "you".to_string(),
            api_key: String::new(),
            max_results: 3,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// JSON file holding the insight log.  Overridden by
    /// `RESEARCHER_MEMORY_PATH`.
    pub path: String,
    /// Maximum insights injected into each prompt.
    pub recall_limit: usize,
    /// Learn from every answered question.  When `false` only explicit
    /// "the answer is: ..." teachings are stored.
    pub auto_learn: bool,
    /// Extra degraded-output markers, matched case-insensitively in addition
    /// to the built-in set.
    pub extra_degraded_markers: Vec<String>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: ".researcher/memory/insights.json".to_string(),
            recall_limit: 3,
            auto_learn: true,
            extra_degraded_markers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub memory: MemoryConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(value) = non_empty_env("LLM_API_KEY") {
            self.llm.api_key = value;
        }
        if let Some(value) = non_empty_env("LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = non_empty_env("LLM_MODEL") {
            self.llm.model = value;
        }

        let search_key_var = match self.search.provider.to_ascii_lowercase().as_str() {
            "brave" => Some("BRAVE_API_KEY"),
            "none" | "off" | "disabled" => None,
            _ => Some("YOU_API_KEY"),
        };
        if let Some(value) = search_key_var.and_then(non_empty_env) {
            self.search.api_key = value;
        }

        if let Some(value) = non_empty_env("RESEARCHER_MEMORY_PATH") {
            self.memory.path = value;
        }
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    pub fn llm_key_configured(&self) -> bool {
        !self.llm.api_key.trim().is_empty()
    }

    pub fn search_key_configured(&self) -> bool {
        !self.search.api_key.trim().is_empty()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Tests that touch process env vars hold this lock so they do not race.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.agent.name, "Persistent Researcher");
        assert_eq!(cfg.llm.base_url, "https://chatapi.akash.network/api/v1");
        assert_eq!(cfg.llm.model, "meta-llama/Meta-Llama-3-8B-Instruct");
        assert!((cfg.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(cfg.search.provider, "you");
        assert_eq!(cfg.search.max_results, 3);
        assert_eq!(cfg.memory.path, ".researcher/memory/insights.json");
        assert_eq!(cfg.memory.recall_limit, 3);
        assert!(cfg.memory.auto_learn);
        assert_eq!(cfg.telemetry.log_level, "info");
        assert!(!cfg.llm_key_configured());
    }

    #[test]
    fn load_from_missing_file_returns_defaults() {
        let _env = ENV_LOCK.lock().unwrap();
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::load_from(dir.path().join("nonexistent.toml")).unwrap();
        assert_eq!(cfg.agent.name, "Persistent Researcher");
        assert_eq!(cfg.search.provider, "you");
    }

    #[test]
    fn load_from_valid_toml() {
        let _env = ENV_LOCK.lock().unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.toml");
        fs::write(
            &path,
            r#"
[agent]
name = "TestBot"

[llm]
base_url = "http://localhost:8080/v1"
model = "local-model"
temperature = 0.2

[search]
provider = "none"
max_results = 5

[memory]
path = "/tmp/insights.json"
recall_limit = 4
auto_learn = false
extra_degraded_markers = ["rate limited"]
"#,
        )
        .unwrap();

        let cfg = AppConfig::load_from(&path).unwrap();
        assert_eq!(cfg.agent.name, "TestBot");
        assert_eq!(cfg.llm.model, "local-model");
        assert!((cfg.llm.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(cfg.search.provider, "none");
        assert_eq!(cfg.search.max_results, 5);
        assert_eq!(cfg.memory.recall_limit, 4);
        assert!(!cfg.memory.auto_learn);
        assert_eq!(cfg.memory.extra_degraded_markers, vec!["rate limited"]);
        // Unspecified fields keep their defaults.
        assert_eq!(cfg.llm.timeout_secs, 60);
        assert_eq!(cfg.telemetry.log_level, "info");
    }

    #[test]
    fn load_from_invalid_toml_returns_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "this is not valid toml {{{{").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let _env = ENV_LOCK.lock().unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub/config.toml");

        let mut cfg = AppConfig::default();
        cfg.agent.name = "RoundTrip".to_string();
        cfg.search.provider = "brave".to_string();
        cfg.memory.recall_limit = 7;

        cfg.save_to(&path).unwrap();
        assert!(path.exists());

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.agent.name, "RoundTrip");
        assert_eq!(loaded.search.provider, "brave");
        assert_eq!(loaded.memory.recall_limit, 7);
    }

    #[test]
    fn env_overrides_take_precedence() {
        let _env = ENV_LOCK.lock().unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("env.toml");
        fs::write(
            &path,
            r#"
[llm]
api_key = "from-file"
model = "file-model"

[search]
provider = "brave"
api_key = "file-search-key"
"#,
        )
        .unwrap();

        // SAFETY: env mutation is serialized by ENV_LOCK.
        unsafe {
            env::set_var("LLM_API_KEY", "from-env");
            env::set_var("BRAVE_API_KEY", "brave-env");
            env::set_var("YOU_API_KEY", "you-env");
            env::set_var("RESEARCHER_MEMORY_PATH", "/tmp/env-insights.json");
        }
        let cfg = AppConfig::load_from(&path).unwrap();
        unsafe {
            env::remove_var("LLM_API_KEY");
            env::remove_var("BRAVE_API_KEY");
            env::remove_var("YOU_API_KEY");
            env::remove_var("RESEARCHER_MEMORY_PATH");
        }

        assert_eq!(cfg.llm.api_key, "from-env");
        assert_eq!(cfg.llm.model, "file-model");
        // Only the key matching the selected provider applies.
        assert_eq!(cfg.search.api_key, "brave-env");
        assert_eq!(cfg.memory.path, "/tmp/env-insights.json");
        assert!(cfg.llm_key_configured());
        assert!(cfg.search_key_configured());
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let _env = ENV_LOCK.lock().unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty-env.toml");
        fs::write(&path, "[llm]\nmodel = \"file-model\"\n").unwrap();

        // SAFETY: env mutation is serialized by ENV_LOCK.
        unsafe { env::set_var("LLM_MODEL", "   ") };
        let cfg = AppConfig::load_from(&path).unwrap();
        unsafe { env::remove_var("LLM_MODEL") };

        assert_eq!(cfg.llm.model, "file-model");
    }
}
