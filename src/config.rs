//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or the path in `REVERIE_CONFIG`), then applies `REVERIE_LOG_LEVEL`.
//! The model API key is only ever read from the environment.

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::error::AppError;

/// Env vars consulted for the hosted-model API key, in order.
pub const API_KEY_VARS: [&str; 3] = ["LLM_API_KEY", "GEMINI_API_KEY", "API_KEY"];

/// PTY (console) channel configuration.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    pub enabled: bool,
}

/// HTTP (axum) channel configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub enabled: bool,
    /// Socket address to bind the HTTP channel to.
    pub bind: String,
}

/// Comms subsystem configuration.
#[derive(Debug, Clone)]
pub struct CommsConfig {
    /// Maximum chat messages kept in the shared transcript.
    pub transcript_cap: usize,
    pub pty: PtyConfig,
    pub http: HttpConfig,
}

/// Gemini provider configuration, from `[llm.gemini]`.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub api_base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// LLM subsystem configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"gemini"`, `"dummy"`, `"mock"`).
    /// Maps to `default` in `[llm]`.
    pub provider: String,
    pub gemini: GeminiConfig,
}

/// Persona / internal-state settings, from `[mind]`.
#[derive(Debug, Clone)]
pub struct MindConfig {
    /// Directory holding `persona.md` and `dream.md` prompt templates.
    pub prompts_dir: PathBuf,
    /// Conversation entries retained for prompts, dreams and the report.
    pub history_cap: usize,
    /// Internal monologue lines retained.
    pub monologue_cap: usize,
    /// Fixed RNG seed for reproducible runs. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Send "Introduce yourself." once before channels start.
    pub greet_on_start: bool,
}

/// Idle timers for unprompted thoughts and dreams, from `[scheduler]`.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub thought_delay: Duration,
    /// Used instead of `thought_delay` when confidence is very high or very low.
    pub agitated_thought_delay: Duration,
    pub dream_delay: Duration,
    /// How long dream keywords linger before the closing message.
    pub dream_linger: Duration,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    pub log_level: String,
    /// Optional log file (already expanded, no `~`). Logs go to stderr otherwise.
    pub log_file: Option<PathBuf>,
    pub mind: MindConfig,
    pub scheduler: SchedulerConfig,
    pub llm: LlmConfig,
    /// API key from the environment, see [`API_KEY_VARS`]. Never sourced from TOML.
    pub llm_api_key: Option<String>,
    pub comms: CommsConfig,
}

impl Config {
    /// Returns `true` if the PTY channel should be loaded.
    pub fn comms_pty_should_load(&self) -> bool {
        self.comms.pty.enabled
    }

    /// Returns `true` if the HTTP channel should be loaded.
    pub fn comms_http_should_load(&self) -> bool {
        self.comms.http.enabled
    }
}

/// Raw TOML shape: `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    supervisor: RawSupervisor,
    #[serde(default)]
    mind: RawMind,
    #[serde(default)]
    scheduler: RawScheduler,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    comms: RawComms,
}

#[derive(Deserialize)]
struct RawSupervisor {
    bot_name: String,
    log_level: String,
    #[serde(default)]
    log_file: Option<String>,
}

#[derive(Deserialize)]
struct RawMind {
    #[serde(default = "default_prompts_dir")]
    prompts_dir: String,
    #[serde(default = "default_history_cap")]
    history_cap: usize,
    #[serde(default = "default_monologue_cap")]
    monologue_cap: usize,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default = "default_true")]
    greet_on_start: bool,
}

impl Default for RawMind {
    fn default() -> Self {
        Self {
            prompts_dir: default_prompts_dir(),
            history_cap: default_history_cap(),
            monologue_cap: default_monologue_cap(),
            seed: None,
            greet_on_start: true,
        }
    }
}

fn default_prompts_dir() -> String { "config/prompts".to_string() }
fn default_history_cap() -> usize { 256 }
fn default_monologue_cap() -> usize { 64 }

#[derive(Deserialize)]
struct RawScheduler {
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_thought_delay_secs")]
    thought_delay_secs: u64,
    #[serde(default = "default_agitated_thought_delay_secs")]
    agitated_thought_delay_secs: u64,
    #[serde(default = "default_dream_delay_secs")]
    dream_delay_secs: u64,
    #[serde(default = "default_dream_linger_secs")]
    dream_linger_secs: u64,
}

impl Default for RawScheduler {
    fn default() -> Self {
        Self {
            enabled: true,
            thought_delay_secs: default_thought_delay_secs(),
            agitated_thought_delay_secs: default_agitated_thought_delay_secs(),
            dream_delay_secs: default_dream_delay_secs(),
            dream_linger_secs: default_dream_linger_secs(),
        }
    }
}

fn default_thought_delay_secs() -> u64 { 30 }
fn default_agitated_thought_delay_secs() -> u64 { 22 }
fn default_dream_delay_secs() -> u64 { 60 }
fn default_dream_linger_secs() -> u64 { 4 }

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    gemini: RawGeminiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), gemini: RawGeminiConfig::default() }
    }
}

#[derive(Deserialize)]
struct RawGeminiConfig {
    #[serde(default = "default_gemini_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_gemini_text_model")]
    text_model: String,
    #[serde(default = "default_gemini_image_model")]
    image_model: String,
    #[serde(default = "default_gemini_temperature")]
    temperature: f32,
    #[serde(default = "default_gemini_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawGeminiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_gemini_api_base_url(),
            text_model: default_gemini_text_model(),
            image_model: default_gemini_image_model(),
            temperature: default_gemini_temperature(),
            timeout_seconds: default_gemini_timeout_seconds(),
        }
    }
}

fn default_llm_provider() -> String { "gemini".to_string() }
fn default_gemini_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_gemini_text_model() -> String { "gemini-2.5-flash".to_string() }
fn default_gemini_image_model() -> String { "imagen-4.0-generate-001".to_string() }
fn default_gemini_temperature() -> f32 { 0.9 }
fn default_gemini_timeout_seconds() -> u64 { 60 }

#[derive(Deserialize)]
struct RawComms {
    #[serde(default = "default_transcript_cap")]
    transcript_cap: usize,
    #[serde(default)]
    pty: RawPty,
    #[serde(default)]
    http: RawHttp,
}

impl Default for RawComms {
    fn default() -> Self {
        Self {
            transcript_cap: default_transcript_cap(),
            pty: RawPty::default(),
            http: RawHttp::default(),
        }
    }
}

fn default_transcript_cap() -> usize { 500 }

#[derive(Deserialize)]
struct RawPty {
    #[serde(default = "default_true")]
    enabled: bool,
}

impl Default for RawPty {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Deserialize)]
struct RawHttp {
    /// Defaults to `false`: HTTP must be explicitly enabled.
    #[serde(default = "default_false")]
    enabled: bool,
    #[serde(default = "default_http_bind")]
    bind: String,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self { enabled: false, bind: default_http_bind() }
    }
}

fn default_http_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

/// Load config from `config_path`, else `REVERIE_CONFIG`, else
/// `config/default.toml`, then apply env-var overrides.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let path = match config_path {
        Some(p) => p.to_string(),
        None => env::var("REVERIE_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string()),
    };
    let log_level_override = env::var("REVERIE_LOG_LEVEL").ok();
    let api_key = api_key_from_env();
    load_from(Path::new(&path), log_level_override.as_deref(), api_key)
}

/// First non-empty value among [`API_KEY_VARS`].
pub fn api_key_from_env() -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|var| env::var(var).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// Internal loader. Accepts an explicit path and overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    log_level_override: Option<&str>,
    llm_api_key: Option<String>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let s = parsed.supervisor;
    let log_level = log_level_override.unwrap_or(&s.log_level).to_string();

    if parsed.mind.history_cap == 0 {
        return Err(AppError::Config("mind.history_cap must be at least 1".into()));
    }
    if parsed.comms.transcript_cap == 0 {
        return Err(AppError::Config("comms.transcript_cap must be at least 1".into()));
    }
    let sch = &parsed.scheduler;
    for (name, secs) in [
        ("thought_delay_secs", sch.thought_delay_secs),
        ("agitated_thought_delay_secs", sch.agitated_thought_delay_secs),
        ("dream_delay_secs", sch.dream_delay_secs),
    ] {
        if secs == 0 {
            return Err(AppError::Config(format!("scheduler.{name} must be at least 1")));
        }
    }

    Ok(Config {
        bot_name: s.bot_name,
        log_level,
        log_file: s.log_file.as_deref().map(expand_home),
        mind: MindConfig {
            prompts_dir: expand_home(&parsed.mind.prompts_dir),
            history_cap: parsed.mind.history_cap,
            monologue_cap: parsed.mind.monologue_cap.max(1),
            seed: parsed.mind.seed,
            greet_on_start: parsed.mind.greet_on_start,
        },
        scheduler: SchedulerConfig {
            enabled: parsed.scheduler.enabled,
            thought_delay: Duration::from_secs(parsed.scheduler.thought_delay_secs),
            agitated_thought_delay: Duration::from_secs(
                parsed.scheduler.agitated_thought_delay_secs,
            ),
            dream_delay: Duration::from_secs(parsed.scheduler.dream_delay_secs),
            dream_linger: Duration::from_secs(parsed.scheduler.dream_linger_secs),
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            gemini: GeminiConfig {
                api_base_url: parsed.llm.gemini.api_base_url,
                text_model: parsed.llm.gemini.text_model,
                image_model: parsed.llm.gemini.image_model,
                temperature: parsed.llm.gemini.temperature,
                timeout_seconds: parsed.llm.gemini.timeout_seconds,
            },
        },
        llm_api_key: llm_api_key.filter(|k| !k.trim().is_empty()),
        comms: CommsConfig {
            transcript_cap: parsed.comms.transcript_cap,
            pty: PtyConfig { enabled: parsed.comms.pty.enabled },
            http: HttpConfig { enabled: parsed.comms.http.enabled, bind: parsed.comms.http.bind },
        },
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

impl Config {
    /// Safe `Config` for tests: mock mode, fixed seed, no external calls.
    pub fn test_default() -> Self {
        Self {
            bot_name: "test".into(),
            log_level: "info".into(),
            log_file: None,
            mind: MindConfig {
                prompts_dir: PathBuf::from("config/prompts"),
                history_cap: default_history_cap(),
                monologue_cap: default_monologue_cap(),
                seed: Some(7),
                greet_on_start: false,
            },
            scheduler: SchedulerConfig {
                enabled: false,
                thought_delay: Duration::from_secs(default_thought_delay_secs()),
                agitated_thought_delay: Duration::from_secs(default_agitated_thought_delay_secs()),
                dream_delay: Duration::from_secs(default_dream_delay_secs()),
                dream_linger: Duration::ZERO,
            },
            llm: LlmConfig {
                provider: "mock".into(),
                gemini: GeminiConfig {
                    api_base_url: "http://localhost:0/v1beta".into(),
                    text_model: "test-model".into(),
                    image_model: "test-image-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
            },
            llm_api_key: None,
            comms: CommsConfig {
                transcript_cap: default_transcript_cap(),
                pty: PtyConfig { enabled: false },
                http: HttpConfig { enabled: false, bind: default_http_bind() },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_TOML: &str = r#"
[supervisor]
bot_name = "test-bot"
log_level = "info"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_minimal_config_uses_defaults() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.bot_name, "test-bot");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.llm.provider, "gemini");
        assert_eq!(cfg.llm.gemini.text_model, "gemini-2.5-flash");
        assert_eq!(cfg.llm.gemini.image_model, "imagen-4.0-generate-001");
        assert_eq!(cfg.scheduler.thought_delay, Duration::from_secs(30));
        assert_eq!(cfg.scheduler.agitated_thought_delay, Duration::from_secs(22));
        assert_eq!(cfg.scheduler.dream_delay, Duration::from_secs(60));
        assert_eq!(cfg.scheduler.dream_linger, Duration::from_secs(4));
        assert!(cfg.mind.greet_on_start);
        assert!(cfg.comms_pty_should_load());
        assert!(!cfg.comms_http_should_load());
        assert!(cfg.llm_api_key.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let f = write_toml(
            r#"
[supervisor]
bot_name = "r"
log_level = "debug"

[mind]
seed = 42
history_cap = 8

[scheduler]
enabled = false
dream_delay_secs = 5

[llm]
default = "dummy"

[llm.gemini]
temperature = 0.1

[comms.http]
enabled = true
bind = "0.0.0.0:9000"
"#,
        );
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.mind.seed, Some(42));
        assert_eq!(cfg.mind.history_cap, 8);
        assert!(!cfg.scheduler.enabled);
        assert_eq!(cfg.scheduler.dream_delay, Duration::from_secs(5));
        assert_eq!(cfg.llm.provider, "dummy");
        assert!((cfg.llm.gemini.temperature - 0.1).abs() < f32::EPSILON);
        assert!(cfg.comms_http_should_load());
        assert_eq!(cfg.comms.http.bind, "0.0.0.0:9000");
    }

    #[test]
    fn zero_history_cap_rejected() {
        let f = write_toml(&format!("{MINIMAL_TOML}\n[mind]\nhistory_cap = 0\n"));
        let err = load_from(f.path(), None, None).unwrap_err();
        assert!(err.to_string().contains("history_cap"));
    }

    #[test]
    fn zero_scheduler_delays_rejected() {
        for key in ["thought_delay_secs", "agitated_thought_delay_secs", "dream_delay_secs"] {
            let f = write_toml(&format!("{MINIMAL_TOML}\n[scheduler]\n{key} = 0\n"));
            let err = load_from(f.path(), None, None).unwrap_err();
            assert!(err.to_string().contains(key), "{err}");
        }

        // No linger just means the closing notice follows at once.
        let f = write_toml(&format!("{MINIMAL_TOML}\n[scheduler]\ndream_linger_secs = 0\n"));
        let cfg = load_from(f.path(), None, None).unwrap();
        assert!(cfg.scheduler.dream_linger.is_zero());
    }

    #[test]
    fn blank_api_key_is_none() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, Some("   ".into())).unwrap();
        assert!(cfg.llm_api_key.is_none());
        let cfg = load_from(f.path(), None, Some("k-123".into())).unwrap();
        assert_eq!(cfg.llm_api_key.as_deref(), Some("k-123"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let expanded = expand_home("~/.reverie");
        assert!(expanded.starts_with(&home));
        assert!(expanded.ends_with(".reverie"));
    }

    #[test]
    fn absolute_path_unchanged() {
        assert_eq!(expand_home("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), None, None);
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn log_level_override() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), Some("debug"), None).unwrap();
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn shipped_default_config_parses() {
        let cfg = load_from(Path::new("config/default.toml"), None, None).unwrap();
        assert_eq!(cfg.bot_name, "reverie");
        assert_eq!(cfg.mind.prompts_dir, PathBuf::from("config/prompts"));
    }
}
