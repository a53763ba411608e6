use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Protection settings, immutable for the lifetime of the process.
#[derive(Debug, Clone, Deserialize)]
pub struct ShieldConfig {
    pub enable_xss_protection: bool,
    pub enable_sql_injection_protection: bool,
    pub enable_rate_limiting: bool,
    pub max_attempts: u32,
    pub time_window_secs: u64,
    pub blocked_response_message: String,
    pub honeypot_url: Option<String>,
    pub enable_telemetry: bool,
    /// Checked before the built-in SQL patterns, in the order given.
    pub custom_sql_patterns: Vec<String>,
    /// Checked before the built-in XSS patterns, in the order given.
    pub custom_xss_patterns: Vec<String>,
}

impl ShieldConfig {
    pub fn time_window(&self) -> Duration {
        Duration::from_secs(self.time_window_secs)
    }
}

impl Default for ShieldConfig {
    fn default() -> Self {
        // Mirror defaults from config/default.toml
        Self {
            enable_xss_protection: true,
            enable_sql_injection_protection: true,
            enable_rate_limiting: true,
            max_attempts: 5,
            time_window_secs: 900,
            blocked_response_message: "Request blocked for security reasons".to_string(),
            honeypot_url: None,
            enable_telemetry: false,
            custom_sql_patterns: Vec::new(),
            custom_xss_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub shield: ShieldConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        let defaults: &str = include_str!("../config/default.toml");
        match ::config::Config::builder()
            .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let defaults: &str = include_str!("../config/default.toml");
    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
        // Optional local file: schildwall.toml (in CWD)
        .add_source(::config::File::with_name("schildwall").required(false));

    if let Ok(custom_path) = std::env::var("SCHILDWALL_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("SCHILDWALL").separator("__"));

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    // Warn for privileged ports on Unix-like systems
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    // Shield
    if cfg.shield.max_attempts == 0 {
        return Err(anyhow::anyhow!("shield.max_attempts must be > 0"));
    }
    if cfg.shield.time_window_secs == 0 {
        return Err(anyhow::anyhow!("shield.time_window_secs must be > 0"));
    }
    if let Some(url) = cfg.shield.honeypot_url.as_deref() {
        if url.trim().is_empty() {
            return Err(anyhow::anyhow!("shield.honeypot_url must not be empty when set"));
        }
        if !url.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
            return Err(anyhow::anyhow!("shield.honeypot_url contains invalid characters"));
        }
    }
    // Custom patterns are validated when the detectors are compiled at startup.

    Ok(())
}
