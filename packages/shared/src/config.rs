use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Runtime settings shared by the server binary and the AI players.
#[derive(Debug, Clone, PartialEq)]
pub struct ArenaConfig {
    /// Address the HTTP server listens on
    pub bind_address: String,
    /// Maximum tracing level for the subscriber
    pub log_level: String,
    /// How long an AI player waits for a single oracle suggestion
    pub oracle_timeout: Duration,
    /// Suggestions an AI player tries before giving up on a turn
    pub oracle_max_attempts: u32,
    /// Pause before an AI player tries a failed turn again
    pub ai_retry_backoff: Duration,
    /// Difficulty given to newly provisioned AI users
    pub ai_difficulty: u8,
    /// Name prefix for newly provisioned AI users
    pub ai_name_prefix: String,
    /// Buffered game events per subscriber
    pub event_capacity: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            log_level: "info".to_string(),
            oracle_timeout: Duration::from_millis(5000),
            oracle_max_attempts: 5,
            ai_retry_backoff: Duration::from_millis(1000),
            ai_difficulty: 1,
            ai_name_prefix: "ai".to_string(),
            event_capacity: 1024,
        }
    }
}

impl ArenaConfig {
    /// Create a configuration from `ARENA_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bind_address) = lookup("ARENA_BIND_ADDRESS") {
            config.bind_address = bind_address;
        }

        if let Some(log_level) = lookup("ARENA_LOG_LEVEL") {
            config.log_level = log_level;
        }

        if let Some(millis) = parse_var::<u64>(&lookup, "ARENA_ORACLE_TIMEOUT_MS") {
            config.oracle_timeout = Duration::from_millis(millis);
        }

        if let Some(attempts) = parse_var::<u32>(&lookup, "ARENA_ORACLE_MAX_ATTEMPTS") {
            config.oracle_max_attempts = attempts.max(1);
        }

        if let Some(millis) = parse_var::<u64>(&lookup, "ARENA_AI_RETRY_BACKOFF_MS") {
            config.ai_retry_backoff = Duration::from_millis(millis.max(1));
        }

        if let Some(difficulty) = parse_var(&lookup, "ARENA_AI_DIFFICULTY") {
            config.ai_difficulty = difficulty;
        }

        if let Some(prefix) = lookup("ARENA_AI_NAME_PREFIX") {
            config.ai_name_prefix = prefix;
        }

        if let Some(capacity) = parse_var::<usize>(&lookup, "ARENA_EVENT_CAPACITY") {
            config.event_capacity = capacity.max(1);
        }

        config
    }

    /// Parsed `log_level`, falling back to INFO.
    pub fn tracing_level(&self) -> tracing::Level {
        match tracing::Level::from_str(&self.log_level) {
            Ok(level) => level,
            Err(_) => {
                warn!("Unknown log level {:?}, using info", self.log_level);
                tracing::Level::INFO
            }
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparseable {}={:?}", key, raw);
            None
        }
    }
}
