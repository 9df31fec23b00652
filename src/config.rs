use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub jwt_secret: String,
    pub cors_origin: String,
    pub trust_proxy: bool,
    pub default_native_language: String,
    pub rate_limit: RateLimitConfig,
    pub srs: SrsConfig,
    pub translator: TranslatorConfig,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u64,
}

/// Spaced-repetition tunables. Thresholds are policy, not constants: the
/// regression rule in particular can be switched off entirely.
#[derive(Debug, Clone)]
pub struct SrsConfig {
    pub growth_factor: f64,
    pub min_interval_days: u32,
    pub advance_threshold: u32,
    pub regression_enabled: bool,
    pub regression_threshold: u32,
}

#[derive(Clone)]
pub struct TranslatorConfig {
    pub enabled: bool,
    pub mock: bool,
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
    pub semantic_judge_enabled: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("enable_file_logs", &self.enable_file_logs)
            .field("log_dir", &self.log_dir)
            .field("sled_path", &self.sled_path)
            .field("jwt_secret", &"***REDACTED***")
            .field("cors_origin", &self.cors_origin)
            .field("trust_proxy", &self.trust_proxy)
            .field("default_native_language", &self.default_native_language)
            .field("rate_limit", &self.rate_limit)
            .field("srs", &self.srs)
            .field("translator", &self.translator)
            .finish()
    }
}

impl fmt::Debug for TranslatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslatorConfig")
            .field("enabled", &self.enabled)
            .field("mock", &self.mock)
            .field("api_url", &self.api_url)
            .field("api_key", &"***REDACTED***")
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("semantic_judge_enabled", &self.semantic_judge_enabled)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/quiz.sled"),
            jwt_secret: env_or(
                "JWT_SECRET",
                "change_me_to_random_64_chars_change_me_to_random_64_chars",
            ),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            trust_proxy: env_or_bool("TRUST_PROXY", false),
            default_native_language: env_or("DEFAULT_NATIVE_LANGUAGE", "en"),
            rate_limit: RateLimitConfig {
                window_secs: env_or_parse("RATE_LIMIT_WINDOW_SECS", 900_u64),
                max_requests: env_or_parse("RATE_LIMIT_MAX", 500_u64),
            },
            srs: SrsConfig {
                growth_factor: env_or_parse("SRS_GROWTH_FACTOR", 2.0_f64),
                min_interval_days: env_or_parse("SRS_MIN_INTERVAL_DAYS", 1_u32),
                advance_threshold: env_or_parse("SRS_ADVANCE_THRESHOLD", 3_u32),
                regression_enabled: env_or_bool("SRS_REGRESSION_ENABLED", true),
                regression_threshold: env_or_parse("SRS_REGRESSION_THRESHOLD", 2_u32),
            },
            translator: TranslatorConfig {
                enabled: env_or_bool("TRANSLATOR_ENABLED", false),
                mock: env_or_bool("TRANSLATOR_MOCK", true),
                api_url: env_or("TRANSLATOR_API_URL", ""),
                api_key: env_or("TRANSLATOR_API_KEY", ""),
                model: env_or("TRANSLATOR_MODEL", "mock-translator"),
                timeout_secs: env_or_parse("TRANSLATOR_TIMEOUT_SECS", 30_u64),
                semantic_judge_enabled: env_or_bool("SEMANTIC_JUDGE_ENABLED", false),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn managed_keys() -> &'static [&'static str] {
        &[
            "HOST",
            "PORT",
            "RUST_LOG",
            "RATE_LIMIT_MAX",
            "SRS_GROWTH_FACTOR",
            "SRS_ADVANCE_THRESHOLD",
            "SRS_REGRESSION_ENABLED",
            "TRANSLATOR_ENABLED",
            "TRANSLATOR_MOCK",
            "TRANSLATOR_TIMEOUT_SECS",
        ]
    }

    fn clear_keys(keys: &[&str]) {
        for key in keys {
            env::remove_var(key);
        }
    }

    #[test]
    fn loads_defaults_when_missing() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.rate_limit.max_requests, 500);
        assert_eq!(cfg.srs.advance_threshold, 3);
        assert!(cfg.srs.regression_enabled);
        assert!(!cfg.translator.enabled);
    }

    #[test]
    fn parses_numeric_values() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "4000");
        env::set_var("SRS_GROWTH_FACTOR", "1.5");
        env::set_var("TRANSLATOR_TIMEOUT_SECS", "42");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 4000);
        assert!((cfg.srs.growth_factor - 1.5).abs() < f64::EPSILON);
        assert_eq!(cfg.translator.timeout_secs, 42);
    }

    #[test]
    fn invalid_values_fall_back() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "bad");
        env::set_var("SRS_ADVANCE_THRESHOLD", "x");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.srs.advance_threshold, 3);
    }

    #[test]
    fn regression_can_be_disabled() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("SRS_REGRESSION_ENABLED", "false");
        let cfg = Config::from_env();
        assert!(!cfg.srs.regression_enabled);
    }
}
