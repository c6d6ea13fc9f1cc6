use std::env;
use std::str::FromStr;

pub const DEFAULT_LOG_LEVEL: &str = "wst=info";
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 10;

/// Settings read from the environment. Command-line flags take precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_level: String,
    pub seed: Option<u64>,
    pub frame_limit: usize,
    pub parallel_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            seed: None,
            frame_limit: wst_lang::eval::DEFAULT_FRAME_LIMIT,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(log_level) = env::var("WST_LOG_LEVEL") {
            config.log_level = log_level;
        }

        if let Some(seed) = parse_var("WST_SEED", "a random seed") {
            config.seed = Some(seed);
        }

        if let Some(frame_limit) = parse_var("WST_FRAME_LIMIT", config.frame_limit) {
            config.frame_limit = frame_limit;
        }

        if let Some(threshold) = parse_var("WST_PARALLEL_THRESHOLD", config.parallel_threshold) {
            config.parallel_threshold = threshold;
        }

        config
    }
}

fn parse_var<T: FromStr>(name: &str, default: impl std::fmt::Display) -> Option<T> {
    let value = env::var(name).ok()?;
    match value.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            eprintln!("Warning: Invalid {name} value '{value}', using default {default}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopeguard::defer;

    const VARS: [&str; 4] = ["WST_LOG_LEVEL", "WST_SEED", "WST_FRAME_LIMIT", "WST_PARALLEL_THRESHOLD"];

    fn clear() {
        for var in VARS {
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, "wst=info");
        assert_eq!(config.seed, None);
        assert_eq!(config.frame_limit, 480);
        assert_eq!(config.parallel_threshold, 10);
    }

    // Environment variables are process-wide, so every case runs in one test.
    #[test]
    fn test_from_env() {
        clear();
        defer! { clear(); }

        assert_eq!(Config::from_env(), Config::default());

        unsafe {
            env::set_var("WST_LOG_LEVEL", "wst=debug");
            env::set_var("WST_SEED", "42");
            env::set_var("WST_FRAME_LIMIT", " 128 ");
            env::set_var("WST_PARALLEL_THRESHOLD", "2");
        }
        assert_eq!(
            Config::from_env(),
            Config {
                log_level: "wst=debug".to_string(),
                seed: Some(42),
                frame_limit: 128,
                parallel_threshold: 2,
            }
        );

        unsafe {
            env::set_var("WST_SEED", "not-a-number");
            env::set_var("WST_FRAME_LIMIT", "-1");
        }
        let config = Config::from_env();
        assert_eq!(config.seed, None);
        assert_eq!(config.frame_limit, 480);
        assert_eq!(config.parallel_threshold, 2);
    }
}
