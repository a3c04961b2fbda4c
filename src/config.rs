use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DEV_ORIGIN: &str = "http://localhost:5173";
/// Hosting platforms idle the process after 15 minutes without traffic.
const DEFAULT_KEEPALIVE_SECS: u64 = 14 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Prod,
    Dev,
}

/// Server configuration read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub mode: Mode,
    pub port: u16,
    /// Origin allowed to open the WebSocket.
    pub client_origin: String,
    /// URL the keep-alive task pings. `None` disables the task.
    pub keepalive_url: Option<String>,
    pub keepalive_interval: Duration,
}

/// Load the configuration from the process environment.
pub fn load() -> Result<ServerConfig, ConfigError> {
    from_lookup(|name| std::env::var(name).ok())
}

/// Build the configuration from any variable source.
pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<ServerConfig, ConfigError> {
    let get = |name: &str| get(name).filter(|v| !v.trim().is_empty());

    let mode = match get("MODE").as_deref() {
        Some("prod") => Mode::Prod,
        _ => Mode::Dev,
    };

    let (client_var, server_var) = match mode {
        Mode::Prod => ("CLIENT_PROD_PATH", "SERVER_PROD_PATH"),
        Mode::Dev => ("CLIENT_DEV_PATH", "SERVER_DEV_PATH"),
    };

    let client_origin = get(client_var).unwrap_or_else(|| DEFAULT_DEV_ORIGIN.to_string());
    let keepalive_url = get(server_var);

    let port = parse_number("PORT", get("PORT"), DEFAULT_PORT)?;
    let keepalive_secs = parse_number("KEEPALIVE_INTERVAL_SECS", get("KEEPALIVE_INTERVAL_SECS"), DEFAULT_KEEPALIVE_SECS)?;
    if keepalive_secs == 0 {
        return Err(ConfigError::InvalidNumber {
            name: "KEEPALIVE_INTERVAL_SECS",
            value: "0".to_string(),
        });
    }

    Ok(ServerConfig {
        mode,
        port,
        client_origin,
        keepalive_url,
        keepalive_interval: Duration::from_secs(keepalive_secs),
    })
}

fn parse_number<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            config(&[]).unwrap(),
            ServerConfig {
                mode: Mode::Dev,
                port: 3000,
                client_origin: "http://localhost:5173".to_string(),
                keepalive_url: None,
                keepalive_interval: Duration::from_secs(840),
            }
        );
    }

    #[test]
    fn test_prod_mode_selects_prod_paths() {
        let cfg = config(&[
            ("MODE", "prod"),
            ("CLIENT_PROD_PATH", "https://story.example"),
            ("CLIENT_DEV_PATH", "http://localhost:5173"),
            ("SERVER_PROD_PATH", "https://api.story.example"),
            ("SERVER_DEV_PATH", "http://localhost:3000"),
        ])
        .unwrap();

        assert_eq!(cfg.mode, Mode::Prod);
        assert_eq!(cfg.client_origin, "https://story.example");
        assert_eq!(cfg.keepalive_url.as_deref(), Some("https://api.story.example"));
    }

    #[test]
    fn test_dev_mode_selects_dev_paths() {
        let cfg = config(&[
            ("MODE", "dev"),
            ("CLIENT_DEV_PATH", "http://localhost:8080"),
            ("SERVER_DEV_PATH", "http://localhost:3000"),
            ("SERVER_PROD_PATH", "https://api.story.example"),
        ])
        .unwrap();

        assert_eq!(cfg.mode, Mode::Dev);
        assert_eq!(cfg.client_origin, "http://localhost:8080");
        assert_eq!(cfg.keepalive_url.as_deref(), Some("http://localhost:3000"));
    }

    #[test]
    fn test_numeric_overrides() {
        let cfg = config(&[("PORT", "8081"), ("KEEPALIVE_INTERVAL_SECS", "60")]).unwrap();
        assert_eq!(cfg.port, 8081);
        assert_eq!(cfg.keepalive_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(matches!(
            config(&[("PORT", "eighty")]),
            Err(ConfigError::InvalidNumber { name: "PORT", .. })
        ));
        assert!(matches!(
            config(&[("KEEPALIVE_INTERVAL_SECS", "0")]),
            Err(ConfigError::InvalidNumber { name: "KEEPALIVE_INTERVAL_SECS", .. })
        ));
    }

    #[test]
    fn test_blank_values_fall_back() {
        let cfg = config(&[("SERVER_DEV_PATH", "  "), ("PORT", "")]).unwrap();
        assert_eq!(cfg.keepalive_url, None);
        assert_eq!(cfg.port, 3000);
    }
}
