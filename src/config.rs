use std::env;
use std::time::Duration;

/// User-Agent sent on relayed segment requests unless the caller supplies one.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/80.0.3987.132 Safari/537.36";

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Externally advertised base URL, prefixed to every rewritten manifest line
    pub base_url: String,
    pub is_dev: bool,
    /// Whole-request timeout for origin manifest fetches
    pub request_timeout: Duration,
    /// Connection setup timeout for all outbound requests
    pub connect_timeout: Duration,
    /// Default `User-Agent` for relayed segment requests
    pub user_agent: String,
    /// Allow target URLs whose host is a loopback/private IP literal
    pub allow_private_origins: bool,
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode, provides sensible defaults. In PROD mode, PORT and BASE_URL are required.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let port = if is_dev {
            env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?
        } else {
            env::var("PORT")
                .map_err(|_| "PORT is required in production")?
                .parse()?
        };

        // WEB_SERVER_URL is accepted for deployments of the older proxy
        let base_url = match env::var("BASE_URL").or_else(|_| env::var("WEB_SERVER_URL")) {
            Ok(url) => url,
            Err(_) if is_dev => format!("http://localhost:{}", port),
            Err(_) => return Err("BASE_URL is required in production".into()),
        };
        let base_url = base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url).map_err(|e| format!("BASE_URL is not a valid URL: {e}"))?;

        let request_timeout = Duration::from_secs(
            env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
        );

        let connect_timeout = Duration::from_secs(
            env::var("CONNECT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
        );

        let user_agent =
            env::var("DEFAULT_USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());

        // Private origins are reachable by default only in dev
        let allow_private_origins = env::var("ALLOW_PRIVATE_ORIGINS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(is_dev);

        Ok(Config {
            port,
            base_url,
            is_dev,
            request_timeout,
            connect_timeout,
            user_agent,
            allow_private_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serialize all env-var tests to prevent races between parallel test threads.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: &[&str] = &[
        "DEV_MODE",
        "PORT",
        "BASE_URL",
        "WEB_SERVER_URL",
        "REQUEST_TIMEOUT_SECS",
        "CONNECT_TIMEOUT_SECS",
        "DEFAULT_USER_AGENT",
        "ALLOW_PRIVATE_ORIGINS",
    ];

    /// Clear every config var, set `set`, run `f`, then restore original state.
    fn with_env(set: &[(&str, &str)], f: impl FnOnce()) {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());

        let saved: Vec<(&str, Option<String>)> =
            ALL_VARS.iter().map(|k| (*k, env::var(k).ok())).collect();

        for k in ALL_VARS {
            // SAFETY: serialized by ENV_LOCK, no other thread modifies env vars concurrently.
            unsafe { env::remove_var(k) };
        }
        for (k, v) in set {
            unsafe { env::set_var(k, v) };
        }

        f();

        for (k, old) in saved {
            match old {
                Some(v) => unsafe { env::set_var(k, v) },
                None => unsafe { env::remove_var(k) },
            }
        }
    }

    #[test]
    fn dev_mode_uses_defaults() {
        with_env(&[("DEV_MODE", "true")], || {
            let config = Config::from_env().expect("should succeed in dev mode");
            assert!(config.is_dev);
            assert_eq!(config.port, 8080);
            assert_eq!(config.base_url, "http://localhost:8080");
            assert_eq!(config.request_timeout, Duration::from_secs(30));
            assert_eq!(config.connect_timeout, Duration::from_secs(10));
            assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
            assert!(config.allow_private_origins);
        });
    }

    #[test]
    fn dev_base_url_follows_port() {
        with_env(&[("DEV_MODE", "true"), ("PORT", "9000")], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.base_url, "http://localhost:9000");
        });
    }

    #[test]
    fn prod_mode_requires_port() {
        with_env(&[("BASE_URL", "https://proxy.example.com")], || {
            assert!(Config::from_env().is_err(), "Should fail without PORT");
        });
    }

    #[test]
    fn prod_mode_requires_base_url() {
        with_env(&[("PORT", "8080")], || {
            assert!(Config::from_env().is_err(), "Should fail without BASE_URL");
        });
    }

    #[test]
    fn prod_mode_blocks_private_origins_by_default() {
        with_env(
            &[("PORT", "8080"), ("BASE_URL", "https://proxy.example.com")],
            || {
                let config = Config::from_env().unwrap();
                assert!(!config.is_dev);
                assert!(!config.allow_private_origins);
            },
        );
    }

    #[test]
    fn web_server_url_is_accepted_as_base_url() {
        with_env(
            &[("PORT", "8080"), ("WEB_SERVER_URL", "https://legacy.example.com")],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.base_url, "https://legacy.example.com");
            },
        );
    }

    #[test]
    fn base_url_wins_over_web_server_url() {
        with_env(
            &[
                ("DEV_MODE", "true"),
                ("BASE_URL", "https://new.example.com"),
                ("WEB_SERVER_URL", "https://legacy.example.com"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.base_url, "https://new.example.com");
            },
        );
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        with_env(
            &[("DEV_MODE", "true"), ("BASE_URL", "https://proxy.example.com/")],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.base_url, "https://proxy.example.com");
            },
        );
    }

    #[test]
    fn rejects_unparseable_base_url() {
        with_env(&[("DEV_MODE", "true"), ("BASE_URL", "not a url")], || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn timeouts_and_user_agent_parsed() {
        with_env(
            &[
                ("DEV_MODE", "true"),
                ("REQUEST_TIMEOUT_SECS", "5"),
                ("CONNECT_TIMEOUT_SECS", "2"),
                ("DEFAULT_USER_AGENT", "proxy-test/1.0"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.request_timeout, Duration::from_secs(5));
                assert_eq!(config.connect_timeout, Duration::from_secs(2));
                assert_eq!(config.user_agent, "proxy-test/1.0");
            },
        );
    }

    #[test]
    fn explicit_private_origin_override() {
        with_env(&[("DEV_MODE", "true"), ("ALLOW_PRIVATE_ORIGINS", "false")], || {
            let config = Config::from_env().unwrap();
            assert!(!config.allow_private_origins);
        });
    }
}
