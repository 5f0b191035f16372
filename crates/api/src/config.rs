//! Runtime configuration: CLI flags with environment fallbacks.

use std::net::SocketAddr;

use clap::Parser;
use growthwatch_observability::LogFormat;

const DEV_SESSION_SECRET: &str = "growthwatch-dev-secret";

/// One year.
const MAX_SESSION_TTL_MINUTES: i64 = 525_600;

/// GrowthWatch HTTP API
#[derive(Parser, Debug, Clone)]
#[command(name = "growthwatch-api")]
#[command(about = "Role-based growth tracking service")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// HMAC secret for session tokens (required in production)
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Session lifetime in minutes (1 to 525600)
    #[arg(
        long,
        env = "SESSION_TTL_MINUTES",
        default_value_t = 720,
        value_parser = clap::value_parser!(i64).range(1..=MAX_SESSION_TTL_MINUTES)
    )]
    pub session_ttl_minutes: i64,

    /// Username of the boss account seeded at startup
    #[arg(long, env = "BOOTSTRAP_BOSS_USERNAME")]
    pub bootstrap_boss_username: Option<String>,

    #[arg(long, env = "BOOTSTRAP_BOSS_PASSWORD", hide_env_values = true)]
    pub bootstrap_boss_password: Option<String>,

    #[arg(long, env = "BOOTSTRAP_BOSS_NAME", default_value = "Boss")]
    pub bootstrap_boss_name: String,

    /// Log output: json, pretty or compact
    #[arg(long, env = "LOG_FORMAT", default_value = "json")]
    pub log_format: LogFormat,

    /// Postgres connection string
    #[cfg(feature = "postgres")]
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,
}

/// Credentials for the seeded boss account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapBoss {
    pub username: String,
    pub password: String,
    pub name: String,
}

impl Config {
    pub fn session_secret(&self) -> &[u8] {
        match &self.session_secret {
            Some(secret) => secret.as_bytes(),
            None => {
                tracing::warn!("SESSION_SECRET not set; using insecure dev default");
                DEV_SESSION_SECRET.as_bytes()
            }
        }
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes.clamp(1, MAX_SESSION_TTL_MINUTES))
    }

    /// Both username and password must be set; either alone is ignored.
    pub fn bootstrap_boss(&self) -> Option<BootstrapBoss> {
        match (&self.bootstrap_boss_username, &self.bootstrap_boss_password) {
            (Some(username), Some(password)) => Some(BootstrapBoss {
                username: username.clone(),
                password: password.clone(),
                name: self.bootstrap_boss_name.clone(),
            }),
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!("bootstrap boss needs both username and password; skipping");
                None
            }
            (None, None) => None,
        }
    }
}

#[cfg(all(test, not(feature = "postgres")))]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags() {
        let config = Config::parse_from(["growthwatch-api"]);
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.session_ttl(), chrono::Duration::minutes(720));
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.bootstrap_boss().is_none());
    }

    #[test]
    fn bootstrap_boss_needs_both_halves() {
        let config = Config::parse_from([
            "growthwatch-api",
            "--bootstrap-boss-username",
            "chief",
            "--bootstrap-boss-password",
            "long-password",
            "--log-format",
            "compact",
        ]);
        let boss = config.bootstrap_boss().unwrap();
        assert_eq!(boss.username, "chief");
        assert_eq!(boss.name, "Boss");
        assert_eq!(config.log_format, LogFormat::Compact);

        let half = Config::parse_from(["growthwatch-api", "--bootstrap-boss-username", "chief"]);
        assert!(half.bootstrap_boss().is_none());
    }

    #[test]
    fn session_ttl_is_bounded_at_parse_time() {
        for bad in ["0", "-5", "9223372036854775807"] {
            assert!(
                Config::try_parse_from(["growthwatch-api", "--session-ttl-minutes", bad]).is_err(),
                "{bad} should be rejected"
            );
        }

        let year = Config::parse_from(["growthwatch-api", "--session-ttl-minutes", "525600"]);
        assert_eq!(year.session_ttl(), chrono::Duration::days(365));
    }
}
