//! Server configuration: defaults, then environment variables, then CLI flags.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_HTTP_PORT: &str = "CREWDASH_HTTP_PORT";
pub const ENV_BIND: &str = "CREWDASH_BIND";
pub const ENV_SEED_FILE: &str = "CREWDASH_SEED_FILE";
pub const ENV_SESSION_TTL: &str = "CREWDASH_SESSION_TTL_SECS";

pub const USAGE: &str = "crewdash Server\n\nUSAGE:\n  crewdash_server [--http-port N] [--bind ADDR] [--seed-file PATH] [--session-ttl SECS]\n\nOPTIONS:\n  --http-port N        HTTP API port (env: CREWDASH_HTTP_PORT, default 7979)\n  --bind ADDR          Listen address (env: CREWDASH_BIND, default 127.0.0.1)\n  --seed-file PATH     JSON seed with memberships and API tokens (env: CREWDASH_SEED_FILE)\n  --session-ttl SECS   Lifetime of issued sessions (env: CREWDASH_SESSION_TTL_SECS, default 3600)\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub http_port: u16,
    pub bind: IpAddr,
    pub seed_file: Option<PathBuf>,
    pub session_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 7979,
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            seed_file: None,
            session_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl ServerConfig {
    pub fn from_env_and_args(args: &[String]) -> Self {
        Self::from_sources(args, |name| std::env::var(name).ok())
    }

    /// `env` is injected so tests never touch the process environment.
    pub fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let env_port = env(ENV_HTTP_PORT).and_then(|v| v.parse::<u16>().ok());
        let env_bind = env(ENV_BIND).and_then(|v| v.parse::<IpAddr>().ok());
        let env_seed = env(ENV_SEED_FILE).filter(|v| !v.trim().is_empty()).map(PathBuf::from);
        let env_ttl = env(ENV_SESSION_TTL).and_then(|v| v.parse::<u64>().ok());

        let arg_port = arg_value(args, "--http-port").and_then(|v| v.parse::<u16>().ok());
        let arg_bind = arg_value(args, "--bind").and_then(|v| v.parse::<IpAddr>().ok());
        let arg_seed = arg_value(args, "--seed-file").map(PathBuf::from);
        let arg_ttl = arg_value(args, "--session-ttl").and_then(|v| v.parse::<u64>().ok());

        Self {
            http_port: arg_port.or(env_port).unwrap_or(d.http_port),
            bind: arg_bind.or(env_bind).unwrap_or(d.bind),
            seed_file: arg_seed.or(env_seed),
            session_ttl: arg_ttl.or(env_ttl).map(Duration::from_secs).unwrap_or(d.session_ttl),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.bind, self.http_port) }
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let i = args.iter().position(|a| a == flag)?;
    args.get(i + 1).map(|s| s.as_str()).filter(|s| !s.starts_with("--"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(v: &[&str]) -> Vec<String> { v.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn defaults_without_env_or_args() {
        let c = ServerConfig::from_sources(&[], |_| None);
        assert_eq!(c, ServerConfig::default());
        assert_eq!(c.socket_addr().to_string(), "127.0.0.1:7979");
    }

    #[test]
    fn env_overrides_defaults_and_args_override_env() {
        let env: HashMap<&str, &str> = [
            (ENV_HTTP_PORT, "8080"),
            (ENV_BIND, "0.0.0.0"),
            (ENV_SEED_FILE, "/etc/crewdash/seed.json"),
            (ENV_SESSION_TTL, "60"),
        ].into_iter().collect();
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());

        let c = ServerConfig::from_sources(&[], lookup);
        assert_eq!(c.http_port, 8080);
        assert_eq!(c.bind.to_string(), "0.0.0.0");
        assert_eq!(c.seed_file.as_deref(), Some(std::path::Path::new("/etc/crewdash/seed.json")));
        assert_eq!(c.session_ttl, Duration::from_secs(60));

        let c = ServerConfig::from_sources(&args(&["bin", "--http-port", "9000", "--session-ttl", "5"]), lookup);
        assert_eq!(c.http_port, 9000);
        assert_eq!(c.session_ttl, Duration::from_secs(5));
        assert_eq!(c.bind.to_string(), "0.0.0.0");
    }

    #[test]
    fn unparsable_values_fall_back() {
        let c = ServerConfig::from_sources(&args(&["bin", "--http-port", "abc", "--seed-file"]), |k| {
            (k == ENV_HTTP_PORT).then(|| "99999".to_string())
        });
        assert_eq!(c.http_port, 7979);
        assert!(c.seed_file.is_none());
    }
}
