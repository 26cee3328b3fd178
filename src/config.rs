//! Environment-driven configuration

use crate::llm::LlmConfig;
use crate::runtime::RuntimeConfig;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;

/// Process configuration, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    pub llm: LlmConfig,
    pub runtime: RuntimeConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to
    /// their defaults with a warning.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = RuntimeConfig::default();
        Self {
            bind: parse_or(&lookup, "DOCSENSE_BIND", IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            port: parse_or(&lookup, "DOCSENSE_PORT", DEFAULT_PORT),
            llm: LlmConfig {
                gemini_api_key: lookup("GEMINI_API_KEY").or_else(|| lookup("GOOGLE_API_KEY")),
                gateway: lookup("LLM_GATEWAY"),
                default_model: lookup("DEFAULT_MODEL"),
            },
            runtime: RuntimeConfig {
                max_turns: parse_or(&lookup, "DOCSENSE_MAX_TURNS", defaults.max_turns).max(1),
                llm_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "DOCSENSE_LLM_TIMEOUT_SECS",
                    defaults.llm_timeout.as_secs(),
                )),
                tool_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "DOCSENSE_TOOL_TIMEOUT_SECS",
                    defaults.tool_timeout.as_secs(),
                )),
            },
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

fn parse_or<T: FromStr + Copy>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    if let Ok(value) = raw.trim().parse() {
        value
    } else {
        tracing::warn!(key, value = %raw, "Ignoring unparseable setting, using default");
        default
    }
}
