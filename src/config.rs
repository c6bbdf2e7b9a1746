//! Server configuration
//!
//! Bind address comes from the first command-line argument,
//! the line length limit from `ROOM_CHAT_MAX_LINE`.

use tracing::warn;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:1337";

/// Default maximum inbound line length in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 2048;

/// Environment variable overriding the line length limit
pub const MAX_LINE_ENV: &str = "ROOM_CHAT_MAX_LINE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub bind_addr: String,
    /// Longest accepted inbound line, newline excluded
    pub max_line_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl ServerConfig {
    /// Load from process arguments and environment
    pub fn from_env() -> Self {
        Self::from_parts(
            std::env::args().nth(1),
            std::env::var(MAX_LINE_ENV).ok(),
        )
    }

    /// Build from an optional address and an optional raw line limit
    ///
    /// Unparseable or zero limits fall back to the default.
    pub fn from_parts(bind_addr: Option<String>, max_line: Option<String>) -> Self {
        let defaults = Self::default();

        let max_line_length = match max_line {
            None => defaults.max_line_length,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    warn!(
                        "Invalid {} value '{}', using {}",
                        MAX_LINE_ENV, raw, defaults.max_line_length
                    );
                    defaults.max_line_length
                }
            },
        };

        Self {
            bind_addr: bind_addr.unwrap_or(defaults.bind_addr),
            max_line_length,
        }
    }
}
