//! Environment variable utilities
//!
//! Typed lookups with defaults, used by the configuration and logging layers.
//! Values are trimmed; blank values count as unset.
//!
//! # Usage
//!
//! ```ignore
//! use streamux_core::env::{env_get, env_get_bool};
//!
//! let chunk: usize = env_get("STREAMUX_READ_CHUNK", 8192);
//! let ansi: bool = env_get_bool("STREAMUX_LOG_ANSI", false);
//! ```

use std::str::FromStr;

use tracing::warn;

const TRUE_WORDS: [&str; 4] = ["1", "true", "yes", "on"];
const FALSE_WORDS: [&str; 4] = ["0", "false", "no", "off"];

/// Trimmed value of `key`; unset and blank both count as absent.
fn lookup(key: &str) -> Option<String> {
    let raw = std::env::var(key).ok()?;
    let value = raw.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parse `key` as `T`, falling back to `default` when absent.
///
/// A value that is present but does not parse is logged and ignored.
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    let Some(value) = lookup(key) else {
        return default;
    };
    match value.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(key, value = value.as_str(), "ignoring unparsable environment override");
            default
        }
    }
}

/// Boolean switch: `1/true/yes/on` or `0/false/no/off`, case-insensitive.
///
/// Anything else is logged and `default` is used.
pub fn env_get_bool(key: &str, default: bool) -> bool {
    let Some(value) = lookup(key) else {
        return default;
    };
    let word = value.to_ascii_lowercase();
    if TRUE_WORDS.contains(&word.as_str()) {
        true
    } else if FALSE_WORDS.contains(&word.as_str()) {
        false
    } else {
        warn!(key, value = value.as_str(), "ignoring non-boolean environment override");
        default
    }
}

/// String value of `key`, or `default` when unset or blank.
pub fn env_get_str(key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}
