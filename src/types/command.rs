//! Command string helpers and cache keys.
//!
//! Commands are free-form strings such as `"analyze src"` or
//! `"/user:test auth"`. Only two pieces are interpreted here: the
//! *type* (leading token) used to pick a group strategy, and the
//! *target* (second token) used by the combine strategy.

use std::fmt;

/// Prefix stripped from the leading token (`/user:analyze` → `analyze`).
pub const USER_PREFIX: &str = "/user:";

/// Type reported for a command with no leading token.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Target reported for a command with no second token.
pub const DEFAULT_TARGET: &str = ".";

/// The command type: leading token with any `/user:` prefix removed.
pub fn command_type(command: &str) -> &str {
    match command.split_whitespace().next() {
        Some(head) => {
            let head = head.strip_prefix(USER_PREFIX).unwrap_or(head);
            if head.is_empty() { UNKNOWN_TYPE } else { head }
        }
        None => UNKNOWN_TYPE,
    }
}

/// The command target: second token, or `"."` when absent.
pub fn command_target(command: &str) -> &str {
    command.split_whitespace().nth(1).unwrap_or(DEFAULT_TARGET)
}

/// Cache key identifying a `(session, command)` pair.
///
/// Kept as two fields rather than a concatenated string so that
/// `("a:b", "c")` and `("a", "b:c")` never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub session_id: String,
    pub command: String,
}

impl CacheKey {
    pub fn new(session_id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            command: command.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.session_id, self.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_is_leading_token() {
        assert_eq!(command_type("build A"), "build");
        assert_eq!(command_type("analyze"), "analyze");
        assert_eq!(command_type("  test   auth  "), "test");
    }

    #[test]
    fn type_strips_user_prefix() {
        assert_eq!(command_type("/user:analyze src"), "analyze");
        assert_eq!(command_type("/user:"), UNKNOWN_TYPE);
    }

    #[test]
    fn empty_command_is_unknown() {
        assert_eq!(command_type(""), UNKNOWN_TYPE);
        assert_eq!(command_type("   "), UNKNOWN_TYPE);
    }

    #[test]
    fn target_is_second_token() {
        assert_eq!(command_target("analyze src --deep"), "src");
        assert_eq!(command_target("analyze"), DEFAULT_TARGET);
        assert_eq!(command_target(""), DEFAULT_TARGET);
    }

    #[test]
    fn cache_keys_do_not_collide_on_separator() {
        let a = CacheKey::new("a:b", "c");
        let b = CacheKey::new("a", "b:c");
        assert_ne!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }
}
