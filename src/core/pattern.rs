//! # Topic pattern matching.
//!
//! A pattern ending with [`WILDCARD`] matches every topic that starts with the
//! text before it; any other pattern matches only the identical topic.
//!
//! ```text
//! "user.*"  matches  "user.create", "user.delete", "user."
//! "user.*"  rejects  "username", "order.user"
//! "user"    matches  "user" only
//! ```
//!
//! Only a single trailing wildcard is recognised. A `*` anywhere else is a
//! literal character.

/// Trailing wildcard marker.
pub const WILDCARD: char = '*';

/// Returns `true` if `topic` is matched by `pattern`.
///
/// # Example
/// ```
/// use eventvisor::topic_matches;
///
/// assert!(topic_matches("user.*", "user.create"));
/// assert!(!topic_matches("user.*", "username"));
/// assert!(topic_matches("user.create", "user.create"));
/// ```
#[inline]
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    match pattern.strip_suffix(WILDCARD) {
        Some(prefix) => topic.starts_with(prefix),
        None => pattern == topic,
    }
}
