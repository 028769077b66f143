//! Basic type definitions for the chat server
//!
//! Provides the `UserName` newtype used as the registry key. Names are
//! decoded from the fixed-size identity frame a client sends right after
//! connecting.

/// Size in bytes of the identity handshake frame
pub const HANDSHAKE_LEN: usize = 16;

/// Display name of a connected user (newtype pattern)
///
/// The registry key: at most one connected client per name at any time.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserName(String);

impl UserName {
    /// Create a UserName from a string
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Decode the requested name from the identity handshake frame
    ///
    /// NUL padding bytes are stripped from both ends; the remainder is
    /// interpreted as UTF-8, lossily, so a client sending arbitrary
    /// bytes still ends up with some name.
    pub fn from_handshake(frame: &[u8; HANDSHAKE_LEN]) -> Self {
        let start = frame.iter().position(|b| *b != 0).unwrap_or(frame.len());
        let end = frame.iter().rposition(|b| *b != 0).map_or(start, |i| i + 1);
        Self(String::from_utf8_lossy(&frame[start..end]).into_owned())
    }

    /// View the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_strips_padding() {
        let mut frame = [0u8; HANDSHAKE_LEN];
        frame[..5].copy_from_slice(b"alice");
        assert_eq!(UserName::from_handshake(&frame).as_str(), "alice");
    }

    #[test]
    fn test_handshake_full_frame() {
        let frame = *b"sixteen__chars__";
        assert_eq!(
            UserName::from_handshake(&frame).as_str(),
            "sixteen__chars__"
        );
    }

    #[test]
    fn test_handshake_all_padding() {
        let frame = [0u8; HANDSHAKE_LEN];
        assert_eq!(UserName::from_handshake(&frame).as_str(), "");
    }

    #[test]
    fn test_handshake_invalid_utf8_is_lossy() {
        let mut frame = [0u8; HANDSHAKE_LEN];
        frame[0] = 0xFF;
        frame[1] = b'x';
        let name = UserName::from_handshake(&frame);
        assert!(name.as_str().ends_with('x'));
    }

    #[test]
    fn test_names_compare_by_value() {
        assert_eq!(UserName::new("bob"), UserName::new("bob"));
        assert_ne!(UserName::new("bob"), UserName::new("Bob"));
    }
}
