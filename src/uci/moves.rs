//! Moves in UCI long algebraic notation (`e2e4`, `a7a8q`).

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Error produced when text cannot be read as a [`UciMove`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveParseError {
    #[error("move '{0}' is too short, expected at least 4 characters")]
    TooShort(String),
    #[error("move '{0}' contains non-ASCII characters")]
    NotAscii(String),
}

/// A move as it travels over the protocol: origin, destination and an
/// optional promotion piece. No legality is implied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UciMove {
    from: String,
    to: String,
    promotion: Option<char>,
}

impl UciMove {
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>, promotion: Option<char>) -> Self {
        UciMove {
            from: from.into(),
            to: to.into(),
            promotion,
        }
    }

    #[must_use]
    pub fn from_square(&self) -> &str {
        &self.from
    }

    #[must_use]
    pub fn to_square(&self) -> &str {
        &self.to
    }

    #[must_use]
    pub fn promotion(&self) -> Option<char> {
        self.promotion
    }
}

impl FromStr for UciMove {
    type Err = MoveParseError;

    /// Characters after the promotion piece are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_ascii() {
            return Err(MoveParseError::NotAscii(s.to_string()));
        }
        if s.len() < 4 {
            return Err(MoveParseError::TooShort(s.to_string()));
        }
        Ok(UciMove {
            from: s[0..2].to_string(),
            to: s[2..4].to_string(),
            promotion: s[4..].chars().next(),
        })
    }
}

impl fmt::Display for UciMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(piece) = self.promotion {
            write!(f, "{piece}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_plain_move() {
        let mv: UciMove = "e2e4".parse().expect("valid move");
        assert_eq!(mv.from_square(), "e2");
        assert_eq!(mv.to_square(), "e4");
        assert_eq!(mv.promotion(), None);
        assert_eq!(mv.to_string(), "e2e4");
    }

    #[test]
    fn test_parse_promotion() {
        let mv: UciMove = "a7a8q".parse().expect("valid move");
        assert_eq!(mv.promotion(), Some('q'));
        assert_eq!(mv.to_string(), "a7a8q");
    }

    #[test]
    fn test_short_text_is_rejected() {
        assert_eq!(
            "e2e".parse::<UciMove>(),
            Err(MoveParseError::TooShort("e2e".to_string()))
        );
        assert!("".parse::<UciMove>().is_err());
    }

    #[test]
    fn test_non_ascii_is_rejected() {
        assert!(matches!(
            "é2e4".parse::<UciMove>(),
            Err(MoveParseError::NotAscii(_))
        ));
    }

    #[test]
    fn test_equality_and_hash_use_all_fields() {
        let plain = UciMove::new("a7", "a8", None);
        let queen = UciMove::new("a7", "a8", Some('q'));
        assert_ne!(plain, queen);
        assert_eq!(queen, "a7a8q".parse().expect("valid move"));

        let set: HashSet<UciMove> = [plain.clone(), queen.clone(), queen].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_json() {
        let mv: UciMove = "g7g8n".parse().expect("valid move");
        let json = serde_json::to_string(&mv).expect("serialize");
        let back: UciMove = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, mv);
    }
}
