use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Cross-section of a groove (and of the clip derived from it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangular,
    Circular,
    Square,
    #[serde(alias = "triangular")]
    Triangle,
}

impl ShapeKind {
    /// Menu order used for numeric selection (1-based).
    pub const ALL: [ShapeKind; 4] = [
        ShapeKind::Rectangular,
        ShapeKind::Circular,
        ShapeKind::Square,
        ShapeKind::Triangle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Rectangular => "rectangular",
            ShapeKind::Circular => "circular",
            ShapeKind::Square => "square",
            ShapeKind::Triangle => "triangle",
        }
    }

    /// Whether rotating the profile about its depth axis leaves it unchanged.
    pub fn is_rotationally_symmetric(self) -> bool {
        matches!(self, ShapeKind::Circular)
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A shape kind name or menu number that does not name one of the four profiles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported shape kind '{input}' (expected 1-4 or one of: rectangular, circular, square, triangle)")]
pub struct UnsupportedShapeKind {
    pub input: String,
}

impl FromStr for ShapeKind {
    type Err = UnsupportedShapeKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();

        if let Ok(number) = normalized.parse::<usize>() {
            return number
                .checked_sub(1)
                .and_then(|idx| Self::ALL.get(idx).copied())
                .ok_or(UnsupportedShapeKind {
                    input: s.to_string(),
                });
        }

        match normalized.as_str() {
            "rectangular" => Ok(ShapeKind::Rectangular),
            "circular" => Ok(ShapeKind::Circular),
            "square" => Ok(ShapeKind::Square),
            "triangle" | "triangular" => Ok(ShapeKind::Triangle),
            _ => Err(UnsupportedShapeKind {
                input: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Rectangular".parse::<ShapeKind>(), Ok(ShapeKind::Rectangular));
        assert_eq!(" circular ".parse::<ShapeKind>(), Ok(ShapeKind::Circular));
        assert_eq!("triangular".parse::<ShapeKind>(), Ok(ShapeKind::Triangle));
    }

    #[test]
    fn parses_menu_numbers() {
        assert_eq!("1".parse::<ShapeKind>(), Ok(ShapeKind::Rectangular));
        assert_eq!("3".parse::<ShapeKind>(), Ok(ShapeKind::Square));
        assert_eq!("4".parse::<ShapeKind>(), Ok(ShapeKind::Triangle));
    }

    #[test]
    fn rejects_unknown_kinds() {
        assert!("hexagon".parse::<ShapeKind>().is_err());
        assert!("0".parse::<ShapeKind>().is_err());
        assert!("5".parse::<ShapeKind>().is_err());
        let err = "u-slot".parse::<ShapeKind>().unwrap_err();
        assert_eq!(err.input, "u-slot");
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&ShapeKind::Square).unwrap();
        assert_eq!(json, "\"square\"");
        let kind: ShapeKind = serde_json::from_str("\"triangular\"").unwrap();
        assert_eq!(kind, ShapeKind::Triangle);
    }
}
