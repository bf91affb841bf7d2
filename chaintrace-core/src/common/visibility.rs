//! Java member visibility.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared access level of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Public,
    Private,
    Protected,
    /// No access modifier (package-private).
    #[default]
    Package,
}

impl Visibility {
    /// Derives visibility from modifier keywords as written in source.
    ///
    /// Members of interfaces are implicitly public unless marked private,
    /// so callers pass `implicit_public = true` for them.
    pub fn from_modifiers<'a>(
        modifiers: impl IntoIterator<Item = &'a str>,
        implicit_public: bool,
    ) -> Self {
        let mut visibility = None;
        for m in modifiers {
            match m {
                "public" => visibility = Some(Self::Public),
                "private" => visibility = Some(Self::Private),
                "protected" => visibility = Some(Self::Protected),
                _ => {}
            }
        }
        match visibility {
            Some(v) => v,
            None if implicit_public => Self::Public,
            None => Self::Package,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Protected => "protected",
            Self::Package => "package",
        }
    }

    pub fn is_public(self) -> bool {
        self == Self::Public
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let upper = match self {
            Self::Public => "PUBLIC",
            Self::Private => "PRIVATE",
            Self::Protected => "PROTECTED",
            Self::Package => "PACKAGE",
        };
        f.write_str(upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_public() {
        assert_eq!(
            Visibility::from_modifiers(["public", "static"], false),
            Visibility::Public
        );
    }

    #[test]
    fn test_visibility_private_in_interface() {
        assert_eq!(
            Visibility::from_modifiers(["private"], true),
            Visibility::Private
        );
    }

    #[test]
    fn test_visibility_interface_default_public() {
        assert_eq!(
            Visibility::from_modifiers(["default"], true),
            Visibility::Public
        );
    }

    #[test]
    fn test_visibility_package_private() {
        assert_eq!(
            Visibility::from_modifiers(["final"], false),
            Visibility::Package
        );
        assert_eq!(Visibility::Package.as_str(), "package");
        assert_eq!(Visibility::Package.to_string(), "PACKAGE");
    }
}
