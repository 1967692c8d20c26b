use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EvasionError;

/// Broad grouping used by reports and by the registry's category lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Encoder,
    Command,
    Path,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::Encoder => "encoder",
            Category::Command => "command",
            Category::Path => "path",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stable identifier for one transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechniqueId {
    Base64,
    Hex,
    Octal,
    DecimalEntity,
    HexEntity,
    Url,
    Unicode,
    Utf8,
    Binary,
    BestFit,
    MixedCase,
    UnixCommand,
    WindowsCommand,
    PathTraversal,
}

impl TechniqueId {
    pub const ALL: [TechniqueId; 14] = [
        TechniqueId::Base64,
        TechniqueId::Hex,
        TechniqueId::Octal,
        TechniqueId::DecimalEntity,
        TechniqueId::HexEntity,
        TechniqueId::Url,
        TechniqueId::Unicode,
        TechniqueId::Utf8,
        TechniqueId::Binary,
        TechniqueId::BestFit,
        TechniqueId::MixedCase,
        TechniqueId::UnixCommand,
        TechniqueId::WindowsCommand,
        TechniqueId::PathTraversal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TechniqueId::Base64 => "base64",
            TechniqueId::Hex => "hex",
            TechniqueId::Octal => "octal",
            TechniqueId::DecimalEntity => "decimal_entity",
            TechniqueId::HexEntity => "hex_entity",
            TechniqueId::Url => "url",
            TechniqueId::Unicode => "unicode",
            TechniqueId::Utf8 => "utf8",
            TechniqueId::Binary => "binary",
            TechniqueId::BestFit => "best_fit",
            TechniqueId::MixedCase => "mixed_case",
            TechniqueId::UnixCommand => "unix_command",
            TechniqueId::WindowsCommand => "windows_command",
            TechniqueId::PathTraversal => "path_traversal",
        }
    }

    /// Every technique belongs to exactly one category.
    pub fn category(&self) -> Category {
        match self {
            TechniqueId::UnixCommand | TechniqueId::WindowsCommand => Category::Command,
            TechniqueId::PathTraversal => Category::Path,
            _ => Category::Encoder,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TechniqueId::Base64 => "Base64 with padding manipulation, URL-safe and chunked forms",
            TechniqueId::Hex => "Hex escapes: plain, backslash, brace, percent and concatenation forms",
            TechniqueId::Octal => "Octal escapes: plain, backslash, leading-zero and mixed radix",
            TechniqueId::DecimalEntity => "Decimal HTML entities with named entities, padding and fragmentation",
            TechniqueId::HexEntity => "Hex HTML entities with mixed radix and invalid padding",
            TechniqueId::Url => "Percent encoding: full, partial ratio, mixed case, double and triple",
            TechniqueId::Unicode => "Unicode escapes over whole code points, full and partial",
            TechniqueId::Utf8 => "UTF-8 byte encodings, overlong forms, BOM and malformed sequences",
            TechniqueId::Binary => "Per-byte binary representations",
            TechniqueId::BestFit => "Homoglyphs, zero-width, combining marks, bidi overrides and ligatures",
            TechniqueId::MixedCase => "Case variation: alternating, random, vowel/consonant, leetspeak, zebra",
            TechniqueId::UnixCommand => "POSIX shell spacing, quoting, globbing and substitution tricks",
            TechniqueId::WindowsCommand => "cmd.exe and PowerShell caret, quote and encoding tricks",
            TechniqueId::PathTraversal => "Separator, dot-segment, truncation and server normalization quirks",
        }
    }
}

impl fmt::Display for TechniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TechniqueId {
    type Err = EvasionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('-', "_");
        let id = match key.as_str() {
            "base64" | "b64" => TechniqueId::Base64,
            "hex" => TechniqueId::Hex,
            "octal" | "oct" => TechniqueId::Octal,
            "decimal_entity" | "decimal" | "html_decimal" => TechniqueId::DecimalEntity,
            "hex_entity" | "html_hex" => TechniqueId::HexEntity,
            "url" | "percent" | "urlencode" => TechniqueId::Url,
            "unicode" => TechniqueId::Unicode,
            "utf8" | "utf_8" => TechniqueId::Utf8,
            "binary" | "bin" => TechniqueId::Binary,
            "best_fit" | "bestfit" | "homograph" => TechniqueId::BestFit,
            "mixed_case" | "case" => TechniqueId::MixedCase,
            "unix_command" | "unix" => TechniqueId::UnixCommand,
            "windows_command" | "windows" => TechniqueId::WindowsCommand,
            "path_traversal" | "path" => TechniqueId::PathTraversal,
            _ => return Err(EvasionError::UnknownTechnique(s.to_string())),
        };
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_from_str() {
        for id in TechniqueId::ALL {
            assert_eq!(id.name().parse::<TechniqueId>().unwrap(), id);
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("homograph".parse::<TechniqueId>().unwrap(), TechniqueId::BestFit);
        assert_eq!("Path-Traversal".parse::<TechniqueId>().unwrap(), TechniqueId::PathTraversal);
    }

    #[test]
    fn test_unknown_technique_is_configuration_error() {
        let err = "rot13".parse::<TechniqueId>().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_categories() {
        assert_eq!(TechniqueId::Hex.category(), Category::Encoder);
        assert_eq!(TechniqueId::BestFit.category(), Category::Encoder);
        assert_eq!(TechniqueId::UnixCommand.category(), Category::Command);
        assert_eq!(TechniqueId::WindowsCommand.category(), Category::Command);
        assert_eq!(TechniqueId::PathTraversal.category(), Category::Path);
    }
}
