use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EvasionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttackType {
    Xss,
    Sqli,
    UnixCommandInjection,
    WindowsCommandInjection,
    PathTraversal,
    FileAccess,
    LdapInjection,
    Ssrf,
    Xxe,
    Generic,
    All,
}

impl AttackType {
    pub const ALL: [AttackType; 11] = [
        AttackType::Xss,
        AttackType::Sqli,
        AttackType::UnixCommandInjection,
        AttackType::WindowsCommandInjection,
        AttackType::PathTraversal,
        AttackType::FileAccess,
        AttackType::LdapInjection,
        AttackType::Ssrf,
        AttackType::Xxe,
        AttackType::Generic,
        AttackType::All,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AttackType::Xss => "xss",
            AttackType::Sqli => "sqli",
            AttackType::UnixCommandInjection => "unix-command-injection",
            AttackType::WindowsCommandInjection => "windows-command-injection",
            AttackType::PathTraversal => "path-traversal",
            AttackType::FileAccess => "file-access",
            AttackType::LdapInjection => "ldap-injection",
            AttackType::Ssrf => "ssrf",
            AttackType::Xxe => "xxe",
            AttackType::Generic => "generic",
            AttackType::All => "all",
        }
    }
}

impl Default for AttackType {
    fn default() -> Self {
        AttackType::Generic
    }
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AttackType {
    type Err = EvasionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('_', "-");
        let attack = match key.as_str() {
            "xss" => AttackType::Xss,
            "sqli" | "sql-injection" => AttackType::Sqli,
            "unix-command-injection" | "cmd-unix" | "unix-cmd" => AttackType::UnixCommandInjection,
            "windows-command-injection" | "cmd-windows" | "windows-cmd" => {
                AttackType::WindowsCommandInjection
            }
            "path-traversal" | "lfi" => AttackType::PathTraversal,
            "file-access" => AttackType::FileAccess,
            "ldap-injection" | "ldap" => AttackType::LdapInjection,
            "ssrf" => AttackType::Ssrf,
            "xxe" => AttackType::Xxe,
            "generic" => AttackType::Generic,
            "all" => AttackType::All,
            _ => return Err(EvasionError::UnknownAttackType(s.to_string())),
        };
        Ok(attack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_names() {
        for attack in AttackType::ALL {
            assert_eq!(attack.name().parse::<AttackType>().unwrap(), attack);
        }
    }

    #[test]
    fn test_parse_underscore_alias() {
        assert_eq!(
            "unix_command_injection".parse::<AttackType>().unwrap(),
            AttackType::UnixCommandInjection
        );
    }

    #[test]
    fn test_parse_unknown() {
        assert!(matches!(
            "csrf".parse::<AttackType>(),
            Err(EvasionError::UnknownAttackType(name)) if name == "csrf"
        ));
    }
}
