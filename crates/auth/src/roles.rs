use core::str::FromStr;

use serde::{Deserialize, Serialize};

use volunteerdesk_core::DomainError;

/// Role of a user. Persisted as a plain lowercase string.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Superadmin,
    Admin,
    #[default]
    Base,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Superadmin, Role::Admin, Role::Base];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Admin => "admin",
            Role::Base => "base",
        }
    }

    /// `admin` or `superadmin`.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Superadmin | Role::Admin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "superadmin" => Ok(Role::Superadmin),
            "admin" => Ok(Role::Admin),
            "base" => Ok(Role::Base),
            other => Err(DomainError::validation(
                "role",
                format!("'{other}' is not one of superadmin, admin, base"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_persisted_strings() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Role::Superadmin).unwrap(), "\"superadmin\"");
        let role: Role = serde_json::from_str("\"base\"").unwrap();
        assert_eq!(role, Role::Base);
    }
}
