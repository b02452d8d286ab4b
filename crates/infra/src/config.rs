//! Runtime settings loaded from the environment (and `.env`, when present).

use thiserror::Error;

pub const DEFAULT_SECRETARIAT_AREA: &str = "segreteria";
pub const DEFAULT_DOCUMENT_MAX_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_TODO_OVERDUE_DAYS: i64 = 7;
pub const DEFAULT_IMPORT_MAX_ROWS: usize = 1000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Code of the work area whose admins manage documents.
    pub secretariat_area: String,
    pub document_max_bytes: u64,
    pub todo_overdue_days: i64,
    pub import_max_rows: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            secretariat_area: DEFAULT_SECRETARIAT_AREA.to_string(),
            document_max_bytes: DEFAULT_DOCUMENT_MAX_BYTES,
            todo_overdue_days: DEFAULT_TODO_OVERDUE_DAYS,
            import_max_rows: DEFAULT_IMPORT_MAX_ROWS,
        }
    }
}

impl Settings {
    /// Load `.env` (if any) and read `VOLUNTEERDESK_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; unset keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let secretariat_area = match lookup("VOLUNTEERDESK_SECRETARIAT_AREA") {
            Some(code) => {
                let code = code.trim().to_string();
                if code.is_empty() {
                    return Err(ConfigError::Invalid {
                        key: "VOLUNTEERDESK_SECRETARIAT_AREA",
                        message: "must not be empty".to_string(),
                    });
                }
                code
            }
            None => defaults.secretariat_area,
        };

        let document_max_bytes =
            parse_or(&lookup, "VOLUNTEERDESK_DOCUMENT_MAX_BYTES", defaults.document_max_bytes)?;
        let todo_overdue_days =
            parse_or(&lookup, "VOLUNTEERDESK_TODO_OVERDUE_DAYS", defaults.todo_overdue_days)?;
        if todo_overdue_days < 0 {
            return Err(ConfigError::Invalid {
                key: "VOLUNTEERDESK_TODO_OVERDUE_DAYS",
                message: "must not be negative".to_string(),
            });
        }
        let import_max_rows =
            parse_or(&lookup, "VOLUNTEERDESK_IMPORT_MAX_ROWS", defaults.import_max_rows)?;

        Ok(Self {
            secretariat_area,
            document_max_bytes,
            todo_overdue_days,
            import_max_rows,
        })
    }

    pub fn todo_overdue_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.todo_overdue_days)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}
