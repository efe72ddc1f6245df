//! Environment configuration

use di::{inject, injectable};
use std::env;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://study-assistant.db?mode=rwc";
pub const DEFAULT_AUTH_URL: &str = "http://localhost:54321/auth/v1";
pub const DEFAULT_FUNCTIONS_URL: &str = "http://localhost:54321/functions/v1";
pub const DEFAULT_CHAT_FUNCTION: &str = "study-chat";
pub const DEFAULT_TRANSCRIBE_FUNCTION: &str = "transcribe-audio";
pub const DEFAULT_RECORD_COMMAND: &str = "arecord -q -f S16_LE -r 16000 -c 1 -t wav -";

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub auth_url: String,
    pub functions_url: String,
    pub api_key: Option<String>,
    pub chat_function: String,
    pub transcribe_function: String,
    pub record_command: String,
}

#[injectable]
impl Settings {
    #[inject]
    pub fn create() -> Settings {
        dotenvy::dotenv().ok();
        Settings::from_env()
    }
}

impl Settings {
    /// Reads settings from the process environment. Unset or blank variables use defaults.
    pub fn from_env() -> Settings {
        Settings {
            database_url: var_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            auth_url: var_or("STUDY_AUTH_URL", DEFAULT_AUTH_URL),
            functions_url: var_or("STUDY_FUNCTIONS_URL", DEFAULT_FUNCTIONS_URL),
            api_key: non_blank_var("STUDY_API_KEY"),
            chat_function: var_or("STUDY_CHAT_FUNCTION", DEFAULT_CHAT_FUNCTION),
            transcribe_function: var_or("STUDY_TRANSCRIBE_FUNCTION", DEFAULT_TRANSCRIBE_FUNCTION),
            record_command: var_or("STUDY_RECORD_COMMAND", DEFAULT_RECORD_COMMAND),
        }
    }
}

fn non_blank_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    non_blank_var(key).unwrap_or_else(|| default.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // SAFETY (all tests): env mutation is confined to #[serial] tests.
    fn clear_all() {
        for key in [
            "DATABASE_URL",
            "STUDY_AUTH_URL",
            "STUDY_FUNCTIONS_URL",
            "STUDY_API_KEY",
            "STUDY_CHAT_FUNCTION",
            "STUDY_TRANSCRIBE_FUNCTION",
            "STUDY_RECORD_COMMAND",
        ] {
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults_when_unset() {
        clear_all();

        let settings = Settings::from_env();
        assert_eq!(settings.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(settings.functions_url, DEFAULT_FUNCTIONS_URL);
        assert_eq!(settings.chat_function, DEFAULT_CHAT_FUNCTION);
        assert!(settings.api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_overrides_and_blank_values() {
        clear_all();
        unsafe {
            env::set_var("STUDY_FUNCTIONS_URL", "https://example.test/functions/v1");
            env::set_var("STUDY_API_KEY", "  anon-key ");
            env::set_var("STUDY_CHAT_FUNCTION", "   ");
        }

        let settings = Settings::from_env();
        assert_eq!(settings.functions_url, "https://example.test/functions/v1");
        assert_eq!(settings.api_key.as_deref(), Some("anon-key"));
        assert_eq!(settings.chat_function, DEFAULT_CHAT_FUNCTION);

        clear_all();
    }
}
