//! Small env-var parsing helpers shared by every `*Config::from_env`.

use medi_core::MediatorError;

pub fn var_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, MediatorError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| MediatorError::config(format!("{key}: cannot parse {raw:?}"))),
        Err(_) => Ok(default),
    }
}

pub fn var_opt<T: std::str::FromStr>(key: &str) -> Result<Option<T>, MediatorError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| MediatorError::config(format!("{key}: cannot parse {raw:?}"))),
        Err(_) => Ok(None),
    }
}

pub fn var_string_or(key: &str, default: impl Into<String>) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}
