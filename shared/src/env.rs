/// Loads variables from a `.env` file in the working directory, if any.
pub fn init() {
    if dotenv::dotenv().is_ok() {
        log::debug!("Loaded environment from .env");
    }
}

/// Reads an environment variable, treating empty values as unset.
pub fn var(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}
