//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::MedregConfig;
use crate::config::secret_string;
use crate::domain::errors::MedregError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into MedregConfig
/// 4. Applies environment variable overrides (MEDREG_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use medreg::config::load_config;
///
/// let config = load_config("medreg.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<MedregConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MedregError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        MedregError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    // Perform environment variable substitution
    let contents = substitute_env_vars(&contents)?;

    // Parse TOML
    let mut config: MedregConfig = toml::from_str(&contents)
        .map_err(|e| MedregError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    // Apply environment variable overrides
    apply_env_overrides(&mut config);

    // Validate configuration
    config.validate().map_err(|e| {
        MedregError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    // Process line by line to skip comments
    for line in input.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(MedregError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the MEDREG_* prefix
///
/// Environment variables follow the pattern: MEDREG_<SECTION>_<KEY>
/// For example: MEDREG_REGISTRY_BASE_URL, MEDREG_INGEST_PERIOD
fn apply_env_overrides(config: &mut MedregConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("MEDREG_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Registry overrides
    if let Ok(val) = std::env::var("MEDREG_REGISTRY_BASE_URL") {
        config.registry.base_url = val;
    }
    if let Ok(val) = std::env::var("MEDREG_REGISTRY_API_KEY") {
        config.registry.api_key = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("MEDREG_REGISTRY_TLS_VERIFY") {
        config.registry.tls_verify = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("MEDREG_REGISTRY_TIMEOUT_SECONDS") {
        if let Ok(secs) = val.parse() {
            config.registry.timeout_seconds = secs;
        }
    }
    if let Ok(val) = std::env::var("MEDREG_REGISTRY_MAX_RETRIES") {
        if let Ok(retries) = val.parse() {
            config.registry.retry.max_retries = retries;
        }
    }

    // Ingest overrides
    if let Ok(val) = std::env::var("MEDREG_INGEST_PERIOD") {
        config.ingest.period = val;
    }
    if let Ok(val) = std::env::var("MEDREG_INGEST_DOCUMENT_TYPE") {
        config.ingest.document_type = val;
    }
    if let Ok(val) = std::env::var("MEDREG_INGEST_ITEM_LIMIT") {
        if let Ok(limit) = val.parse() {
            config.ingest.item_limit = Some(limit);
        }
    }
    if let Ok(val) = std::env::var("MEDREG_INGEST_PAGE_SIZE") {
        if let Ok(size) = val.parse() {
            config.ingest.page_size = size;
        }
    }
    if let Ok(val) = std::env::var("MEDREG_INGEST_PARALLEL_ITEMS") {
        if let Ok(parallel) = val.parse() {
            config.ingest.parallel_items = parallel;
        }
    }

    // PostgreSQL overrides
    if let Ok(val) = std::env::var("MEDREG_POSTGRESQL_CONNECTION_STRING") {
        config.postgresql.connection_string = secret_string(val);
    }
    if let Ok(val) = std::env::var("MEDREG_POSTGRESQL_MAX_CONNECTIONS") {
        if let Ok(max) = val.parse() {
            config.postgresql.max_connections = max;
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("MEDREG_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("MEDREG_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("MEDREG_TEST_VAR", "test_value");
        let input = "api_key = \"${MEDREG_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "api_key = \"test_value\"\n");
        std::env::remove_var("MEDREG_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("MEDREG_MISSING_VAR");
        let input = "api_key = \"${MEDREG_MISSING_VAR}\"";
        let result = substitute_env_vars(input);
        assert!(result.is_err());
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        std::env::remove_var("MEDREG_COMMENTED_VAR");
        let input = "# api_key = \"${MEDREG_COMMENTED_VAR}\"";
        let result = substitute_env_vars(input);
        assert!(result.is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "info"

[registry]
base_url = "https://registry.example.com/dlp/v1"

[ingest]
period = "2025.07"
document_type = "spc"

[postgresql]
connection_string = "postgresql://medreg:pw@localhost:5432/medreg"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_ok());

        let config = result.unwrap();
        assert_eq!(config.registry.base_url, "https://registry.example.com/dlp/v1");
        assert_eq!(config.ingest.period, "2025.07");
    }
}
