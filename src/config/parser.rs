use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// Extension lists are normalized (lower-cased, leading dot added) before
/// validation, so `png` and `.PNG` are equivalent in the file.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use site_mirror::config::load_config;
///
/// let config = load_config(Path::new("mirror.toml")).unwrap();
/// println!("Max depth: {}", config.crawler.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;

    normalize(&mut config);
    validate(&config)?;

    Ok(config)
}

/// Normalizes the extension lists of a configuration in place
pub fn normalize(config: &mut Config) {
    config.download.include_types = normalize_extensions(&config.download.include_types);
    config.download.exclude_types = normalize_extensions(&config.download.exclude_types);
}

/// Parses a comma-separated extension list such as `png,.jpg, .GIF`
pub fn parse_extension_list(list: &str) -> Vec<String> {
    list.split(',').filter_map(normalize_extension).collect()
}

fn normalize_extensions(list: &[String]) -> Vec<String> {
    list.iter().filter_map(|ext| normalize_extension(ext)).collect()
}

/// Lower-cases an extension and ensures it starts with a single dot
fn normalize_extension(ext: &str) -> Option<String> {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    Some(format!(".{}", trimmed.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverwritePolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
max-depth = 3
delay-ms = 250
follow-external = true

[http]
user-agent = "TestMirror/1.0"
timeout-secs = 20
tls-verify = false
cookies = "session=abc"

[http.headers]
"X-Token" = "secret"

[download]
workers = 8
retries = 2
overwrite = "resume"
max-file-size = 1048576
include-types = ["PNG", ".css"]

[output]
directory = "./mirror"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_depth, 3);
        assert_eq!(config.crawler.delay_ms, 250);
        assert!(config.crawler.follow_external);
        assert!(config.crawler.rewrite_page_links);
        assert_eq!(config.http.user_agent, "TestMirror/1.0");
        assert!(!config.http.tls_verify);
        assert_eq!(config.http.headers.get("X-Token").unwrap(), "secret");
        assert_eq!(config.download.workers, 8);
        assert_eq!(config.download.overwrite, OverwritePolicy::Resume);
        assert_eq!(config.download.max_file_size, Some(1_048_576));
        assert_eq!(config.download.include_types, vec![".png", ".css"]);
        assert_eq!(config.output.directory, std::path::PathBuf::from("./mirror"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let file = create_temp_config("");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_depth, 1);
        assert_eq!(config.download.workers, 5);
        assert_eq!(config.download.retries, 3);
        assert_eq!(config.download.overwrite, OverwritePolicy::Skip);
        assert!(config.http.tls_verify);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/mirror.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[download]\nworkers = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_parse_extension_list() {
        assert_eq!(
            parse_extension_list("png, .JPG,,gif "),
            vec![".png", ".jpg", ".gif"]
        );
        assert!(parse_extension_list("").is_empty());
    }
}
