//! The `check` command: validate configuration and credentials

use std::path::PathBuf;

use tablesmith_core::AppConfig;

use crate::error::CliError;

/// Arguments for the `check` command
pub struct CheckArgs {
    /// Configuration file
    pub config: Option<PathBuf>,
}

/// Handle the `check` command
///
/// Fails when the API key cannot be resolved, so it can gate scripts.
pub fn handle_check(args: &CheckArgs) -> Result<(), CliError> {
    let config = AppConfig::load_or_default(args.config.as_deref())?;
    let api_key = config.llm.resolve_api_key();

    print!("{}", describe(&config, api_key.is_ok()));

    api_key.map(|_| ()).map_err(CliError::from)
}

fn describe(config: &AppConfig, has_key: bool) -> String {
    let key_status = if has_key {
        "found".to_string()
    } else {
        format!("missing (set {})", config.llm.api_key_env)
    };

    format!(
        "LLM\n\
         \x20 Model:        {}\n\
         \x20 Endpoint:     {}\n\
         \x20 API key:      {key_status}\n\
         \x20 Timeout:      {}s\n\
         \x20 Temperature:  {}\n\
         Pipeline\n\
         \x20 Sample size:  {}\n\
         \x20 Preview rows: {}\n\
         \x20 Step timeout: {}s\n\
         \x20 Max retries:  {}\n",
        config.llm.model,
        config.llm.base_url,
        config.llm.timeout_seconds,
        config.llm.temperature,
        config.pipeline.sample_size,
        config.pipeline.preview_limit,
        config.pipeline.step_timeout_secs,
        config.pipeline.max_retries,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_describe_never_prints_key() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("secret-key".to_string());
        let output = describe(&config, true);
        assert!(output.contains("API key:      found"));
        assert!(!output.contains("secret-key"));
    }

    #[test]
    fn test_describe_missing_key() {
        let config = AppConfig::default();
        let output = describe(&config, false);
        assert!(output.contains("missing (set GEMINI_API_KEY)"));
        assert!(output.contains("Preview rows: 10"));
    }

    #[test]
    fn test_check_with_key_in_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[llm]\napi_key = \"from-file\"").unwrap();
        let args = CheckArgs {
            config: Some(file.path().to_path_buf()),
        };
        assert!(handle_check(&args).is_ok());
    }
}
