//! Miette diagnostic conversion for CLI errors.

use crate::error::CliError;
use miette::Report;

/// Convert a `CliError` into a miette report.
///
/// Transform errors already carry diagnostic codes and are reported as-is.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Transform(e) => Report::new(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        other => miette::miette!("{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use kiln_transform::TransformError;
    use miette::Diagnostic;
    use std::path::PathBuf;

    #[test]
    fn test_transform_error_keeps_code() {
        let err = CliError::Transform(TransformError::DuplicateOutput {
            name: "button".to_string(),
            file: PathBuf::from("b/button.css"),
            existing: PathBuf::from("a/button.css"),
        });
        let report = cli_error_to_miette(err);
        let code = report.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("kiln::transform::duplicate_output"));
    }

    #[test]
    fn test_config_error_message() {
        let err = CliError::Config(ConfigError::Invalid("bad value".to_string()));
        let report = cli_error_to_miette(err);
        assert!(report.to_string().contains("bad value"));
    }
}
