//! Shared CLI helpers for workspace tools.

use std::fs;
use std::path::Path;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{Error, Result};

pub fn setup_cli_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logger: {e}")))?;

    Ok(())
}

/// Creates the run directory if it is absent. Calling this twice with
/// the same path is a no-op.
pub fn prepare_run_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(Error::Io)
}

/// Writes the verbatim invoking command line to `command.sh` inside the
/// run directory, overwriting any previous content.
pub fn record_command(dir: &Path, argv: &[String]) -> Result<()> {
    let mut line = argv.join(" ");
    line.push('\n');
    fs::write(dir.join("command.sh"), line).map_err(Error::Io)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_run_dir_is_idempotent() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let run_dir = temp_dir.path().join("run");

        prepare_run_dir(&run_dir).unwrap();
        assert!(run_dir.is_dir());
        prepare_run_dir(&run_dir).unwrap();
        assert!(run_dir.is_dir());
    }

    #[test]
    fn test_record_command_writes_argv_line() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let argv = vec![
            "train".to_string(),
            "--dir=weights".to_string(),
            "--epochs=3".to_string(),
        ];

        record_command(temp_dir.path(), &argv).unwrap();
        let content = fs::read_to_string(temp_dir.path().join("command.sh")).unwrap();
        assert_eq!(content, "train --dir=weights --epochs=3\n");
    }

    #[test]
    fn test_record_command_overwrites_previous_content() {
        let temp_dir = tempfile::TempDir::new().unwrap();

        record_command(temp_dir.path(), &["train".into(), "--epochs=1".into()]).unwrap();
        record_command(temp_dir.path(), &["train".into(), "--epochs=2".into()]).unwrap();

        let content = fs::read_to_string(temp_dir.path().join("command.sh")).unwrap();
        assert_eq!(content, "train --epochs=2\n");
    }
}
