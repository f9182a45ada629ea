//! Handoff to the external pipeline engine.
//!
//! The assembled configuration is staged in a temporary JSON file and the
//! engine binary is invoked on it. This is the one blocking call of the
//! whole program: the engine runs the graph to completion and its exit
//! status is all we observe. No timeout, retry, or cancellation semantics
//! exist at this boundary.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use thiserror::Error;
use visarc_config::PipelineConfig;

/// Errors surfaced by the engine handoff.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The engine binary could not be found
    #[error("pipeline engine '{program}' not found (is it on PATH?)")]
    EngineMissing {
        /// The engine program that was looked up.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The engine binary was found but could not be launched
    #[error("failed to launch pipeline engine '{program}': {source}")]
    Launch {
        /// The engine program that failed to start.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Staging the configuration file failed
    #[error("failed to stage configuration file: {0}")]
    StageConfig(#[from] std::io::Error),

    /// Serializing the configuration failed
    #[error(transparent)]
    Config(#[from] visarc_config::ConfigError),
}

/// Invokes the external pipeline engine on an assembled configuration.
pub struct EngineRunner {
    program: PathBuf,
}

impl EngineRunner {
    /// A runner for the given engine binary (a bare name is resolved via
    /// PATH by the OS).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Hand the configuration to the engine and block until it exits.
    ///
    /// The temporary configuration file lives until the engine terminates.
    pub fn run(&self, config: &PipelineConfig) -> Result<ExitStatus, RunnerError> {
        let json = config.to_json()?;

        let mut file = tempfile::Builder::new()
            .prefix("visarc-")
            .suffix(".json")
            .tempfile()?;
        file.write_all(json.as_bytes())?;
        file.flush()?;

        tracing::debug!(config = %file.path().display(), "staged pipeline configuration");
        tracing::info!(engine = %self.program.display(), "starting pipeline engine");

        let status = Command::new(&self.program)
            .arg("-c")
            .arg(file.path())
            .status()
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    RunnerError::EngineMissing {
                        program: self.program.clone(),
                        source,
                    }
                } else {
                    RunnerError::Launch {
                        program: self.program.clone(),
                        source,
                    }
                }
            })?;

        tracing::info!(%status, "pipeline engine finished");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visarc_config::assemble_archive;

    fn config() -> PipelineConfig {
        assemble_archive("/in.raw", "/out.h5").unwrap()
    }

    #[test]
    fn missing_engine_is_distinct_error() {
        let runner = EngineRunner::new("definitely-not-a-real-engine-binary");
        let err = runner.run(&config()).unwrap_err();
        assert!(
            matches!(err, RunnerError::EngineMissing { .. }),
            "got: {err:?}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn successful_engine_reports_success() {
        // `true` ignores the -c argument and exits 0.
        let status = EngineRunner::new("true").run(&config()).unwrap();
        assert!(status.success());
    }

    #[cfg(unix)]
    #[test]
    fn failing_engine_reports_exit_code() {
        let status = EngineRunner::new("false").run(&config()).unwrap();
        assert!(!status.success());
        assert_eq!(status.code(), Some(1));
    }
}
