//! # External Optimizer Invocation
//!
//! Esegue il tool di ottimizzazione esterno (`optimize-images`) su un singolo file.
//!
//! ## Responsabilità:
//! - Risoluzione del path del tool tramite `ToolPathResolver`
//! - Esecuzione con timeout; il processo viene terminato allo scadere
//! - Controllo dell'exit status: un fallimento diventa `TransformFailed`
//!   con lo stderr del tool, un tool mancante diventa `MissingDependency`

use crate::asset::planner::OptimizeCommand;
use crate::config::Config;
use crate::error::{Result, WaoError};
use crate::tool_resolver::ToolPathResolver;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Handle on the external image optimizer
#[derive(Debug, Clone)]
pub struct ExternalOptimizer {
    program: PathBuf,
    timeout: Duration,
}

impl ExternalOptimizer {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Resolves the configured tool; an unresolved name is kept as-is and
    /// reported as missing when first run
    pub fn from_config(config: &Config) -> Self {
        let program = ToolPathResolver::new()
            .resolve_tool(&config.optimizer_tool)
            .unwrap_or_else(|| PathBuf::from(&config.optimizer_tool));
        Self::new(program, Duration::from_secs(config.tool_timeout_secs))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Runs `command` against `target` and checks the exit status
    pub async fn run(&self, command: &OptimizeCommand, target: &Path) -> Result<()> {
        let args = command.to_args(target);
        let asset = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        debug!("Running {:?} {:?}", self.program, args);
        let start_time = Instant::now();

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match timeout(self.timeout, child).await {
            Err(_) => {
                warn!("{} timed out on {} after {:?}", self.tool_name(), asset, self.timeout);
                return Err(WaoError::Timeout {
                    tool: self.tool_name(),
                    seconds: self.timeout.as_secs(),
                });
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WaoError::MissingDependency(format!(
                    "{} (install with: pip install optimize-images)",
                    self.tool_name()
                )));
            }
            Ok(Err(e)) => return Err(WaoError::Io(e)),
            Ok(Ok(output)) => output,
        };

        let elapsed = start_time.elapsed();

        if output.status.success() {
            debug!("{} optimized {} in {:?}", self.tool_name(), asset, elapsed);
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("{} failed on {} after {:?}: {}", self.tool_name(), asset, elapsed, output.status);
            Err(WaoError::TransformFailed {
                asset,
                reason: if stderr.is_empty() {
                    format!("{} exited with {}", self.tool_name(), output.status)
                } else {
                    format!("{} exited with {}: {}", self.tool_name(), output.status, stderr)
                },
            })
        }
    }
}
