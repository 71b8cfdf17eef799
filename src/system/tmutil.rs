//! Registers a freshly-created bundle as an inherited Time Machine backup.
//!
//! `tmutil inheritbackup` requires elevated privilege, so the invocation is
//! prefixed with `sudo` and the child keeps the terminal's stdio for the
//! sudo password prompt.

use crate::error::{AppError, Result};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, error, info};

const SUDO: &str = "sudo";

/// A `sudo tmutil inheritbackup <bundle>` invocation.
pub struct InheritBackupCommand {
    args: Vec<String>,
}

impl InheritBackupCommand {
    pub fn new(tmutil_path: &str, bundle: &Path) -> Self {
        Self {
            args: vec![
                tmutil_path.to_string(),
                "inheritbackup".to_string(),
                bundle.to_string_lossy().into_owned(),
            ],
        }
    }

    /// The argument vector passed to sudo.
    ///
    /// Exposed for tests that verify the exact command line.
    #[cfg(test)]
    #[allow(dead_code)]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Runs the inheritance command and checks its exit status.
    pub async fn run(&self) -> Result<()> {
        info!("Running {} {}", SUDO, self.args.join(" "));

        // stdio stays inherited: sudo may need to prompt for a password.
        let status = Command::new(SUDO)
            .args(&self.args)
            .status()
            .await
            .map_err(|e| {
                error!("Failed to spawn {}: {}", SUDO, e);
                AppError::InheritanceFailed(format!("could not run {}: {}", SUDO, e))
            })?;

        debug!("tmutil exited with {}", status);

        if !status.success() {
            return Err(AppError::InheritanceFailed(format!(
                "tmutil inheritbackup exited with {}",
                status
            )));
        }

        Ok(())
    }
}
