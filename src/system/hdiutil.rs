//! Builds and runs the `hdiutil create` invocation that produces the
//! sparsebundle.
//!
//! Argument construction is separated from execution so the exact command
//! line can be verified in tests. The encryption password is delivered to
//! hdiutil through its stdin (`-stdinpass`); it never appears in the argument
//! vector, the environment, or the logs.

use crate::error::{AppError, Result};
use crate::models::ProvisionConfig;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info};

/// A fully-assembled `hdiutil create` invocation.
pub struct CreateImageCommand {
    program: String,
    args: Vec<String>,
    password: Option<String>,
}

impl CreateImageCommand {
    /// Assembles the argument vector for `config`.
    ///
    /// Produces `hdiutil create -size <N>g -type SPARSEBUNDLE -fs HFS+J
    /// -volname <name> [-encryption AES-256 -stdinpass] -imagekey
    /// sparse-band-size=<blocks> <destination>/<identifier>.sparsebundle`.
    pub fn new(program: &str, config: &ProvisionConfig) -> Self {
        let mut args = vec![
            "create".to_string(),
            "-size".to_string(),
            format!("{}g", config.size_gb),
            "-type".to_string(),
            "SPARSEBUNDLE".to_string(),
            "-fs".to_string(),
            "HFS+J".to_string(),
            "-volname".to_string(),
            config.volume_name.clone(),
        ];

        if config.encrypted {
            args.push("-encryption".to_string());
            args.push("AES-256".to_string());
            args.push("-stdinpass".to_string());
        }

        args.push("-imagekey".to_string());
        args.push(format!("sparse-band-size={}", config.band_size_blocks()));
        args.push(config.bundle_path().to_string_lossy().into_owned());

        Self {
            program: program.to_string(),
            args,
            password: config.password.clone(),
        }
    }

    /// The argument vector, without the program itself.
    ///
    /// Exposed for tests that verify the exact command line.
    #[cfg(test)]
    #[allow(dead_code)]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Spawns hdiutil and waits for it to exit.
    ///
    /// When encrypting, the password is written to the child's stdin and the
    /// handle is closed so hdiutil sees EOF. A non-zero exit status is
    /// surfaced as `CreationFailed` with the child's stderr attached.
    pub async fn run(&self) -> Result<()> {
        info!("Running {} {}", self.program, self.args.join(" "));

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command.stdin(if self.password.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = command.spawn().map_err(|e| {
            error!("Failed to spawn {}: {}", self.program, e);
            AppError::CreationFailed(format!("could not run {}: {}", self.program, e))
        })?;

        if let Some(password) = &self.password {
            // -stdinpass reads the passphrase up to EOF.
            let mut stdin = child.stdin.take().ok_or_else(|| {
                AppError::CreationFailed("could not open hdiutil stdin".to_string())
            })?;
            stdin.write_all(password.as_bytes()).await?;
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        debug!("{} exited with {}", self.program, output.status);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("{} failed: {}", self.program, stderr.trim());
            return Err(AppError::CreationFailed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}
