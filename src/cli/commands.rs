use crate::cli::{
    prompt_backup_size, prompt_band_size, prompt_confirmation, prompt_destination,
    prompt_encryption, prompt_inheritance, prompt_password, prompt_volume_name,
};
use crate::error::{AppError, Result};
use crate::models::{is_affirmative, ProvisionConfig, ProvisionRequest};
use crate::system::{CreateImageCommand, HardwareQuery, InheritBackupCommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// CLI application
pub struct App {
    hdiutil_path: String,
    tmutil_path: String,
    hardware: HardwareQuery,
}

impl App {
    /// Create a new CLI application.
    ///
    /// Tool paths can be overridden through `TMPROVISION_HDIUTIL`,
    /// `TMPROVISION_TMUTIL` and `TMPROVISION_IOREG`; each tool must resolve
    /// before any prompt is shown, so a missing utility is caught up front
    /// rather than after the user has answered everything.
    pub fn new() -> Result<Self> {
        // Load environment variables
        dotenv::dotenv().ok();

        let hdiutil_path =
            env::var("TMPROVISION_HDIUTIL").unwrap_or_else(|_| "hdiutil".to_string());
        let tmutil_path = env::var("TMPROVISION_TMUTIL").unwrap_or_else(|_| "tmutil".to_string());
        let ioreg_path = env::var("TMPROVISION_IOREG").unwrap_or_else(|_| "ioreg".to_string());

        for tool in [&hdiutil_path, &tmutil_path, &ioreg_path] {
            which::which(tool).map_err(|_| AppError::MissingTool(tool.clone()))?;
            debug!("Preflight ok: {}", tool);
        }

        Ok(Self {
            hdiutil_path,
            tmutil_path,
            hardware: HardwareQuery::new(ioreg_path),
        })
    }

    /// Run one provisioning workflow from first prompt to final report.
    pub async fn run(&self) -> Result<()> {
        let identifier = self.hardware.platform_serial().await?;
        println!(
            "{} {}",
            "Provisioning a backup image for system".bold(),
            identifier.as_str().cyan()
        );

        let volume_name = prompt_volume_name()?;
        let size_gb = prompt_backup_size()?;
        if volume_name.is_empty() || size_gb.is_empty() {
            return Err(AppError::MissingInput(
                "volume name and backup size are both required".to_string(),
            ));
        }

        let band_size_mb = prompt_band_size()?;
        let encrypt = is_affirmative(&prompt_encryption()?);
        let password = if encrypt {
            let password = prompt_password()?;
            if password.is_empty() {
                return Err(AppError::MissingPassword);
            }
            Some(password)
        } else {
            None
        };
        let destination = prompt_destination()?;

        let request = ProvisionRequest {
            volume_name,
            size_gb,
            band_size_mb,
            encrypt,
            password,
            destination,
        };
        let (config, notices) =
            ProvisionConfig::from_request(request, identifier, &executable_dir()?)?;
        for notice in &notices {
            println!("{} {}", "Note:".yellow().bold(), notice);
        }

        println!("\n{}\n", config.summary_table());
        if !is_affirmative(&prompt_confirmation()?) {
            return Err(AppError::Cancelled);
        }

        self.create_image(&config).await?;

        // Sparsebundles are directory bundles, so a successful creation must
        // have left a directory at the expected path.
        let bundle = config.bundle_path();
        if !bundle.is_dir() {
            return Err(AppError::CreationFailed(format!(
                "expected bundle {} was not created",
                bundle.display()
            )));
        }
        println!("{} {}", "Created".green().bold(), bundle.display());

        if is_affirmative(&prompt_inheritance()?) {
            InheritBackupCommand::new(&self.tmutil_path, &bundle)
                .run()
                .await?;
            println!("{}", "Backup inheritance complete.".green());
        } else {
            println!(
                "Inheritance skipped. Run `sudo tmutil inheritbackup {}` to register it later.",
                bundle.display()
            );
        }

        info!("Provisioning run finished");
        Ok(())
    }

    /// Invoke hdiutil behind a spinner; creating a large image can take a
    /// while and prints nothing of ours in the meantime.
    async fn create_image(&self, config: &ProvisionConfig) -> Result<()> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
        spinner.set_message("Creating the sparsebundle...");
        spinner.enable_steady_tick(Duration::from_millis(120));

        let result = CreateImageCommand::new(&self.hdiutil_path, config)
            .run()
            .await;

        spinner.finish_and_clear();
        result
    }
}

/// Directory containing the running executable. Substituted for destination
/// answers that do not name an existing directory.
fn executable_dir() -> Result<PathBuf> {
    let exe = env::current_exe()?;
    Ok(exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use serial_test::serial;
    use std::sync::{Arc, Mutex};

    // --- Mock Runner State ---
    // Stores expected results and tracks calls for the mocked external commands
    #[derive(Default)]
    struct MockRunnerState {
        create_called: bool,
        inherit_called: bool,
        create_result: Option<Result<()>>,
        inherit_result: Option<Result<()>>,
        // When set, a "successful" creation still leaves no bundle behind,
        // like an hdiutil that exits 0 without producing output.
        leave_no_bundle: bool,
    }

    // --- Mock Runner ---
    // Stands in for the hdiutil/tmutil invocations
    #[derive(Clone)]
    struct MockRunner {
        state: Arc<Mutex<MockRunnerState>>,
    }

    impl MockRunner {
        fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(MockRunnerState::default())),
            }
        }

        fn expect_create(&self, result: Result<()>) {
            self.state.lock().unwrap().create_result = Some(result);
        }
        fn expect_inherit(&self, result: Result<()>) {
            self.state.lock().unwrap().inherit_result = Some(result);
        }
        fn leave_no_bundle(&self) {
            self.state.lock().unwrap().leave_no_bundle = true;
        }

        async fn create_image(&self, config: &ProvisionConfig) -> Result<()> {
            let (result, leave_no_bundle) = {
                let mut state = self.state.lock().unwrap();
                state.create_called = true;
                (
                    state.create_result.take().unwrap_or(Ok(())),
                    state.leave_no_bundle,
                )
            };
            // A successful hdiutil run leaves the bundle directory behind.
            if result.is_ok() && !leave_no_bundle {
                std::fs::create_dir_all(config.bundle_path()).unwrap();
            }
            result
        }

        async fn inherit_backup(&self, _bundle: &Path) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.inherit_called = true;
            state.inherit_result.take().unwrap_or(Ok(()))
        }
    }

    // --- Test Application ---
    // Mirrors App::run with canned answers in place of the prompts
    struct TestApp {
        runner: MockRunner,
    }

    impl TestApp {
        fn new() -> Self {
            Self {
                runner: MockRunner::new(),
            }
        }

        async fn provision(
            &self,
            request: ProvisionRequest,
            fallback: &Path,
            confirm: &str,
            inherit: &str,
        ) -> Result<()> {
            if request.volume_name.is_empty() || request.size_gb.is_empty() {
                return Err(AppError::MissingInput(
                    "volume name and backup size are both required".to_string(),
                ));
            }
            if request.encrypt && request.password.as_deref().unwrap_or("").is_empty() {
                return Err(AppError::MissingPassword);
            }

            let (config, _notices) =
                ProvisionConfig::from_request(request, "TESTSERIAL".to_string(), fallback)?;

            if !is_affirmative(confirm) {
                return Err(AppError::Cancelled);
            }

            self.runner.create_image(&config).await?;

            let bundle = config.bundle_path();
            if !bundle.is_dir() {
                return Err(AppError::CreationFailed(format!(
                    "expected bundle {} was not created",
                    bundle.display()
                )));
            }

            if is_affirmative(inherit) {
                self.runner.inherit_backup(&bundle).await?;
            }
            Ok(())
        }
    }

    fn base_request(destination: &Path) -> ProvisionRequest {
        ProvisionRequest {
            volume_name: "Backups".to_string(),
            size_gb: "500".to_string(),
            band_size_mb: "16".to_string(),
            encrypt: false,
            password: None,
            destination: destination.to_string_lossy().into_owned(),
        }
    }

    // --- Tests ---
    #[tokio::test]
    async fn empty_volume_name_runs_no_commands() {
        let app = TestApp::new();
        let dir = tempfile::tempdir().unwrap();
        let mut request = base_request(dir.path());
        request.volume_name = String::new();

        let result = app.provision(request, dir.path(), "y", "n").await;
        assert!(matches!(result, Err(AppError::MissingInput(_))));
        assert!(!app.runner.state.lock().unwrap().create_called);
        assert!(!app.runner.state.lock().unwrap().inherit_called);
    }

    #[tokio::test]
    async fn empty_size_runs_no_commands() {
        let app = TestApp::new();
        let dir = tempfile::tempdir().unwrap();
        let mut request = base_request(dir.path());
        request.size_gb = String::new();

        let result = app.provision(request, dir.path(), "y", "n").await;
        assert!(matches!(result, Err(AppError::MissingInput(_))));
        assert!(!app.runner.state.lock().unwrap().create_called);
    }

    #[tokio::test]
    async fn non_numeric_size_runs_no_commands() {
        let app = TestApp::new();
        let dir = tempfile::tempdir().unwrap();
        let mut request = base_request(dir.path());
        request.size_gb = "five hundred".to_string();

        let result = app.provision(request, dir.path(), "y", "n").await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert!(!app.runner.state.lock().unwrap().create_called);
    }

    #[tokio::test]
    async fn empty_password_runs_no_commands() {
        let app = TestApp::new();
        let dir = tempfile::tempdir().unwrap();
        let mut request = base_request(dir.path());
        request.encrypt = true;
        request.password = Some(String::new());

        let result = app.provision(request, dir.path(), "y", "n").await;
        assert!(matches!(result, Err(AppError::MissingPassword)));
        assert!(!app.runner.state.lock().unwrap().create_called);
    }

    #[tokio::test]
    async fn declined_confirmation_runs_no_commands() {
        let app = TestApp::new();
        let dir = tempfile::tempdir().unwrap();
        let request = base_request(dir.path());

        let result = app.provision(request, dir.path(), "n", "n").await;
        assert!(matches!(result, Err(AppError::Cancelled)));
        assert!(!app.runner.state.lock().unwrap().create_called);
        assert!(!app.runner.state.lock().unwrap().inherit_called);
    }

    #[tokio::test]
    async fn junk_confirmation_counts_as_decline() {
        let app = TestApp::new();
        let dir = tempfile::tempdir().unwrap();
        let request = base_request(dir.path());

        let result = app.provision(request, dir.path(), "sure", "n").await;
        assert!(matches!(result, Err(AppError::Cancelled)));
        assert!(!app.runner.state.lock().unwrap().create_called);
    }

    #[tokio::test]
    async fn full_run_creates_and_inherits() {
        let app = TestApp::new();
        let dir = tempfile::tempdir().unwrap();
        let request = base_request(dir.path());

        let result = app.provision(request, dir.path(), "y", "y").await;
        assert!(result.is_ok());
        assert!(app.runner.state.lock().unwrap().create_called);
        assert!(app.runner.state.lock().unwrap().inherit_called);
        assert!(dir.path().join("TESTSERIAL.sparsebundle").is_dir());
    }

    #[tokio::test]
    async fn declined_inheritance_skips_tmutil() {
        let app = TestApp::new();
        let dir = tempfile::tempdir().unwrap();
        let request = base_request(dir.path());

        let result = app.provision(request, dir.path(), "yes", "n").await;
        assert!(result.is_ok());
        assert!(app.runner.state.lock().unwrap().create_called);
        assert!(!app.runner.state.lock().unwrap().inherit_called);
    }

    #[tokio::test]
    async fn failed_creation_is_surfaced_and_stops_the_run() {
        let app = TestApp::new();
        let dir = tempfile::tempdir().unwrap();
        let request = base_request(dir.path());
        app.runner
            .expect_create(Err(AppError::CreationFailed("hdiutil exited with 1".to_string())));

        let result = app.provision(request, dir.path(), "y", "y").await;
        assert!(matches!(result, Err(AppError::CreationFailed(_))));
        assert!(!app.runner.state.lock().unwrap().inherit_called);
    }

    #[tokio::test]
    async fn missing_bundle_after_creation_is_surfaced() {
        let app = TestApp::new();
        let dir = tempfile::tempdir().unwrap();
        let request = base_request(dir.path());
        app.runner.leave_no_bundle();

        let result = app.provision(request, dir.path(), "y", "y").await;
        assert!(matches!(result, Err(AppError::CreationFailed(_))));
        assert!(!app.runner.state.lock().unwrap().inherit_called);
    }

    #[tokio::test]
    async fn failed_inheritance_is_surfaced() {
        let app = TestApp::new();
        let dir = tempfile::tempdir().unwrap();
        let request = base_request(dir.path());
        app.runner.expect_inherit(Err(AppError::InheritanceFailed(
            "tmutil inheritbackup exited with 1".to_string(),
        )));

        let result = app.provision(request, dir.path(), "y", "y").await;
        assert!(matches!(result, Err(AppError::InheritanceFailed(_))));
        assert!(app.runner.state.lock().unwrap().create_called);
        assert!(app.runner.state.lock().unwrap().inherit_called);
    }

    #[test]
    #[serial]
    fn env_overrides_select_tool_paths() {
        env::set_var("TMPROVISION_HDIUTIL", "/bin/ls");
        env::set_var("TMPROVISION_TMUTIL", "/bin/ls");
        env::set_var("TMPROVISION_IOREG", "/bin/ls");

        let app = App::new().unwrap();
        assert_eq!(app.hdiutil_path, "/bin/ls");
        assert_eq!(app.tmutil_path, "/bin/ls");

        env::remove_var("TMPROVISION_HDIUTIL");
        env::remove_var("TMPROVISION_TMUTIL");
        env::remove_var("TMPROVISION_IOREG");
    }

    #[test]
    #[serial]
    fn missing_tool_fails_preflight() {
        env::set_var("TMPROVISION_HDIUTIL", "/definitely/not/a/real/tool");
        env::set_var("TMPROVISION_TMUTIL", "/bin/ls");
        env::set_var("TMPROVISION_IOREG", "/bin/ls");

        let result = App::new();
        assert!(matches!(result, Err(AppError::MissingTool(_))));

        env::remove_var("TMPROVISION_HDIUTIL");
        env::remove_var("TMPROVISION_TMUTIL");
        env::remove_var("TMPROVISION_IOREG");
    }
}
