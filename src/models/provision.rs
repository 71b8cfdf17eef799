//! Provisioning parameters and the rules that normalize raw prompt answers.
//!
//! `ProvisionRequest` carries the answers exactly as typed; `ProvisionConfig`
//! is the validated form the rest of the application works with. The
//! normalization rules live here as plain functions so they can be tested
//! without a terminal.

use crate::error::{AppError, Result};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Band size used when the band-size answer is empty or not all digits.
pub const DEFAULT_BAND_SIZE_MB: u32 = 8;

/// `hdiutil` expects band size as a count of 512-byte blocks: 1 MB = 2048 blocks.
pub const BLOCKS_PER_MEGABYTE: u64 = 2048;

/// Raw prompt answers, exactly as typed. No validation has happened yet.
#[derive(Debug, Clone, Default)]
pub struct ProvisionRequest {
    pub volume_name: String,
    pub size_gb: String,
    pub band_size_mb: String,
    pub encrypt: bool,
    pub password: Option<String>,
    pub destination: String,
}

/// Validated parameters for one provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// Hardware identifier, used as the bundle's base filename.
    pub identifier: String,
    pub volume_name: String,
    pub size_gb: u64,
    pub band_size_mb: u32,
    pub encrypted: bool,
    /// Present iff `encrypted`. Delivered to hdiutil via stdin, never via argv.
    pub password: Option<String>,
    pub destination: PathBuf,
}

/// Returns true for the affirmative answers `y`, `Y`, `yes`, `YES`, `Yes`, ...
///
/// Anything else (including an empty answer) is a negative. Prompts never
/// re-ask, so an unrecognised answer at the confirmation gate aborts the run.
pub fn is_affirmative(answer: &str) -> bool {
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

/// Parses a band-size answer, in megabytes.
///
/// Only an answer composed purely of ASCII digits is accepted; everything
/// else (empty input included) yields `None` and the caller falls back to
/// [`DEFAULT_BAND_SIZE_MB`]. Never an error.
pub fn parse_band_size(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    // A digit string too large for u32 is no more usable than a word.
    raw.parse::<u32>().ok()
}

/// Resolves the destination answer against the filesystem.
///
/// Returns the effective directory and whether the fallback was substituted
/// because the answer did not name an existing directory.
pub fn resolve_destination(raw: &str, fallback: &Path) -> (PathBuf, bool) {
    let candidate = Path::new(raw);
    if !raw.is_empty() && candidate.is_dir() {
        (candidate.to_path_buf(), false)
    } else {
        debug!(
            "Destination {:?} is not an existing directory, falling back to {:?}",
            raw, fallback
        );
        (fallback.to_path_buf(), true)
    }
}

impl ProvisionConfig {
    /// Validates a request into a usable configuration.
    ///
    /// `fallback_dir` is the directory containing the running executable,
    /// substituted when the destination answer is not an existing directory.
    /// Returns the configuration plus the notices to show the user for the
    /// silent-fallback substitutions that occurred.
    pub fn from_request(
        request: ProvisionRequest,
        identifier: String,
        fallback_dir: &Path,
    ) -> Result<(Self, Vec<String>)> {
        // Both required fields are checked together so a single message can
        // name them both, whichever was missing.
        if request.volume_name.is_empty() || request.size_gb.is_empty() {
            return Err(AppError::MissingInput(
                "volume name and backup size are both required".to_string(),
            ));
        }

        let size_gb = request.size_gb.parse::<u64>().ok().filter(|&n| n > 0).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "backup size must be a positive integer in GB, got {:?}",
                request.size_gb
            ))
        })?;

        let mut notices = Vec::new();

        let band_size_mb = match parse_band_size(&request.band_size_mb) {
            Some(mb) => mb,
            None => {
                if !request.band_size_mb.is_empty() {
                    notices.push(format!(
                        "Band size {:?} is not numeric, using the default of {} MB",
                        request.band_size_mb, DEFAULT_BAND_SIZE_MB
                    ));
                }
                DEFAULT_BAND_SIZE_MB
            },
        };

        if request.encrypt && request.password.as_deref().unwrap_or("").is_empty() {
            return Err(AppError::MissingPassword);
        }

        let (destination, substituted) = resolve_destination(&request.destination, fallback_dir);
        if substituted {
            notices.push(format!(
                "Destination {:?} is not an existing directory, using {} instead",
                request.destination,
                destination.display()
            ));
        }

        Ok((
            Self {
                identifier,
                volume_name: request.volume_name,
                size_gb,
                band_size_mb,
                encrypted: request.encrypt,
                password: if request.encrypt { request.password } else { None },
                destination,
            },
            notices,
        ))
    }

    /// Band size as the 512-byte-block count hdiutil expects.
    pub fn band_size_blocks(&self) -> u64 {
        u64::from(self.band_size_mb) * BLOCKS_PER_MEGABYTE
    }

    /// Full path of the bundle to create: `<destination>/<identifier>.sparsebundle`.
    pub fn bundle_path(&self) -> PathBuf {
        self.destination
            .join(format!("{}.sparsebundle", self.identifier))
    }

    /// Renders the pre-confirmation summary. The password is never included.
    pub fn summary_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.add_row(vec![Cell::new("Volume name"), Cell::new(&self.volume_name)]);
        table.add_row(vec![
            Cell::new("Backup size"),
            Cell::new(format!("{} GB", self.size_gb)),
        ]);
        table.add_row(vec![
            Cell::new("Band size"),
            Cell::new(format!(
                "{} MB ({} blocks)",
                self.band_size_mb,
                self.band_size_blocks()
            )),
        ]);
        table.add_row(vec![
            Cell::new("Encryption"),
            Cell::new(if self.encrypted { "AES-256" } else { "disabled" }),
        ]);
        table.add_row(vec![
            Cell::new("Destination"),
            Cell::new(self.destination.display().to_string()),
        ]);
        table.add_row(vec![
            Cell::new("Image"),
            Cell::new(self.bundle_path().display().to_string()),
        ]);
        table
    }
}
