//! Interactive prompt helpers built on `dialoguer`.
//!
//! Every answer is returned as typed, without re-prompting: emptiness and
//! malformed values are judged by the workflow (required fields abort, the
//! band size falls back to its default). Only the password prompt suppresses
//! echo.

use crate::error::Result;
use crate::models::DEFAULT_BAND_SIZE_MB;
use dialoguer::{theme::ColorfulTheme, Input, Password};

pub fn prompt_volume_name() -> Result<String> {
    let answer = Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt("Volume name for the backup image")
        .allow_empty(true)
        .interact_text()?;
    Ok(answer)
}

pub fn prompt_backup_size() -> Result<String> {
    let answer = Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt("Maximum backup size in GB")
        .allow_empty(true)
        .interact_text()?;
    Ok(answer)
}

pub fn prompt_band_size() -> Result<String> {
    let answer = Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "Band size in MB (default {})",
            DEFAULT_BAND_SIZE_MB
        ))
        .allow_empty(true)
        .interact_text()?;
    Ok(answer)
}

pub fn prompt_encryption() -> Result<String> {
    let answer = Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt("Encrypt the backup image? [y/n]")
        .allow_empty(true)
        .interact_text()?;
    Ok(answer)
}

/// Masked password prompt. An empty answer is allowed here and rejected by
/// the workflow so the abort carries the application's own error.
pub fn prompt_password() -> Result<String> {
    let answer = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Password for the encrypted image")
        .allow_empty_password(true)
        .interact()?;
    Ok(answer)
}

pub fn prompt_destination() -> Result<String> {
    let answer = Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt("Destination directory for the image")
        .allow_empty(true)
        .interact_text()?;
    Ok(answer)
}

pub fn prompt_confirmation() -> Result<String> {
    let answer = Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt("Create the image with these settings? [y/n]")
        .allow_empty(true)
        .interact_text()?;
    Ok(answer)
}

pub fn prompt_inheritance() -> Result<String> {
    let answer = Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt("Register the image as an inherited Time Machine backup? [y/n]")
        .allow_empty(true)
        .interact_text()?;
    Ok(answer)
}
