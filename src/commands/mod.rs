use std::path::Path;

use anyhow::{Result, bail};

use crate::model::InputFile;
use crate::util::sha256_file;

pub mod analyze;
pub mod drift;
pub mod status;

pub const REPORT_VERSION: &str = "1.0.0";

pub fn fingerprint_input(role: &'static str, path: &Path) -> Result<InputFile> {
    if !path.exists() {
        bail!("{role} input not found: {}", path.display());
    }
    Ok(InputFile {
        role,
        path: path.display().to_string(),
        sha256: sha256_file(path)?,
    })
}
