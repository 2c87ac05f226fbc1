use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use caes_model::ParametersConfig;
use caes_solve::fixed_point::Config;
use serde::Deserialize;

/// Contents of a TOML run file.
///
/// ```toml
/// [schedule]
/// injection = "injection_schedule.csv"
/// extraction = "extraction_schedule.csv"
///
/// [parameters]
/// time_step = 10.0
///
/// [solver]
/// basic_max_iters = 50
/// ```
///
/// `[parameters]` and `[solver]` are optional and fill missing values from
/// the Kamioka parameters and the default solver config.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunFile {
    pub schedule: ScheduleFiles,
    #[serde(default)]
    pub parameters: ParametersConfig,
    #[serde(default)]
    pub solver: Config,
}

/// Paths of the injection and extraction schedules.
///
/// Relative paths are resolved against the directory of the run file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleFiles {
    pub injection: PathBuf,
    pub extraction: PathBuf,
}

impl RunFile {
    /// Reads a run file and resolves its schedule paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid run file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read run file `{}`", path.display()))?;
        let mut run: RunFile = toml::from_str(&content)
            .with_context(|| format!("invalid run file `{}`", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        run.schedule.injection = base.join(&run.schedule.injection);
        run.schedule.extraction = base.join(&run.schedule.extraction);

        Ok(run)
    }
}
