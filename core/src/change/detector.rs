use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::fs::BuildFs;

/// Sources a synthesis step reads. Each entry may hold several
/// space-separated paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignInputs {
    pub design_files: Vec<String>,
    pub include_paths: Vec<String>,
    pub library_paths: Vec<String>,
}

impl DesignInputs {
    /// Every non-empty token across design files, include paths and library
    /// paths, in that order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.design_files
            .iter()
            .chain(&self.include_paths)
            .chain(&self.library_paths)
            .flat_map(|entry| entry.split(' '))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// What a previous run of the step left behind, plus the script this run
/// would write.
#[derive(Debug, Clone, Copy)]
pub struct StepArtifacts<'a> {
    /// Relative paths are resolved against this directory.
    pub base_dir: &'a Path,
    /// Output whose timestamp inputs are compared against.
    pub artifact: &'a Path,
    /// Script saved by the previous run.
    pub saved_script: &'a Path,
    /// Script content this run would use.
    pub script: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeReason {
    ArtifactMissing,
    InputNewer(PathBuf),
    InputUnreadable(PathBuf),
    ScriptMissing,
    ScriptDiffers,
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeReason::ArtifactMissing => write!(f, "previous output is missing"),
            ChangeReason::InputNewer(p) => write!(f, "{} is newer than the output", p.display()),
            ChangeReason::InputUnreadable(p) => write!(f, "cannot stat {}", p.display()),
            ChangeReason::ScriptMissing => write!(f, "no saved script"),
            ChangeReason::ScriptDiffers => write!(f, "script changed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeStatus {
    Unchanged,
    Changed(ChangeReason),
}

impl ChangeStatus {
    pub fn is_changed(&self) -> bool {
        matches!(self, ChangeStatus::Changed(_))
    }
}

/// Decides whether a step has to run again.
///
/// Changed when the artifact is missing, when any input is newer than the
/// artifact or cannot be stat'd, or when the saved script is missing or
/// differs from `step.script`. Inputs with the same timestamp as the artifact
/// count as unchanged.
pub fn detect_change(fs: &dyn BuildFs, step: &StepArtifacts<'_>, inputs: &DesignInputs) -> ChangeStatus {
    let resolve = |p: &Path| step.base_dir.join(p);

    let Some(built) = fs.modified(&resolve(step.artifact)) else {
        return ChangeStatus::Changed(ChangeReason::ArtifactMissing);
    };

    for input in inputs.paths().map(Path::new) {
        match fs.modified(&resolve(input)) {
            None => return ChangeStatus::Changed(ChangeReason::InputUnreadable(input.to_path_buf())),
            Some(t) if t > built => {
                return ChangeStatus::Changed(ChangeReason::InputNewer(input.to_path_buf()))
            }
            Some(_) => {}
        }
    }

    match fs.read_to_string(&resolve(step.saved_script)) {
        None => ChangeStatus::Changed(ChangeReason::ScriptMissing),
        Some(saved) if saved != step.script => ChangeStatus::Changed(ChangeReason::ScriptDiffers),
        Some(_) => ChangeStatus::Unchanged,
    }
}
