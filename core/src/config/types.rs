use serde::{Deserialize, Serialize};

use crate::change::DesignInputs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub stages: StagesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub events_out: EventsOutConfig,

    #[serde(default)]
    pub progress: ProgressConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_project_name")]
    pub name: String,

    /// Directory the project's generated files live in; `$OSRCDIR` in log
    /// templates resolves to `<directory>/<name>`.
    #[serde(default = "default_project_directory")]
    pub directory: String,

    #[serde(default = "default_top_module")]
    pub top_module: String,

    #[serde(default, flatten)]
    pub inputs: DesignInputs,
}

fn default_project_name() -> String {
    "noname".to_string()
}

fn default_project_directory() -> String {
    ".".to_string()
}

fn default_top_module() -> String {
    "top".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            directory: default_project_directory(),
            top_module: default_top_module(),
            inputs: DesignInputs::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_yosys")]
    pub yosys: String,

    #[serde(default = "default_vpr")]
    pub vpr: String,

    #[serde(default = "default_openfpga")]
    pub openfpga: String,

    /// VPR architecture description.
    #[serde(default)]
    pub architecture: Option<String>,

    /// OpenFPGA architecture description, required for bitstream generation.
    #[serde(default)]
    pub openfpga_architecture: Option<String>,

    /// OpenFPGA bitstream annotation file.
    #[serde(default)]
    pub bitstream_setting: Option<String>,

    #[serde(default)]
    pub device_size: Option<String>,

    #[serde(default)]
    pub channel_width: Option<u32>,

    #[serde(default = "default_lut_size")]
    pub lut_size: u32,

    /// Custom Yosys script template replacing the built-in one.
    #[serde(default)]
    pub synthesis_script: Option<String>,

    /// Custom OpenFPGA script template replacing the built-in one.
    #[serde(default)]
    pub openfpga_script: Option<String>,
}

fn default_yosys() -> String {
    "yosys".to_string()
}

fn default_vpr() -> String {
    "vpr".to_string()
}

fn default_openfpga() -> String {
    "openfpga".to_string()
}

fn default_lut_size() -> u32 {
    6
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yosys: default_yosys(),
            vpr: default_vpr(),
            openfpga: default_openfpga(),
            architecture: None,
            openfpga_architecture: None,
            bitstream_setting: None,
            device_size: None,
            channel_width: None,
            lut_size: default_lut_size(),
            synthesis_script: None,
            openfpga_script: None,
        }
    }
}

/// Stages left out of full runs. Names as accepted by `task_id_by_name`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StagesConfig {
    #[serde(default)]
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "fabflow_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsOutConfig {
    pub enabled: bool,
    /// File path, or `stdout:`.
    pub path: String,
    pub channel_capacity: usize,
    pub drop_when_full: bool,
}

impl Default for EventsOutConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "./run.events.jsonl".to_string(),
            channel_capacity: 2048,
            drop_when_full: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    #[serde(default = "default_progress_enabled")]
    pub enabled: bool,
}

fn default_progress_enabled() -> bool {
    true
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: default_progress_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let cfg: FlowConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.project.name, "noname");
        assert_eq!(cfg.tools.yosys, "yosys");
        assert_eq!(cfg.tools.lut_size, 6);
        assert!(!cfg.events_out.enabled);
        assert!(cfg.progress.enabled);
        assert!(cfg.stages.disabled.is_empty());
    }

    #[test]
    fn project_inputs_are_flattened() {
        let cfg: FlowConfig = toml::from_str(
            r#"
            [project]
            name = "counter"
            top_module = "counter"
            design_files = ["rtl/counter.v rtl/adder.v"]
            include_paths = ["rtl/include"]

            [tools]
            channel_width = 100

            [stages]
            disabled = ["power"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.project.name, "counter");
        assert_eq!(cfg.project.inputs.design_files, vec!["rtl/counter.v rtl/adder.v"]);
        assert_eq!(cfg.project.inputs.include_paths, vec!["rtl/include"]);
        assert!(cfg.project.inputs.library_paths.is_empty());
        assert_eq!(cfg.tools.channel_width, Some(100));
        assert_eq!(cfg.stages.disabled, vec!["power"]);
    }

    #[test]
    fn partial_events_out_section_keeps_defaults() {
        let cfg: FlowConfig = toml::from_str("[events_out]\nenabled = true\n").unwrap();
        assert!(cfg.events_out.enabled);
        assert_eq!(cfg.events_out.path, "./run.events.jsonl");
        assert_eq!(cfg.events_out.channel_capacity, 2048);
        assert!(cfg.events_out.drop_when_full);
    }
}
