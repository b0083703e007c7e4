use std::path::{Path, PathBuf};

use super::types::FlowConfig;

/// Get the default fabflow data directory: ~/.fabflow
pub fn get_fabflow_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".fabflow"))
}

pub fn load_from_path(path: &Path) -> anyhow::Result<FlowConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
    let mut cfg = toml::from_str::<FlowConfig>(&s)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok());
    expand_paths(&mut cfg);
    Ok(cfg)
}

pub fn load_default() -> anyhow::Result<FlowConfig> {
    // Priority 1: ~/.fabflow/config.toml
    let fabflow_config = get_fabflow_data_dir()?.join("config.toml");

    // Priority 2: ./fabflow.toml (current directory)
    let local_config = Path::new("fabflow.toml");

    if fabflow_config.exists() {
        return load_from_path(&fabflow_config);
    }
    if local_config.exists() {
        return load_from_path(local_config);
    }

    let mut cfg = FlowConfig::default();
    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok());
    expand_paths(&mut cfg);
    Ok(cfg)
}

/// `--config` wins over the default search.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<FlowConfig> {
    match explicit {
        Some(path) => load_from_path(path),
        None => load_default(),
    }
}

/// Environment variable overrides (highest priority).
fn apply_env_overrides(cfg: &mut FlowConfig, var: impl Fn(&str) -> Option<String>) {
    let get = |k: &str| var(k).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("FABFLOW_PROJECT_DIR") {
        cfg.project.directory = v;
    }
    if let Some(v) = get("FABFLOW_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = get("FABFLOW_YOSYS") {
        cfg.tools.yosys = v;
    }
    if let Some(v) = get("FABFLOW_VPR") {
        cfg.tools.vpr = v;
    }
    if let Some(v) = get("FABFLOW_OPENFPGA") {
        cfg.tools.openfpga = v;
    }
}

fn expand(s: &mut String) {
    if let Ok(expanded) = shellexpand::full(s.as_str()) {
        *s = expanded.into_owned();
    }
}

fn expand_opt(s: &mut Option<String>) {
    if let Some(s) = s.as_mut() {
        expand(s);
    }
}

fn expand_paths(cfg: &mut FlowConfig) {
    expand(&mut cfg.project.directory);
    expand(&mut cfg.tools.yosys);
    expand(&mut cfg.tools.vpr);
    expand(&mut cfg.tools.openfpga);
    expand_opt(&mut cfg.tools.architecture);
    expand_opt(&mut cfg.tools.openfpga_architecture);
    expand_opt(&mut cfg.tools.bitstream_setting);
    expand_opt(&mut cfg.tools.synthesis_script);
    expand_opt(&mut cfg.tools.openfpga_script);
    expand_opt(&mut cfg.logging.directory);
    if cfg.events_out.path != "stdout:" {
        expand(&mut cfg.events_out.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_overrides_ignore_blank_values() {
        let env: HashMap<&str, &str> = [
            ("FABFLOW_VPR", "/opt/vtr/bin/vpr"),
            ("FABFLOW_YOSYS", "  "),
            ("FABFLOW_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();
        let mut cfg = FlowConfig::default();

        apply_env_overrides(&mut cfg, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.tools.vpr, "/opt/vtr/bin/vpr");
        assert_eq!(cfg.tools.yosys, "yosys");
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn load_from_path_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fabflow.toml");
        std::fs::write(
            &path,
            "[project]\nname = \"blinky\"\ndirectory = \"/work/fpga\"\n[tools]\narchitecture = \"k6_frac_N10.xml\"\n",
        )
        .unwrap();

        let cfg = load_from_path(&path).unwrap();

        assert_eq!(cfg.project.name, "blinky");
        assert_eq!(cfg.tools.architecture.as_deref(), Some("k6_frac_N10.xml"));
    }

    #[test]
    fn broken_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[project\nname=").unwrap();

        let err = load_from_path(&path).unwrap_err().to_string();
        assert!(err.contains("bad.toml"), "{err}");
    }

    #[test]
    fn stdout_sink_is_not_expanded() {
        let mut cfg = FlowConfig::default();
        cfg.events_out.path = "stdout:".into();
        expand_paths(&mut cfg);
        assert_eq!(cfg.events_out.path, "stdout:");
    }
}
