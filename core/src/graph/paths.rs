use std::path::{Path, PathBuf};

/// Placeholder for the project output directory in log file templates.
pub const PROJECT_OSRCDIR: &str = "$OSRCDIR";

pub fn resolve_log_path(template: &str, project_dir: &Path) -> PathBuf {
    PathBuf::from(template.replace(PROJECT_OSRCDIR, &project_dir.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_output_dir() {
        let p = resolve_log_path("$OSRCDIR/routing.rpt", Path::new("/work/counter"));
        assert_eq!(p, PathBuf::from("/work/counter/routing.rpt"));
    }

    #[test]
    fn templates_without_placeholder_pass_through() {
        let p = resolve_log_path("logs/sta.log", Path::new("/work"));
        assert_eq!(p, PathBuf::from("logs/sta.log"));
    }
}
