mod load;
mod types;

pub use load::{get_fabflow_data_dir, load, load_default, load_from_path};
pub use types::{
    EventsOutConfig, FlowConfig, LoggingConfig, ProgressConfig, ProjectConfig, StagesConfig,
    ToolsConfig,
};
