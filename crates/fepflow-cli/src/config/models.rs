use fepflow::engine::config as core_config;
use std::path::PathBuf;

pub struct AppConfig {
    pub workdir: PathBuf,
    pub core_config: core_config::PipelineConfig,
}
