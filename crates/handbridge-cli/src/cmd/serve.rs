use anyhow::Context;
use handbridge_core::config::Config;
use handbridge_core::config::WarnLevel;
use handbridge_core::mapping::MappingStore;
use std::path::Path;

pub fn run(root: &Path, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = Config::load(root).context("failed to load config")?;
    if let Some(port) = port {
        config.server.port = port;
    }

    let domains = MappingStore::open(root).domains();
    for w in config.validate(&domains) {
        match w.level {
            WarnLevel::Warning => tracing::warn!("config: {}", w.message),
            WarnLevel::Error => tracing::error!("config: {}", w.message),
        }
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(handbridge_server::serve(root.to_path_buf(), config))
}
