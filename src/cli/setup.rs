use crate::domain::ContainerEngine;
use crate::infra::config::{default_config_dir, ensure_config_dir, install_default_config};
use crate::infra::{EngineAdapter, RuntimePreference, detect_engine};
use anyhow::Result;
use std::path::Path;
use tracing::info;

pub fn install(config_dir: &Path) -> Result<()> {
    info!("📁 Preparando config em {:?}", config_dir);

    ensure_config_dir(config_dir)?;
    let written = install_default_config(config_dir)?;

    if written.is_empty() {
        println!("✅ Config já existente em {:?}, nada alterado", config_dir);
    }
    for path in &written {
        println!("✅ Criado {:?}", path);
    }

    report_engine(&EngineAdapter::new());

    info!(
        "Config pronto. Ajuste devarch.toml conforme necessário (padrão: {:?})",
        default_config_dir()
    );

    Ok(())
}

fn report_engine(engine: &dyn ContainerEngine) {
    match detect_engine(engine, RuntimePreference::Auto, false) {
        Ok(cli) => println!("✅ Runtime detectado: {} ({:?})", cli.kind, cli.compose),
        Err(e) => println!("⚠️  {e}"),
    }
}
