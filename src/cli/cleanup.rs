use super::stack::FilterArgs;
use crate::domain::CleanupOptions;
use crate::infra::confirmation_for;
use crate::services::{CleanupPlan, Orchestrator};
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug, Clone, Default)]
pub struct PruneArgs {
    /// Serviços ou categorias para --cleanup-service-volumes
    pub targets: Vec<String>,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Remove containers parados
    #[arg(long)]
    pub remove_containers: bool,
    /// Remove imagens não utilizadas
    #[arg(long)]
    pub remove_images: bool,
    /// Remove volumes não utilizados (pede confirmação)
    #[arg(long)]
    pub remove_volumes: bool,
    /// Remove redes não utilizadas
    #[arg(long)]
    pub remove_networks: bool,
    /// Apenas recursos mais antigos que N dias
    #[arg(long, value_name = "DAYS")]
    pub older_than: Option<u32>,
    /// Remove volumes órfãos acima do limite de tamanho
    #[arg(long)]
    pub cleanup_large_volumes: bool,
    /// Limite de tamanho por volume, em MB
    #[arg(long, default_value_t = CleanupOptions::DEFAULT_MAX_VOLUME_SIZE_MB)]
    pub max_volume_size: u64,
    /// Máximo de volumes grandes removidos por execução
    #[arg(long, default_value_t = CleanupOptions::DEFAULT_MAX_VOLUMES_TO_REMOVE)]
    pub max_volumes: usize,
    /// Remove containers fora do registro, da rede e sem label de compose
    #[arg(long)]
    pub cleanup_orphans: bool,
    /// compose down -v nos serviços alvo (pede confirmação)
    #[arg(long)]
    pub cleanup_service_volumes: bool,
    /// Nunca remove volumes
    #[arg(long)]
    pub preserve_data: bool,
    /// Nunca remove volumes (sinônimo de --preserve-data)
    #[arg(long)]
    pub preserve_volumes: bool,
    /// Tudo acima exceto volumes de dados
    #[arg(long)]
    pub all: bool,
    /// Pula a confirmação digitada
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl PruneArgs {
    pub fn to_options(&self) -> CleanupOptions {
        CleanupOptions {
            remove_containers: self.remove_containers || self.all,
            remove_images: self.remove_images || self.all,
            remove_volumes: self.remove_volumes,
            remove_networks: self.remove_networks || self.all,
            older_than_days: self.older_than,
            cleanup_large_volumes: self.cleanup_large_volumes,
            max_volume_size_mb: self.max_volume_size,
            max_volumes_to_remove: self.max_volumes,
            cleanup_orphans: self.cleanup_orphans || self.all,
            cleanup_service_volumes: self.cleanup_service_volumes,
            targets: self.filters.to_request(&self.targets),
            preserve_data: self.preserve_data,
            preserve_volumes: self.preserve_volumes,
        }
    }
}

pub fn prune(orchestrator: &Orchestrator, args: &PruneArgs) -> Result<CleanupPlan> {
    let confirmation = confirmation_for(args.yes);
    orchestrator.cleanup(&args.to_options(), confirmation.as_ref())
}
