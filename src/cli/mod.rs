pub mod cleanup;
pub mod setup;
pub mod stack;

use crate::infra::EngineAdapter;
use crate::infra::config::{default_config_dir, load_settings};
use crate::services::Orchestrator;
use anyhow::Result;
use clap::{Parser, Subcommand};
use cleanup::PruneArgs;
use stack::{DownArgs, LogsArgs, RebuildArgs, RestartArgs, StartArgs, StopArgs, UpArgs};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "devarch",
    version,
    about = "Gerencia a stack de serviços compose do devarch por categoria"
)]
pub struct Cli {
    /// Diretório de configuração (default: ~/.config/devarch)
    #[arg(long, env = "DEVARCH_CONFIG_DIR", default_value_os_t = default_config_dir(), global = true)]
    pub config_dir: PathBuf,

    /// Logs detalhados
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Mostra os comandos sem executá-los
    #[arg(short, long, global = true)]
    pub dry_run: bool,

    /// Executa o runtime via sudo
    #[arg(short, long, global = true)]
    pub sudo: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sobe serviços ou categorias (compose up)
    Up(UpArgs),
    /// Derruba serviços ou categorias (compose down)
    Down(DownArgs),
    /// Reinicia serviços ou categorias (down + up)
    Restart(RestartArgs),
    /// Reconstrói imagens e recria containers
    Rebuild(RebuildArgs),
    /// Mostra logs de um serviço
    Logs(LogsArgs),
    /// Status de todos os serviços do registro
    Status,
    /// compose ps dos alvos (ou ps -a)
    Ps {
        targets: Vec<String>,
    },
    /// Categorias, serviços e caminhos dos arquivos compose
    List,
    /// Containers, volumes e redes do runtime
    ListComponents,
    /// Limpa recursos do runtime
    PruneComponents(PruneArgs),
    /// Inicia categorias em ordem, com filtros
    Start(StartArgs),
    /// Para categorias em ordem reversa, com filtros
    Stop(StopArgs),
    /// Inicia todas as categorias
    StartAll {
        #[arg(short, long)]
        parallel: bool,
        #[arg(short = 'w', long)]
        no_wait: bool,
        #[arg(short, long)]
        force: bool,
        #[arg(short, long)]
        timeout: Option<u64>,
    },
    /// Para todas as categorias
    StopAll {
        #[arg(short, long)]
        parallel: bool,
        #[arg(long)]
        remove_volumes: bool,
        #[arg(short, long, default_value_t = crate::services::DEFAULT_STOP_TIMEOUT_SECS)]
        timeout: u32,
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Instala os arquivos de config padrão
    Setup,
}

pub fn run(cli: Cli) -> Result<ExitCode> {
    // Setup must work before any engine or config exists
    if let Commands::Setup = cli.command {
        setup::install(&cli.config_dir)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut settings = load_settings(&cli.config_dir)?;
    settings.sudo |= cli.sudo;

    let engine = Arc::new(EngineAdapter::new());
    let orchestrator = stack::build_orchestrator(&settings, engine, cli.dry_run)?;
    dispatch(cli.command, &orchestrator, &cli.config_dir)
}

fn dispatch(command: Commands, orchestrator: &Orchestrator, config_dir: &Path) -> Result<ExitCode> {
    let report = match command {
        Commands::Up(args) => stack::up(orchestrator, &args)?,
        Commands::Down(args) => stack::down(orchestrator, &args)?,
        Commands::Restart(args) => stack::restart(orchestrator, &args)?,
        Commands::Rebuild(args) => stack::rebuild(orchestrator, &args)?,
        Commands::Start(args) => stack::start(orchestrator, &args)?,
        Commands::Stop(args) => stack::stop(orchestrator, &args)?,
        Commands::StartAll {
            parallel,
            no_wait,
            force,
            timeout,
        } => {
            let args = StartArgs {
                parallel,
                no_wait,
                force,
                timeout,
                ..Default::default()
            };
            stack::start(orchestrator, &args)?
        }
        Commands::StopAll {
            parallel,
            remove_volumes,
            timeout,
            yes,
        } => {
            let args = StopArgs {
                parallel,
                remove_volumes,
                timeout,
                yes,
                ..Default::default()
            };
            stack::stop(orchestrator, &args)?
        }
        Commands::Logs(args) => {
            orchestrator.logs(&args.service, args.follow, args.tail)?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Status => {
            orchestrator.status()?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Ps { targets } => {
            orchestrator.ps(&targets)?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::List => {
            orchestrator.list();
            return Ok(ExitCode::SUCCESS);
        }
        Commands::ListComponents => {
            orchestrator.list_components()?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::PruneComponents(args) => {
            let plan = cleanup::prune(orchestrator, &args)?;
            let code = if plan.failed() > 0 { 1 } else { 0 };
            return Ok(ExitCode::from(code));
        }
        Commands::Setup => {
            setup::install(config_dir)?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    Ok(ExitCode::from(report.exit_code()))
}
