use crate::services::CommandRunner;
use anyhow::Result;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Engine-wide resources: images, volumes, networks and prune operations
pub struct SystemService {
    runner: Arc<CommandRunner>,
}

fn until_filter(days: u32) -> String {
    format!("until={}h", u64::from(days) * 24)
}

impl SystemService {
    pub fn new(runner: Arc<CommandRunner>) -> Self {
        Self { runner }
    }

    /// Removes stopped containers, optionally only those older than `days`
    pub fn prune_containers(&self, older_than_days: Option<u32>) -> Result<bool> {
        self.prune(["container", "prune", "-f"], older_than_days)
    }

    pub fn prune_images(&self, older_than_days: Option<u32>) -> Result<bool> {
        self.prune(["image", "prune", "-af"], older_than_days)
    }

    pub fn prune_volumes(&self, older_than_days: Option<u32>) -> Result<bool> {
        self.prune(["volume", "prune", "-f"], older_than_days)
    }

    pub fn prune_networks(&self) -> Result<bool> {
        self.prune(["network", "prune", "-f"], None)
    }

    fn prune<const N: usize>(&self, base: [&str; N], older_than_days: Option<u32>) -> Result<bool> {
        let mut args: Vec<String> = base.iter().map(|s| s.to_string()).collect();
        if let Some(days) = older_than_days {
            args.push("--filter".into());
            args.push(until_filter(days));
        }

        let cmd = self.runner.cli().engine(args);
        Ok(self.runner.execute(&cmd)?.success)
    }

    pub fn volumes(&self, dangling_only: bool) -> Result<Vec<String>> {
        let mut args = vec!["volume", "ls", "--format", "{{.Name}}"];
        if dangling_only {
            args.extend(["--filter", "dangling=true"]);
        }
        self.list(args)
    }

    pub fn networks(&self) -> Result<Vec<String>> {
        self.list(vec!["network", "ls", "--format", "{{.Name}}"])
    }

    pub fn images(&self) -> Result<Vec<String>> {
        self.list(vec!["images", "--format", "{{.Repository}}:{{.Tag}}"])
    }

    fn list(&self, args: Vec<&str>) -> Result<Vec<String>> {
        let cmd = self.runner.cli().engine(args);
        let output = self.runner.query(&cmd)?;
        if !output.success {
            warn!("`{cmd}` falhou: {}", output.stderr.trim());
            return Ok(Vec::new());
        }
        Ok(output.lines())
    }

    /// Containers (running or not) that mount the volume
    pub fn volume_users(&self, volume: &str) -> Result<Vec<String>> {
        let filter = format!("volume={volume}");
        self.list(vec!["ps", "-a", "--filter", filter.as_str(), "--format", "{{.Names}}"])
    }

    pub fn volume_mountpoint(&self, volume: &str) -> Result<Option<PathBuf>> {
        let cmd = self
            .runner
            .cli()
            .engine(["volume", "inspect", "--format", "{{.Mountpoint}}", volume]);
        let output = self.runner.query(&cmd)?;
        let mountpoint = output.stdout.trim();

        if !output.success || mountpoint.is_empty() {
            return Ok(None);
        }
        Ok(Some(PathBuf::from(mountpoint)))
    }

    /// On-disk size in MB via `du -sm`
    pub fn disk_usage_mb(&self, path: &Path) -> Result<Option<u64>> {
        let cmd = self.runner.cli().host("du", [OsStr::new("-sm"), path.as_os_str()]);
        let output = self.runner.query(&cmd)?;
        if !output.success {
            debug!("du falhou para {:?}: {}", path, output.stderr.trim());
            return Ok(None);
        }

        Ok(output
            .stdout
            .split_whitespace()
            .next()
            .and_then(|size| size.parse().ok()))
    }

    pub fn remove_volume(&self, volume: &str) -> Result<bool> {
        let cmd = self.runner.cli().engine(["volume", "rm", volume]);
        Ok(self.runner.execute(&cmd)?.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComposeFlavor, EngineCli, EngineKind};
    use crate::test_support::MockEngine;

    fn service(mock: Arc<MockEngine>) -> SystemService {
        let cli = EngineCli::new(EngineKind::Podman, ComposeFlavor::Plugin, false);
        SystemService::new(Arc::new(CommandRunner::new(mock, cli, false)))
    }

    #[test]
    fn prune_with_age_filter() {
        let mock = Arc::new(MockEngine::new());
        let svc = service(mock.clone());

        assert!(svc.prune_images(Some(7)).unwrap());
        assert!(svc.prune_containers(None).unwrap());

        let runs = mock.get_runs();
        assert!(runs.contains(&"podman image prune -af --filter until=168h".to_string()));
        assert!(runs.contains(&"podman container prune -f".to_string()));
    }

    #[test]
    fn prune_networks() {
        let mock = Arc::new(MockEngine::new());
        let svc = service(mock.clone());

        assert!(svc.prune_networks().unwrap());
        assert!(mock.ran("podman network prune -f"));
    }

    #[test]
    fn dangling_volume_listing() {
        let mock = Arc::new(MockEngine::new());
        mock.respond("dangling=true", "old_data\ncache\n");
        let svc = service(mock);

        assert_eq!(
            svc.volumes(true).unwrap(),
            vec!["old_data".to_string(), "cache".to_string()]
        );
    }

    #[test]
    fn parses_du_output() {
        let mock = Arc::new(MockEngine::new());
        mock.respond("du -sm", "2048\t/var/lib/volumes/x/_data\n");
        let svc = service(mock);

        assert_eq!(
            svc.disk_usage_mb(Path::new("/var/lib/volumes/x/_data")).unwrap(),
            Some(2048)
        );
    }

    #[test]
    fn failed_du_is_none() {
        let mock = Arc::new(MockEngine::new());
        mock.fail_on("du -sm");
        let svc = service(mock);

        assert_eq!(svc.disk_usage_mb(Path::new("/nope")).unwrap(), None);
    }
}
