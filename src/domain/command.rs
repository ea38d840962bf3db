use std::ffi::OsStr;
use std::fmt;
use std::path::Path;

/// Container engine binary driving the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Podman,
    Docker,
}

impl EngineKind {
    pub fn binary(&self) -> &'static str {
        match self {
            Self::Podman => "podman",
            Self::Docker => "docker",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// How compose is invoked for the selected engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeFlavor {
    /// `podman compose` / `docker compose`
    Plugin,
    /// Standalone `podman-compose` binary
    Standalone,
}

/// A fully rendered external command (program plus argv)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl EngineCommand {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self {
            program: program.to_string(),
            args: args
                .into_iter()
                .map(|a| a.as_ref().to_string_lossy().into_owned())
                .collect(),
        }
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Exit status and (when captured) output of an external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Non-empty trimmed stdout lines
    pub fn lines(&self) -> Vec<String> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Builds engine, compose and host commands honoring the sudo setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCli {
    pub kind: EngineKind,
    pub compose: ComposeFlavor,
    pub sudo: bool,
}

impl EngineCli {
    pub fn new(kind: EngineKind, compose: ComposeFlavor, sudo: bool) -> Self {
        Self {
            kind,
            compose,
            sudo,
        }
    }

    /// `<engine> <args...>`
    pub fn engine<I, S>(&self, args: I) -> EngineCommand
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.wrap(EngineCommand::new(self.kind.binary(), args))
    }

    /// `<compose> -f <file> <args...>`
    pub fn compose<I, S>(&self, file: &Path, args: I) -> EngineCommand
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let file = file.to_string_lossy().into_owned();
        let rest: Vec<String> = EngineCommand::new("", args).args;

        let command = match self.compose {
            ComposeFlavor::Plugin => {
                let mut argv = vec!["compose".to_string(), "-f".to_string(), file];
                argv.extend(rest);
                EngineCommand::new(self.kind.binary(), argv)
            }
            ComposeFlavor::Standalone => {
                let mut argv = vec!["-f".to_string(), file];
                argv.extend(rest);
                EngineCommand::new("podman-compose", argv)
            }
        };

        self.wrap(command)
    }

    /// A host utility (e.g. `du`), prefixed with sudo when enabled since it
    /// reads engine-owned paths
    pub fn host<I, S>(&self, program: &str, args: I) -> EngineCommand
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.wrap(EngineCommand::new(program, args))
    }

    fn wrap(&self, command: EngineCommand) -> EngineCommand {
        if !self.sudo {
            return command;
        }

        let mut args = Vec::with_capacity(command.args.len() + 1);
        args.push(command.program);
        args.extend(command.args);
        EngineCommand {
            program: "sudo".to_string(),
            args,
        }
    }
}
