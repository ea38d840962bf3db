use crate::domain::{CommandOutput, Confirmation, ContainerEngine, EngineCommand};
use anyhow::{Result, bail};
use std::collections::{HashSet, VecDeque};
use std::sync::RwLock;

#[derive(Debug, Clone)]
enum Reply {
    Output(VecDeque<CommandOutput>),
    Error(String),
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    reply: Reply,
}

/// Scriptable engine that records every rendered command.
///
/// Rules match when the rendered command contains the pattern; the most
/// recently added matching rule wins. Unmatched commands succeed with empty
/// output.
#[derive(Debug)]
pub struct MockEngine {
    rules: RwLock<Vec<Rule>>,
    commands: RwLock<Vec<String>>,
    runs: RwLock<Vec<String>>,
    available: RwLock<HashSet<String>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            commands: RwLock::new(Vec::new()),
            runs: RwLock::new(Vec::new()),
            available: RwLock::new(HashSet::new()),
        }
    }

    pub fn set_available(&self, programs: &[&str]) {
        let mut available = self.available.write().unwrap();
        available.extend(programs.iter().map(|p| p.to_string()));
    }

    /// Successful reply with the given stdout
    pub fn respond(&self, pattern: &str, stdout: &str) {
        self.push_rule(pattern, Reply::Output(VecDeque::from([CommandOutput::ok(stdout)])));
    }

    /// Successive replies; the last one repeats once the others are used up
    pub fn respond_sequence(&self, pattern: &str, stdouts: &[&str]) {
        let replies = stdouts.iter().map(|s| CommandOutput::ok(*s)).collect();
        self.push_rule(pattern, Reply::Output(replies));
    }

    /// Non-zero exit for matching commands
    pub fn fail_on(&self, pattern: &str) {
        self.push_rule(
            pattern,
            Reply::Output(VecDeque::from([CommandOutput::failed(1, "mock failure")])),
        );
    }

    /// Spawn error for matching commands
    pub fn error_on(&self, pattern: &str) {
        self.push_rule(pattern, Reply::Error(format!("Mock failure on: {pattern}")));
    }

    /// Every command seen, run or captured
    pub fn get_commands(&self) -> Vec<String> {
        self.commands.read().unwrap().clone()
    }

    /// Only commands executed through `run`
    pub fn get_runs(&self) -> Vec<String> {
        self.runs.read().unwrap().clone()
    }

    pub fn ran(&self, needle: &str) -> bool {
        self.get_runs().iter().any(|c| c.contains(needle))
    }

    fn push_rule(&self, pattern: &str, reply: Reply) {
        self.rules.write().unwrap().push(Rule {
            pattern: pattern.to_string(),
            reply,
        });
    }

    fn reply(&self, rendered: &str) -> Result<CommandOutput> {
        let mut rules = self.rules.write().unwrap();
        let Some(rule) = rules
            .iter_mut()
            .rev()
            .find(|r| rendered.contains(&r.pattern))
        else {
            return Ok(CommandOutput::ok(""));
        };

        match &mut rule.reply {
            Reply::Error(message) => bail!("{message}"),
            Reply::Output(queue) => {
                if queue.len() > 1 {
                    Ok(queue.pop_front().unwrap_or_default())
                } else {
                    Ok(queue.front().cloned().unwrap_or_default())
                }
            }
        }
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerEngine for MockEngine {
    fn run(&self, command: &EngineCommand) -> Result<CommandOutput> {
        let rendered = command.to_string();
        self.commands.write().unwrap().push(rendered.clone());
        self.runs.write().unwrap().push(rendered.clone());
        self.reply(&rendered)
    }

    fn capture(&self, command: &EngineCommand) -> Result<CommandOutput> {
        let rendered = command.to_string();
        self.commands.write().unwrap().push(rendered.clone());
        self.reply(&rendered)
    }

    fn is_command_available(&self, program: &str) -> bool {
        self.available.read().unwrap().contains(program)
    }
}

/// Confirmation that always answers the same way and remembers prompts
pub struct RecordingConfirmation {
    answer: bool,
    prompts: RwLock<Vec<String>>,
}

impl RecordingConfirmation {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            prompts: RwLock::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.read().unwrap().clone()
    }
}

impl Confirmation for RecordingConfirmation {
    fn confirm(&self, prompt: &str, _phrase: &str) -> Result<bool> {
        self.prompts.write().unwrap().push(prompt.to_string());
        Ok(self.answer)
    }
}
