use crate::domain::Confirmation;
use anyhow::{Context, Result};
use std::io::{self, BufRead, IsTerminal, Write};
use tracing::warn;

/// Typed confirmation on a real terminal; refuses when stdin is not a TTY
pub struct TerminalConfirmation;

impl Confirmation for TerminalConfirmation {
    fn confirm(&self, prompt: &str, phrase: &str) -> Result<bool> {
        if !io::stdin().is_terminal() {
            warn!("Sessão não interativa: operação destrutiva recusada");
            return Ok(false);
        }

        println!("⚠️  {prompt}");
        print!("Digite '{phrase}' para continuar: ");
        io::stdout().flush().context("escrevendo prompt")?;

        let mut answer = String::new();
        io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("lendo confirmação")?;

        Ok(answer.trim_end_matches(['\r', '\n']) == phrase)
    }
}

/// Fixed answer for automation
pub struct FixedConfirmation(pub bool);

impl Confirmation for FixedConfirmation {
    fn confirm(&self, _prompt: &str, _phrase: &str) -> Result<bool> {
        Ok(self.0)
    }
}

/// `-y` skips the prompt; otherwise ask on the terminal
pub fn confirmation_for(assume_yes: bool) -> Box<dyn Confirmation> {
    if assume_yes {
        Box::new(FixedConfirmation(true))
    } else {
        Box::new(TerminalConfirmation)
    }
}
