// src/runner.rs

//! Execution of install commands
//!
//! Install commands may prompt for a password or confirmation, so the
//! system runner leaves stdio attached to the terminal.

use crate::error::{Error, Result};
use crate::installers::InstallCommand;
use std::process::Command;
use tracing::{debug, warn};

/// Runs install commands on behalf of the installer
pub trait CommandRunner {
    /// Run one command, returning whether it exited successfully
    fn run(&self, command: &InstallCommand) -> Result<bool>;
}

/// Runs commands as child processes of the current process
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &InstallCommand) -> Result<bool> {
        let program = command
            .program()
            .ok_or_else(|| Error::Internal("refusing to run an empty command".to_string()))?;

        debug!("Running: {}", command);
        let status = Command::new(program)
            .args(command.args())
            .status()?;

        if !status.success() {
            warn!(
                "`{}` exited with code {}",
                command,
                status.code().unwrap_or(-1)
            );
        }
        Ok(status.success())
    }
}
