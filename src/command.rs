//! The command under supervision, parsed once from the invocation arguments.

use thiserror::Error;

/// Errors from command-line validation.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("no program supplied: expected <program> [args...]")]
    Empty,
}

/// Program name plus arguments. Immutable after startup; every restart
/// spawns the same command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Split an argv-style list into program and arguments.
    ///
    /// Refuses an empty list: a supervisor without a command to run
    /// has nothing to do.
    pub fn from_argv(argv: &[String]) -> Result<Self, CommandError> {
        let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
