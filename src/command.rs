use std::convert::Infallible;
use std::str::FromStr;

use crate::builtin::Builtin;
use crate::redirection::Redirect;

pub const QUIT_KEYWORD: &str = "exit";

/// One command of a pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stage {
    pub name: String,
    pub args: Vec<String>,
    pub background: bool,
    pub autocomplete: bool,
    pub stdin: Redirect,
    pub stdout: Redirect,
}

impl Stage {
    pub fn is_empty(&self) -> bool {
        return self.name.is_empty();
    }

    /// The name without its trailing `?` when this stage asks for completion.
    pub fn completion_stem(&self) -> Option<&str> {
        if !self.autocomplete {
            return None;
        }

        return self.name.strip_suffix('?');
    }

    pub fn kind(&self) -> CommandKind {
        return match self.name.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        };
    }
}

/// Stages in left-to-right pipe order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        return Self { stages };
    }

    pub fn stages(&self) -> &[Stage] {
        return &self.stages;
    }

    pub fn len(&self) -> usize {
        return self.stages.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.stages.iter().all(Stage::is_empty);
    }

    pub fn is_background(&self) -> bool {
        return self.stages.last().is_some_and(|stage| stage.background);
    }
}

#[derive(Debug, PartialEq)]
pub enum CommandKind {
    Empty,
    Quit,
    ChangeDir,
    Builtin(Builtin),
    External,
}

impl FromStr for CommandKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "" => CommandKind::Empty,
            QUIT_KEYWORD => CommandKind::Quit,
            "cd" => CommandKind::ChangeDir,
            name => match name.parse::<Builtin>() {
                Ok(builtin) => CommandKind::Builtin(builtin),
                Err(_) => CommandKind::External,
            },
        };

        return Ok(kind);
    }
}
