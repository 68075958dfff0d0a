use std::io::{self, Write};
use std::os::fd::{AsFd, BorrowedFd};

use env_logger::Env;
use log::debug;

use crate::{
    config::Config,
    editor::{Line, LineEditor},
    executor::{Executor, Status},
    parser::parse,
    prompt::{current_prompt, ConsolePrompter, Prompter},
    terminal::RawModeGuard,
};

mod builtin;
mod command;
mod completion;
mod config;
mod editor;
mod executable;
mod executor;
mod jobs;
mod parser;
mod prompt;
mod redirection;
mod terminal;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().filter_or("PSH_LOG", "warn")).init();

    let config = Config::from_env()?;
    let stdin = io::stdin();
    let mut prompter = ConsolePrompter::new(stdin.lock(), io::stdout());
    let mut executor = Executor::new(config.clone(), io::stdout());

    let status = run_session(&config, stdin.as_fd(), &mut prompter, &mut executor)?;
    debug!("session ended: {:?}", status);

    println!();
    return Ok(());
}

/// Prompt, read, parse and run until end of input or `exit`. Raw mode on
/// `terminal` is held only while a line is being read.
fn run_session<W: Write>(
    config: &Config,
    terminal: BorrowedFd<'_>,
    prompter: &mut impl Prompter,
    executor: &mut Executor<W>,
) -> anyhow::Result<Status> {
    let mut editor = LineEditor::new(config.max_line_len);

    loop {
        executor.reap_background();
        let prompt = current_prompt(config);

        let line = {
            let _raw = RawModeGuard::acquire(terminal)?;
            editor.read_line(prompter, &prompt, executor.completer())?
        };

        let Line::Accepted(line) = line else {
            return Ok(Status::Exit);
        };

        let pipeline = parse(&line);
        debug!("parsed {:?}", pipeline);

        if executor.run(&pipeline)? == Status::Exit {
            return Ok(Status::Exit);
        }
    }
}
