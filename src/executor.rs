use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{self, Child, Stdio};

use log::{debug, error, info, warn};

use crate::builtin::{Builtin, BuiltinContext};
use crate::command::{CommandKind, Pipeline, Stage};
use crate::completion::Completer;
use crate::config::Config;
use crate::executable::{ExecutableError, ExecutablePathFinder, PathFinder};
use crate::jobs::BackgroundJobs;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    Success,
    Exit,
    Unknown,
}

/// Runs parsed pipelines: builtins in-process, everything else as one child
/// process per stage.
pub struct Executor<W: Write> {
    config: Config,
    finder: PathFinder,
    completer: Completer,
    jobs: BackgroundJobs,
    out: W,
}

impl<W: Write> Executor<W> {
    pub fn new(config: Config, out: W) -> Self {
        let completer = Completer::new(config.search_path.clone());

        return Self {
            config,
            finder: PathFinder::new(),
            completer,
            jobs: BackgroundJobs::new(),
            out,
        };
    }

    pub fn completer(&self) -> &Completer {
        return &self.completer;
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        return &self.out;
    }

    pub fn reap_background(&mut self) {
        if self.jobs.is_empty() {
            return;
        }

        for (pid, status) in self.jobs.reap() {
            debug!("reaped [{}]: {}", pid, status);
        }
        debug!("{} background children still running", self.jobs.len());
    }

    pub fn run(&mut self, pipeline: &Pipeline) -> anyhow::Result<Status> {
        if pipeline.is_empty() {
            return Ok(Status::Success);
        }

        let background = pipeline.is_background();
        let stages = pipeline.stages();
        let mut status = Status::Success;
        let mut children: Vec<Child> = Vec::with_capacity(pipeline.len());
        let mut upstream: Option<Stdio> = None;

        // Every stage is spawned before any is waited on, so a writer never
        // blocks on a pipe whose reader does not exist yet.
        for (index, stage) in stages.iter().enumerate() {
            let incoming = upstream.take();
            let is_first = index == 0;
            let is_last = index + 1 == stages.len();

            match stage.kind() {
                CommandKind::Empty => continue,
                CommandKind::Quit => {
                    status = Status::Exit;
                    break;
                }
                CommandKind::ChangeDir => {
                    self.change_dir(stage)?;
                    continue;
                }
                CommandKind::Builtin(builtin) => {
                    status = self.run_builtin(builtin, stage)?;
                    continue;
                }
                CommandKind::External => {}
            }

            if let Some(stem) = stage.completion_stem() {
                self.list_candidates(stem)?;
                continue;
            }

            let Some(program) = self
                .finder
                .find_executable_path(&self.config.search_path, &stage.name)
            else {
                let error = ExecutableError::CommandNotFound(stage.name.clone());
                writeln!(self.out, "-{}: {}", self.config.shell_name, error)?;
                status = Status::Unknown;
                break;
            };

            let stdin = match incoming {
                Some(stdin) => stdin,
                None if is_first && !background => Stdio::inherit(),
                None => Stdio::null(),
            };

            match spawn_stage(stage, &program, stdin, is_last) {
                Ok(mut child) => {
                    info!("[{}] {}", child.id(), program.display());
                    if !is_last {
                        upstream = child.stdout.take().map(Stdio::from);
                    }
                    children.push(child);
                }
                Err(e) => {
                    warn!("stage {} not started: {}", stage.name, e);
                    writeln!(self.out, "-{}: {}", self.config.shell_name, e)?;
                    status = Status::Unknown;
                }
            }
        }
        drop(upstream);
        self.out.flush()?;

        if background {
            for child in children {
                self.jobs.adopt(child);
            }
            return Ok(status);
        }

        for mut child in children {
            match child.wait() {
                Ok(exit) => debug!("[{}] exited: {}", child.id(), exit),
                Err(e) => error!("[{}] wait failed: {}", child.id(), e),
            }
        }

        return Ok(status);
    }

    fn change_dir(&mut self, stage: &Stage) -> anyhow::Result<()> {
        let target = match stage.args.first() {
            Some(dir) => PathBuf::from(dir),
            None => match &self.config.home {
                Some(home) => home.clone(),
                None => {
                    writeln!(self.out, "-{}: cd: HOME not set", self.config.shell_name)?;
                    return Ok(());
                }
            },
        };

        if let Err(e) = std::env::set_current_dir(&target) {
            writeln!(
                self.out,
                "-{}: cd: {}: {}",
                self.config.shell_name,
                target.display(),
                e
            )?;
        }

        return Ok(());
    }

    fn run_builtin(&mut self, builtin: Builtin, stage: &Stage) -> anyhow::Result<Status> {
        let mut ctx = BuiltinContext {
            user: &self.config.user,
            notes_dir: &self.config.notes_dir,
            jobs: &mut self.jobs,
        };

        match builtin.run(&stage.args, &mut ctx, &mut self.out) {
            Ok(()) => return Ok(Status::Success),
            Err(e) => {
                writeln!(self.out, "-{}: {}: {:#}", self.config.shell_name, stage.name, e)?;
                return Ok(Status::Unknown);
            }
        }
    }

    fn list_candidates(&mut self, stem: &str) -> anyhow::Result<()> {
        let candidates = self.completer.matches(stem);

        if candidates.is_empty() {
            writeln!(self.out, "No matches!")?;
            return Ok(());
        }

        // A fully typed command gets the directory listing instead.
        if candidates.iter().any(|candidate| candidate == stem) {
            return self.list_directory(std::env::current_dir());
        }

        writeln!(self.out, "matching commands:")?;
        for candidate in candidates {
            writeln!(self.out, "{}", candidate)?;
        }

        return Ok(());
    }

    /// A missing or unreadable directory is reported, never fatal.
    fn list_directory(&mut self, cwd: io::Result<PathBuf>) -> anyhow::Result<()> {
        match cwd.and_then(|dir| directory_entries(&dir)) {
            Ok(names) => {
                for name in names {
                    writeln!(self.out, "{}", name)?;
                }
            }
            Err(e) => {
                warn!("directory listing failed: {}", e);
                writeln!(self.out, "-{}: {}", self.config.shell_name, e)?;
            }
        }

        return Ok(());
    }
}

fn spawn_stage(
    stage: &Stage,
    program: &Path,
    stdin: Stdio,
    is_last: bool,
) -> Result<Child, ExecutableError> {
    let stdin = match stage.stdin.open()? {
        Some(file) => Stdio::from(file),
        None => stdin,
    };
    let stdout = match stage.stdout.open()? {
        Some(file) => Stdio::from(file),
        None if is_last => Stdio::inherit(),
        None => Stdio::piped(),
    };

    return process::Command::new(program)
        .args(&stage.args)
        .stdin(stdin)
        .stdout(stdout)
        .spawn()
        .map_err(|source| ExecutableError::Spawn {
            name: stage.name.clone(),
            source,
        });
}

fn directory_entries(dir: &Path) -> io::Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    return Ok(names);
}
