use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail};
use log::debug;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use rand::seq::SliceRandom;
use tempfile::NamedTempFile;

use crate::jobs::BackgroundJobs;

/// Names offered by completion.
pub const BUILTIN_NAMES: [&str; 6] = ["alarm", "myjobs", "mybg", "myfg", "pause", "motivate"];

const TODO_FILE: &str = ".todo";
const MOTIVATE_FILE: &str = ".motivate";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Builtin {
    Alarm,
    MyJobs,
    MyBg,
    MyFg,
    Pause,
    Motivate,
    Todo,
}

impl FromStr for Builtin {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alarm" => Ok(Builtin::Alarm),
            "myjobs" => Ok(Builtin::MyJobs),
            "mybg" => Ok(Builtin::MyBg),
            "myfg" => Ok(Builtin::MyFg),
            "pause" => Ok(Builtin::Pause),
            "motivate" => Ok(Builtin::Motivate),
            "todo" => Ok(Builtin::Todo),
            _ => Err(anyhow!("{} is not a builtin", s)),
        }
    }
}

pub struct BuiltinContext<'a> {
    pub user: &'a str,
    pub notes_dir: &'a Path,
    pub jobs: &'a mut BackgroundJobs,
}

impl Builtin {
    pub fn run(
        self,
        args: &[String],
        ctx: &mut BuiltinContext,
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        debug!("builtin {:?} with {:?}", self, args);

        match self {
            Builtin::Alarm => run_alarm(args, out),
            Builtin::MyJobs => run_myjobs(ctx.user),
            Builtin::Pause => signal_pid(args, Signal::SIGTSTP, "pause", out),
            Builtin::MyBg => signal_pid(args, Signal::SIGCONT, "mybg", out),
            Builtin::MyFg => run_myfg(args, ctx.jobs, out),
            Builtin::Motivate => run_motivate(args, ctx.notes_dir, out),
            Builtin::Todo => run_todo(args, ctx.notes_dir, out),
        }
    }
}

fn run_alarm(args: &[String], out: &mut impl Write) -> anyhow::Result<()> {
    let [time, sound] = args else {
        writeln!(out, "usage: alarm HH.MM sound-file")?;
        return Ok(());
    };
    let Some((hour, minute)) = parse_alarm_time(time) else {
        writeln!(out, "usage: alarm HH.MM sound-file")?;
        return Ok(());
    };

    let sound = std::env::current_dir()?.join(sound);
    let listed = Command::new("crontab").arg("-l").output()?;
    let mut table = NamedTempFile::new()?;
    if listed.status.success() {
        table.write_all(&listed.stdout)?;
    }
    writeln!(table, "{}", cron_line(hour, minute, &sound))?;
    table.flush()?;

    let status = Command::new("crontab").arg(table.path()).status()?;
    if !status.success() {
        bail!("crontab exited with {}", status);
    }

    writeln!(out, "alarm set.")?;
    return Ok(());
}

fn parse_alarm_time(time: &str) -> Option<(u8, u8)> {
    let (hour, minute) = time.split_once('.')?;
    let hour: u8 = hour.parse().ok()?;
    let minute: u8 = minute.parse().ok()?;

    return (hour < 24 && minute < 60).then_some((hour, minute));
}

fn cron_line(hour: u8, minute: u8, sound: &Path) -> String {
    return format!("{} {} * * * aplay {}", minute, hour, sound.display());
}

fn run_myjobs(user: &str) -> anyhow::Result<()> {
    let status = Command::new("ps")
        .args(["-U", user, "-o", "pid,cmd,stat"])
        .status()?;
    if !status.success() {
        bail!("ps exited with {}", status);
    }

    return Ok(());
}

fn parse_pid(args: &[String]) -> Option<Pid> {
    let pid: i32 = args.first()?.parse().ok()?;

    return (pid > 0).then(|| Pid::from_raw(pid));
}

fn signal_pid(
    args: &[String],
    sig: Signal,
    name: &str,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let Some(pid) = parse_pid(args) else {
        writeln!(out, "usage: {} pid", name)?;
        return Ok(());
    };

    signal::kill(pid, sig)?;
    return Ok(());
}

fn run_myfg(
    args: &[String],
    jobs: &mut BackgroundJobs,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let Some(pid) = parse_pid(args) else {
        writeln!(out, "usage: myfg pid")?;
        return Ok(());
    };

    signal::kill(pid, Signal::SIGCONT)?;

    if let Some(status) = jobs.wait_for(pid.as_raw() as u32)? {
        debug!("[{}] finished in foreground: {}", pid, status);
        return Ok(());
    }

    // Not our child: poll until it is gone.
    loop {
        match signal::kill(pid, None) {
            Ok(()) => thread::sleep(Duration::from_millis(100)),
            Err(Errno::ESRCH) => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
}

fn run_motivate(args: &[String], notes_dir: &Path, out: &mut impl Write) -> anyhow::Result<()> {
    let notes = Notes::new(notes_dir.join(MOTIVATE_FILE));

    match args.first().map(String::as_str) {
        None => match notes.random_entry()? {
            Some(quote) => writeln!(out, "{}", quote)?,
            None => writeln!(out, "no motivational quotes yet")?,
        },
        Some("add") if args.len() > 1 => {
            let number = notes.add(&args[1..].join(" "))?;
            writeln!(out, "added quote {}", number)?;
        }
        Some("delete") => delete_entry(&notes, args, "motivate", out)?,
        Some(_) => writeln!(out, "usage: motivate [add text... | delete n]")?,
    }

    return Ok(());
}

fn run_todo(args: &[String], notes_dir: &Path, out: &mut impl Write) -> anyhow::Result<()> {
    let notes = Notes::new(notes_dir.join(TODO_FILE));

    match args.first().map(String::as_str) {
        Some("add") if args.len() > 1 => {
            let number = notes.add(&args[1..].join(" "))?;
            writeln!(out, "added todo {}", number)?;
        }
        Some("see") => {
            for line in notes.lines()? {
                writeln!(out, "{}", line)?;
            }
        }
        Some("delete") => delete_entry(&notes, args, "todo", out)?,
        _ => writeln!(out, "usage: todo add text... | todo see | todo delete n")?,
    }

    return Ok(());
}

fn delete_entry(
    notes: &Notes,
    args: &[String],
    name: &str,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let Some(number) = args.get(1).and_then(|n| n.parse::<u32>().ok()) else {
        writeln!(out, "usage: {} delete n", name)?;
        return Ok(());
    };

    if notes.delete(number)? {
        writeln!(out, "deleted {} {}", name, number)?;
    } else {
        writeln!(out, "{}: no entry {}", name, number)?;
    }

    return Ok(());
}

/// A file of numbered lines, `<n> <text>`.
struct Notes {
    path: PathBuf,
}

impl Notes {
    fn new(path: PathBuf) -> Self {
        return Self { path };
    }

    fn lines(&self) -> io::Result<Vec<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => return Ok(content.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        }
    }

    fn add(&self, text: &str) -> io::Result<u32> {
        let number = self
            .lines()?
            .last()
            .and_then(|line| entry_number(line))
            .map_or(1, |last| last + 1);

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        writeln!(file, "{} {}", number, text)?;

        return Ok(number);
    }

    fn delete(&self, number: u32) -> io::Result<bool> {
        let lines = self.lines()?;
        let kept: Vec<&String> = lines
            .iter()
            .filter(|line| entry_number(line) != Some(number))
            .collect();
        if kept.len() == lines.len() {
            return Ok(false);
        }

        let mut content = String::new();
        for line in kept {
            content.push_str(line);
            content.push('\n');
        }
        fs::write(&self.path, content)?;

        return Ok(true);
    }

    fn random_entry(&self) -> io::Result<Option<String>> {
        let lines = self.lines()?;
        let Some(line) = lines.choose(&mut rand::thread_rng()) else {
            return Ok(None);
        };

        let text = match line.split_once(' ') {
            Some((number, text)) if number.parse::<u32>().is_ok() => text,
            _ => line.as_str(),
        };

        return Ok(Some(text.to_string()));
    }
}

fn entry_number(line: &str) -> Option<u32> {
    return line.split_whitespace().next()?.parse().ok();
}
