use std::io;
use std::path::{Path, PathBuf};

use log::warn;

use crate::config::Config;

pub trait Prompter {
    /// Next input byte, or `None` once the input is closed.
    fn read_byte(&mut self) -> anyhow::Result<Option<u8>>;
    fn prompt(&mut self, prompt: &str) -> anyhow::Result<()>;
    fn echo(&mut self, bytes: &[u8]) -> anyhow::Result<()>;
}

pub struct ConsolePrompter<R: io::Read, W: io::Write> {
    reader: R,
    writer: W,
}

impl<R: io::Read, W: io::Write> Prompter for ConsolePrompter<R, W> {
    fn read_byte(&mut self) -> anyhow::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn prompt(&mut self, prompt: &str) -> anyhow::Result<()> {
        return self.echo(prompt.as_bytes());
    }

    fn echo(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;

        return Ok(());
    }
}

impl<R: io::Read, W: io::Write> ConsolePrompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        return ConsolePrompter { reader, writer };
    }
}

pub fn prompt_text(user: &str, host: &str, cwd: &Path, shell_name: &str) -> String {
    return format!("{}@{}:{} {}$ ", user, host, cwd.display(), shell_name);
}

/// Builds the prompt for the current host and working directory.
pub fn current_prompt(config: &Config) -> String {
    let host = nix::unistd::gethostname()
        .map(|host| host.to_string_lossy().into_owned())
        .unwrap_or_else(|e| {
            warn!("hostname lookup failed: {}", e);
            "localhost".to_string()
        });
    let cwd = std::env::current_dir().unwrap_or_else(|e| {
        warn!("current directory unavailable: {}", e);
        PathBuf::from("?")
    });

    return prompt_text(&config.user, &host, &cwd, config.shell_name);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompter() {
        let input = b"Hi";
        let mut output = Vec::new();

        let mut prompter = ConsolePrompter::new(input.as_slice(), &mut output);

        prompter.prompt("first line\n").unwrap();
        prompter.echo(b"second line\n").unwrap();

        assert_eq!(prompter.read_byte().unwrap(), Some(b'H'));
        assert_eq!(prompter.read_byte().unwrap(), Some(b'i'));
        assert_eq!(prompter.read_byte().unwrap(), None);

        let written = String::from_utf8(output).unwrap();
        assert_eq!("first line\nsecond line\n", written);
    }

    #[test]
    fn prompt_text_layout() {
        let text = prompt_text("ada", "box", Path::new("/tmp/work"), "psh");

        assert_eq!(text, "ada@box:/tmp/work psh$ ");
    }
}
