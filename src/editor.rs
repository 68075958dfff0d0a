use bytes::{BufMut, Bytes, BytesMut};
use log::debug;

use crate::completion::Completer;
use crate::prompt::Prompter;

const CTRL_D: u8 = 4;
const BACKSPACE: u8 = 8;
const TAB: u8 = 9;
const ESC: u8 = 27;
const DEL: u8 = 127;

const ERASE: &[u8] = b"\x08 \x08";

#[derive(Debug, PartialEq)]
pub enum Line {
    Accepted(String),
    EndOfInput,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum KeyState {
    Normal,
    EscSeen,
    EscBracketSeen,
}

/// Collects one line from a terminal in raw mode, echoing by hand.
pub struct LineEditor {
    previous: Bytes,
    max_len: usize,
}

impl LineEditor {
    pub fn new(max_len: usize) -> Self {
        return Self {
            previous: Bytes::new(),
            max_len,
        };
    }

    pub fn read_line(
        &mut self,
        prompter: &mut impl Prompter,
        prompt: &str,
        completer: &Completer,
    ) -> anyhow::Result<Line> {
        prompter.prompt(prompt)?;

        let mut buf = BytesMut::with_capacity(self.max_len);
        let mut state = KeyState::Normal;

        loop {
            let Some(byte) = prompter.read_byte()? else {
                debug!("input closed");
                return Ok(Line::EndOfInput);
            };

            match (state, byte) {
                (_, CTRL_D) => return Ok(Line::EndOfInput),
                (KeyState::Normal, ESC) => {
                    state = KeyState::EscSeen;
                    continue;
                }
                (KeyState::EscSeen, b'[') => {
                    state = KeyState::EscBracketSeen;
                    continue;
                }
                (KeyState::EscBracketSeen, b'A') => {
                    self.recall_previous(prompter, &mut buf)?;
                    state = KeyState::Normal;
                    continue;
                }
                _ => state = KeyState::Normal,
            }

            match byte {
                TAB => {
                    let typed = String::from_utf8_lossy(&buf).into_owned();
                    match completer.unique_match(&typed) {
                        Some(found) => {
                            let rest = found.strip_prefix(typed.as_str()).unwrap_or_default();
                            prompter.echo(rest.as_bytes())?;
                            buf.extend_from_slice(rest.as_bytes());
                        }
                        None => {
                            prompter.echo(b"?\n")?;
                            buf.put_u8(b'?');
                            break;
                        }
                    }
                }
                DEL | BACKSPACE => {
                    if erase_last_char(&mut buf) {
                        prompter.echo(ERASE)?;
                    }
                }
                b'\n' => {
                    prompter.echo(b"\n")?;
                    break;
                }
                _ => {
                    prompter.echo(&[byte])?;
                    buf.put_u8(byte);
                }
            }

            if buf.len() >= self.max_len {
                debug!("line reached {} bytes, accepting it", self.max_len);
                prompter.echo(b"\n")?;
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf).into_owned();
        self.previous = buf.freeze();

        return Ok(Line::Accepted(line));
    }

    fn recall_previous(
        &self,
        prompter: &mut impl Prompter,
        buf: &mut BytesMut,
    ) -> anyhow::Result<()> {
        while erase_last_char(buf) {
            prompter.echo(ERASE)?;
        }

        prompter.echo(&self.previous)?;
        buf.extend_from_slice(&self.previous);

        return Ok(());
    }
}

/// Drops the last UTF-8 character from `buf`; false if it was empty.
fn erase_last_char(buf: &mut BytesMut) -> bool {
    if buf.is_empty() {
        return false;
    }

    let mut cut = buf.len() - 1;
    while cut > 0 && buf[cut] & 0xC0 == 0x80 {
        cut -= 1;
    }
    buf.truncate(cut);

    return true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ConsolePrompter;
    use std::fs::File;

    fn read(editor: &mut LineEditor, input: &[u8], completer: &Completer) -> (Line, String) {
        let mut output = Vec::new();
        let mut prompter = ConsolePrompter::new(input, &mut output);

        let line = editor.read_line(&mut prompter, "$ ", completer).unwrap();

        (line, String::from_utf8(output).unwrap())
    }

    fn no_completion() -> Completer {
        Completer::new(Vec::new())
    }

    #[test]
    fn accepts_a_line_on_enter() {
        let mut editor = LineEditor::new(4096);

        let (line, echoed) = read(&mut editor, b"ls -la\n", &no_completion());

        assert_eq!(line, Line::Accepted("ls -la".to_string()));
        assert_eq!(echoed, "$ ls -la\n");
    }

    #[test]
    fn backspace_erases_one_character() {
        let mut editor = LineEditor::new(4096);

        let (line, echoed) = read(&mut editor, b"lx\x7fs\n", &no_completion());

        assert_eq!(line, Line::Accepted("ls".to_string()));
        assert_eq!(echoed, "$ lx\x08 \x08s\n");
    }

    #[test]
    fn backspace_on_empty_line_does_nothing() {
        let mut editor = LineEditor::new(4096);

        let (line, echoed) = read(&mut editor, b"\x7f\x08ok\n", &no_completion());

        assert_eq!(line, Line::Accepted("ok".to_string()));
        assert_eq!(echoed, "$ ok\n");
    }

    #[test]
    fn backspace_removes_a_whole_multibyte_character() {
        let mut editor = LineEditor::new(4096);

        let (line, _) = read(&mut editor, "caf\u{e9}\x7fe\n".as_bytes(), &no_completion());

        assert_eq!(line, Line::Accepted("cafe".to_string()));
    }

    #[test]
    fn up_arrow_recalls_the_previous_line() {
        let mut editor = LineEditor::new(4096);
        read(&mut editor, b"echo hi\n", &no_completion());

        let (line, echoed) = read(&mut editor, b"xy\x1b[A\n", &no_completion());

        assert_eq!(line, Line::Accepted("echo hi".to_string()));
        assert_eq!(echoed, "$ xy\x08 \x08\x08 \x08echo hi\n");
    }

    #[test]
    fn other_escape_sequences_fall_back_to_plain_input() {
        let mut editor = LineEditor::new(4096);

        let (line, _) = read(&mut editor, b"a\x1b[Bb\n", &no_completion());

        assert_eq!(line, Line::Accepted("aBb".to_string()));
    }

    #[test]
    fn ctrl_d_ends_input() {
        let mut editor = LineEditor::new(4096);

        let (line, _) = read(&mut editor, b"\x04", &no_completion());
        assert_eq!(line, Line::EndOfInput);

        let (line, _) = read(&mut editor, b"half\x04rest\n", &no_completion());
        assert_eq!(line, Line::EndOfInput);
    }

    #[test]
    fn closed_input_ends_input() {
        let mut editor = LineEditor::new(4096);

        let (line, _) = read(&mut editor, b"", &no_completion());

        assert_eq!(line, Line::EndOfInput);
    }

    #[test]
    fn tab_appends_a_unique_completion() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("zqfrobnicate")).unwrap();
        let completer = Completer::new(vec![dir.path().to_path_buf()]);
        let mut editor = LineEditor::new(4096);

        let (line, echoed) = read(&mut editor, b"zqfr\t\n", &completer);

        assert_eq!(line, Line::Accepted("zqfrobnicate".to_string()));
        assert_eq!(echoed, "$ zqfrobnicate\n");
    }

    #[test]
    fn ambiguous_tab_ends_the_line_with_a_marker() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("zqfrobnicate")).unwrap();
        File::create(dir.path().join("zqfrobulate")).unwrap();
        let completer = Completer::new(vec![dir.path().to_path_buf()]);
        let mut editor = LineEditor::new(4096);

        let (line, _) = read(&mut editor, b"zqfrob\tignored\n", &completer);

        assert_eq!(line, Line::Accepted("zqfrob?".to_string()));
    }

    #[test]
    fn tab_without_candidates_ends_the_line_with_a_marker() {
        let mut editor = LineEditor::new(4096);

        let (line, echoed) = read(&mut editor, b"zqnone\tignored\n", &no_completion());

        assert_eq!(line, Line::Accepted("zqnone?".to_string()));
        assert_eq!(echoed, "$ zqnone?\n");
    }

    #[test]
    fn long_input_is_cut_at_the_limit() {
        let mut editor = LineEditor::new(4);

        let (line, _) = read(&mut editor, b"abcdefg\n", &no_completion());

        assert_eq!(line, Line::Accepted("abcd".to_string()));
    }
}
