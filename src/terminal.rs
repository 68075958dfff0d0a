use std::os::fd::BorrowedFd;

use log::{debug, error};
use nix::errno::Errno;
use nix::sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices, Termios};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerminalError {
    #[error("could not read terminal settings: {0}")]
    GetAttr(#[source] nix::Error),

    #[error("could not change terminal settings: {0}")]
    SetAttr(#[source] nix::Error),
}

/// Holds the terminal in raw mode (no canonical buffering, no echo) and puts
/// the saved settings back when dropped.
pub struct RawModeGuard<'fd> {
    fd: BorrowedFd<'fd>,
    saved: Option<Termios>,
}

impl<'fd> RawModeGuard<'fd> {
    pub fn acquire(fd: BorrowedFd<'fd>) -> Result<Self, TerminalError> {
        let saved = match termios::tcgetattr(fd) {
            Ok(saved) => saved,
            Err(Errno::ENOTTY) => {
                debug!("input is not a terminal, raw mode skipped");
                return Ok(Self { fd, saved: None });
            }
            Err(e) => return Err(TerminalError::GetAttr(e)),
        };

        let mut raw = saved.clone();
        raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
        // One byte per read, no timeout.
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        termios::tcsetattr(fd, SetArg::TCSANOW, &raw).map_err(TerminalError::SetAttr)?;
        debug!("raw mode on");

        return Ok(Self {
            fd,
            saved: Some(saved),
        });
    }
}

impl Drop for RawModeGuard<'_> {
    fn drop(&mut self) {
        let Some(saved) = self.saved.take() else {
            return;
        };

        match termios::tcsetattr(self.fd, SetArg::TCSANOW, &saved) {
            Ok(()) => debug!("raw mode off"),
            Err(e) => error!("failed to restore terminal settings: {}", e),
        }
    }
}
