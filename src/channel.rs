use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("command channel is unavailable")]
    Unavailable,

    #[error("failed to write to command channel: {0}")]
    SendFailed(#[source] std::io::Error),
}

/// Outbound, non-blocking, one byte per command signalling endpoint backed by
/// a named pipe.
///
/// The channel is either open for writing or unavailable. It becomes
/// unavailable when the pipe could not be opened or when the reader on the
/// other end went away.
#[derive(Debug)]
pub struct CommandChannel {
    path: Option<PathBuf>,
    writer: Mutex<Option<File>>,
}

impl CommandChannel {
    /// Creates the fifo at `path` if it does not exist and opens it for
    /// non-blocking writes.
    ///
    /// Failing to open the pipe is not an error: a fifo without an attached
    /// reader refuses non-blocking writers, in which case the channel starts
    /// out unavailable and only command support is degraded.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        match mkfifo(path, Mode::S_IRWXU) {
            Ok(()) => debug!("created named pipe: {}", path.display()),
            Err(Errno::EEXIST) => debug!("reusing existing named pipe: {}", path.display()),
            Err(err) => warn!("failed to create named pipe {}: {}", path.display(), err),
        }

        let writer = OpenOptions::new()
            .write(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(path);

        let writer = match writer {
            Ok(file) => Some(file),
            Err(err) => {
                warn!("unable to open named pipe {}: {}", path.display(), err);
                None
            }
        };

        Self {
            path: Some(path.to_path_buf()),
            writer: Mutex::new(writer),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            path: None,
            writer: Mutex::new(None),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.writer.lock().is_some()
    }

    /// Writes exactly one byte without blocking.
    pub fn send(&self, symbol: u8) -> Result<(), ChannelError> {
        let mut writer = self.writer.lock();
        let file = writer.as_mut().ok_or(ChannelError::Unavailable)?;

        match file.write(&[symbol]) {
            Ok(1) => Ok(()),
            Ok(_) => Err(ChannelError::SendFailed(ErrorKind::WriteZero.into())),
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                // reader is gone, the handle is of no further use
                warn!("named pipe lost its reader, closing it");
                *writer = None;
                Err(ChannelError::Unavailable)
            }
            Err(err) => Err(ChannelError::SendFailed(err)),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Read;

    use super::*;

    /// Creates a fifo and attaches a non-blocking reader to it, so that a
    /// writer can subsequently be opened.
    pub(crate) fn fifo_with_reader(path: &Path) -> File {
        mkfifo(path, Mode::S_IRWXU).expect("failed to create fifo");
        OpenOptions::new()
            .read(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(path)
            .expect("failed to open fifo reader")
    }

    /// Drains everything currently buffered in the pipe.
    pub(crate) fn drain(reader: &mut File) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 64];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => panic!("failed to read fifo: {err}"),
            }
        }
        out
    }

    #[test]
    fn sends_a_single_byte_without_framing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmd.fifo");
        let mut reader = fifo_with_reader(&path);

        let channel = CommandChannel::open(&path);
        assert!(channel.is_available());
        assert_eq!(channel.path(), Some(path.as_path()));

        channel.send(b'f').unwrap();
        assert_eq!(drain(&mut reader), vec![b'f']);
        assert!(drain(&mut reader).is_empty());
    }

    #[test]
    fn preserves_order_of_consecutive_sends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmd.fifo");
        let mut reader = fifo_with_reader(&path);

        let channel = CommandChannel::open(&path);
        for symbol in [b'f', b'l', b'z'] {
            channel.send(symbol).unwrap();
        }

        assert_eq!(drain(&mut reader), b"flz".to_vec());
    }

    #[test]
    fn concurrent_sends_each_land_as_one_whole_byte() {
        const THREADS: u8 = 8;
        const SENDS: usize = 256;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmd.fifo");
        let mut reader = fifo_with_reader(&path);
        let channel = CommandChannel::open(&path);

        std::thread::scope(|scope| {
            for t in 0..THREADS {
                let channel = &channel;
                scope.spawn(move || {
                    for _ in 0..SENDS {
                        channel.send(b'a' + t).unwrap();
                    }
                });
            }
        });

        let received = drain(&mut reader);
        assert_eq!(received.len(), THREADS as usize * SENDS);
        for t in 0..THREADS {
            let count = received.iter().filter(|b| **b == b'a' + t).count();
            assert_eq!(count, SENDS, "symbol {:?}", (b'a' + t) as char);
        }
    }

    #[test]
    fn creates_fifo_and_degrades_without_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-reader.fifo");

        let channel = CommandChannel::open(&path);

        let file_type = std::fs::metadata(&path).unwrap().file_type();
        assert!(std::os::unix::fs::FileTypeExt::is_fifo(&file_type));
        assert!(!channel.is_available());
        assert!(matches!(channel.send(b'f'), Err(ChannelError::Unavailable)));
    }

    #[test]
    fn degrades_when_directory_does_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("cmd.fifo");

        let channel = CommandChannel::open(&path);
        assert!(!channel.is_available());
    }

    #[test]
    fn unavailable_sentinel_fails_immediately() {
        let channel = CommandChannel::unavailable();
        assert!(channel.path().is_none());
        assert!(!channel.is_available());
        assert!(matches!(channel.send(b'x'), Err(ChannelError::Unavailable)));
    }

    #[test]
    fn becomes_unavailable_when_reader_goes_away() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmd.fifo");
        let reader = fifo_with_reader(&path);

        let channel = CommandChannel::open(&path);
        assert!(channel.is_available());

        drop(reader);

        assert!(matches!(channel.send(b'f'), Err(ChannelError::Unavailable)));
        assert!(!channel.is_available());
    }

    #[test]
    fn full_pipe_is_a_recoverable_send_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmd.fifo");
        let mut reader = fifo_with_reader(&path);

        let channel = CommandChannel::open(&path);

        let mut failure = None;
        for _ in 0..(1 << 20) {
            if let Err(err) = channel.send(b's') {
                failure = Some(err);
                break;
            }
        }

        match failure {
            Some(ChannelError::SendFailed(err)) => assert_eq!(err.kind(), ErrorKind::WouldBlock),
            other => panic!("expected a would-block send failure, got {other:?}"),
        }

        // still usable once the reader catches up
        assert!(channel.is_available());
        drain(&mut reader);
        channel.send(b'f').unwrap();
        assert_eq!(drain(&mut reader), vec![b'f']);
    }
}
