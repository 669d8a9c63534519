use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::sync::Arc;

use mjpeg_output::global::GlobalState;
use mjpeg_output::instance::InstanceContext;
use mjpeg_output::lifecycle::Worker;
use mjpeg_output::plugin::OutputPlugin;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use tokio_util::sync::CancellationToken;

pub const CAPACITY: usize = 4;

/// Stands in for the external process reading the command pipe.
pub struct PipeReader {
    file: File,
}

impl PipeReader {
    pub fn attach(path: &Path) -> Self {
        if !path.exists() {
            mkfifo(path, Mode::S_IRWXU).expect("failed to create fifo");
        }

        let file = OpenOptions::new()
            .read(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(path)
            .expect("failed to open fifo for reading");

        Self { file }
    }

    /// Everything written since the last call.
    pub fn received(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 64];
        loop {
            match self.file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => panic!("failed to read fifo: {err}"),
            }
        }
        out
    }
}

/// Keeps running until cancelled, like a server without clients.
pub struct IdleWorker;

#[async_trait::async_trait]
impl Worker for IdleWorker {
    async fn run(&self, _: Arc<InstanceContext>, cancel: CancellationToken) -> anyhow::Result<()> {
        cancel.cancelled().await;
        Ok(())
    }
}

pub fn plugin() -> OutputPlugin {
    OutputPlugin::new(
        Arc::new(GlobalState::new(CAPACITY)),
        CAPACITY,
        Arc::new(IdleWorker),
    )
}
