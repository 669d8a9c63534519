use thiserror::Error;

use crate::channel::ChannelError;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Instance #{0:02} not found")]
    NotFound(usize),

    #[error("Instance #{0:02} is already running")]
    AlreadyRunning(usize),

    #[error("Command channel of instance #{0:02} is unavailable")]
    ChannelUnavailable(usize),

    #[error("Failed to send command to instance #{id:02}: {source}")]
    SendFailed {
        id: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl OutputError {
    /// Attaches the instance id to a channel level failure.
    pub fn from_channel(id: usize, err: ChannelError) -> Self {
        match err {
            ChannelError::Unavailable => OutputError::ChannelUnavailable(id),
            ChannelError::SendFailed(source) => OutputError::SendFailed { id, source },
        }
    }
}

pub type Result<T> = std::result::Result<T, OutputError>;
