use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions for a single rollover invocation.
///
/// Recoverable conditions (a corrupt quarter file, a retention delete that
/// fails) never surface here; they are reported as warn events instead.
#[derive(Debug, Error)]
pub enum RolloverError {
    #[error("configuration invalid or unreadable")]
    InvalidConfig(#[source] anyhow::Error),
    #[error("remote read failed at `{path}`")]
    RemoteRead {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("remote write failed at `{path}`")]
    RemoteWrite {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("local archive write failed at {}", .path.display())]
    LocalWrite {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl RolloverError {
    pub fn code(&self) -> RolloverErrorCode {
        match self {
            Self::InvalidConfig(_) => RolloverErrorCode::E001InvalidConfig,
            Self::RemoteRead { .. } => RolloverErrorCode::E002RemoteRead,
            Self::RemoteWrite { .. } => RolloverErrorCode::E003RemoteWrite,
            Self::LocalWrite { .. } => RolloverErrorCode::E004LocalWrite,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloverErrorCode {
    E001InvalidConfig,
    E002RemoteRead,
    E003RemoteWrite,
    E004LocalWrite,
}

impl RolloverErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001InvalidConfig => "E001_INVALID_CONFIG",
            Self::E002RemoteRead => "E002_REMOTE_READ",
            Self::E003RemoteWrite => "E003_REMOTE_WRITE",
            Self::E004LocalWrite => "E004_LOCAL_WRITE",
        }
    }
}
