use std::io;

use glam::IVec3;

/// Errors raised while reading or writing chunk data.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode chunk {position}: {source}")]
    Encode {
        position: IVec3,
        #[source]
        source: bincode::Error,
    },
    #[error("failed to decode chunk {position}: {source}")]
    Decode {
        position: IVec3,
        #[source]
        source: bincode::Error,
    },
    #[error("chunk {0} has malformed block arrays")]
    MalformedChunk(IVec3),
    #[error("store payload claims {expected} bytes but only {available} remain")]
    Truncated { expected: u64, available: u64 },
    #[error("failed to (de)serialize store: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("not a chunk store file")]
    BadMagic,
    #[error("unsupported chunk store version: {0}")]
    UnsupportedVersion(u32),
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot access settings file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid settings data: {0}")]
    Serialization(#[from] bincode::Error),
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("block registry is full, cannot add '{0}'")]
    Full(String),
    #[error("block '{0}' is already registered")]
    DuplicateName(String),
}

/// Reasons a set of chunks cannot form a [`WorldView`](crate::world::WorldView).
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ViewError {
    #[error("chunk {0} is required by the view but was not supplied")]
    MissingChunk(IVec3),
    #[error("chunk {0} was supplied twice")]
    DuplicateChunk(IVec3),
    #[error("chunk {0} lies outside the view region")]
    ForeignChunk(IVec3),
    #[error("chunk {0} is not generated and lit yet")]
    ChunkNotReady(IVec3),
}
