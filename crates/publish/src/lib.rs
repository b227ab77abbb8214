//! Replace a directory with the contents of a zip archive.
//!
//! The archive is extracted into a staging sibling of the target and then
//! renamed into place while holding a lock for the target path, so
//! concurrent publishes to one target never interleave their contents.

mod archive;
mod locks;
mod swap;

use std::{
    io,
    path::{Path, PathBuf},
};

pub use locks::PathLocks;

use crate::swap::stage;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("archive entry {0:?} escapes the output directory")]
    UnsafeEntry(String),
    #[error("invalid target path {}", .0.display())]
    InvalidTarget(PathBuf),
    #[error("publish task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub(crate) fn io_error(path: &Path) -> impl Fn(io::Error) -> PublishError + '_ {
    move |source| PublishError::Io { path: path.to_path_buf(), source }
}

/// Extract `archive` and swap it into `target`, returning the number of
/// files published.
///
/// Extraction runs without the lock; only the swap is serialized per target.
pub async fn publish(
    locks: &PathLocks,
    archive: PathBuf,
    target: PathBuf,
) -> Result<usize, PublishError> {
    let staged = tokio::task::spawn_blocking(move || stage(&archive, &target)).await??;
    let guard = locks.lock(staged.target()).await;
    // The guard travels with the blocking task so the lock outlives a
    // cancelled caller until the swap has finished
    let files = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        staged.promote()
    })
    .await??;
    tracing::info!("Published {} files", files);
    Ok(files)
}
