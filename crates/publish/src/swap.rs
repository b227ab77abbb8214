use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::TempDir;

use crate::{PublishError, archive::extract_archive, io_error};

/// An archive fully extracted next to its target directory, waiting to be
/// swapped in. Dropping it removes the extracted tree.
#[derive(Debug)]
pub(crate) struct StagedDir {
    dir: TempDir,
    target: PathBuf,
    files: usize,
    /// Outermost ancestor of the target created while staging.
    created: Option<PathBuf>,
}

fn split_target(target: &Path) -> Result<(&Path, String), PublishError> {
    match (target.parent(), target.file_name()) {
        (Some(parent), Some(leaf)) if !parent.as_os_str().is_empty() => {
            Ok((parent, leaf.to_string_lossy().into_owned()))
        }
        _ => Err(PublishError::InvalidTarget(target.to_path_buf())),
    }
}

/// Create `dir` with its missing ancestors, returning the outermost one created.
fn create_parents(dir: &Path) -> Result<Option<PathBuf>, PublishError> {
    let outermost = dir
        .ancestors()
        .take_while(|ancestor| !ancestor.as_os_str().is_empty() && !ancestor.exists())
        .last()
        .map(Path::to_path_buf);
    fs::create_dir_all(dir).map_err(io_error(dir))?;
    Ok(outermost)
}

/// Undo [`create_parents`], stopping at the first directory still in use.
fn remove_parents(dir: &Path, outermost: Option<&Path>) {
    let Some(outermost) = outermost else {
        return;
    };
    for ancestor in dir.ancestors() {
        if fs::remove_dir(ancestor).is_err() || ancestor == outermost {
            break;
        }
    }
}

/// Extract `archive` into a fresh hidden sibling of `target`. The sibling
/// lives on the same filesystem so [`StagedDir::promote`] can rename it.
///
/// On failure nothing is left behind, including parent directories this
/// call created.
pub(crate) fn stage(archive: &Path, target: &Path) -> Result<StagedDir, PublishError> {
    let (parent, leaf) = split_target(target)?;
    let created = create_parents(parent)?;
    let staged = tempfile::Builder::new()
        .prefix(&format!(".{leaf}.staging-"))
        .tempdir_in(parent)
        .map_err(io_error(parent))
        .and_then(|dir| {
            let files = extract_archive(archive, dir.path())?;
            Ok((dir, files))
        });
    match staged {
        Ok((dir, files)) => Ok(StagedDir { dir, target: target.to_path_buf(), files, created }),
        Err(e) => {
            remove_parents(parent, created.as_deref());
            Err(e)
        }
    }
}

impl StagedDir {
    pub(crate) fn target(&self) -> &Path { &self.target }

    /// Replace the target directory with the staged tree.
    ///
    /// An existing target is first renamed aside and only deleted once the
    /// staged tree is in place; if promotion fails it is moved back.
    pub(crate) fn promote(self) -> Result<usize, PublishError> {
        let StagedDir { dir, target, files, created } = self;
        let (parent, leaf) = split_target(&target)?;
        let retired = if fs::symlink_metadata(&target).is_ok() {
            let holder = tempfile::Builder::new()
                .prefix(&format!(".{leaf}.old-"))
                .tempdir_in(parent)
                .map_err(io_error(parent))?;
            let previous = holder.path().join(&leaf);
            fs::rename(&target, &previous).map_err(io_error(&target))?;
            Some((holder, previous))
        } else {
            None
        };

        let staged = dir.keep();
        if let Err(e) = fs::rename(&staged, &target) {
            if let Err(e) = fs::remove_dir_all(&staged) {
                tracing::warn!("Failed to remove staging directory {}: {e}", staged.display());
            }
            match &retired {
                Some((_holder, previous)) => {
                    if let Err(e) = fs::rename(previous, &target) {
                        tracing::error!("Failed to restore {}: {e}", target.display());
                    }
                }
                None => remove_parents(parent, created.as_deref()),
            }
            return Err(PublishError::Io { path: target, source: e });
        }
        // Dropping the holder deletes the previous tree
        drop(retired);
        Ok(files)
    }
}
