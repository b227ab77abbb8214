use std::{
    fs::{self, File},
    io::{self, BufReader},
    path::Path,
};

use zip::ZipArchive;

use crate::{PublishError, io_error};

/// Extract every entry of the zip archive at `archive` into `dest`,
/// returning the number of files written.
///
/// Fails on the first entry whose path is absolute or climbs out of `dest`;
/// entries written before that point are left for the caller to discard.
pub(crate) fn extract_archive(archive: &Path, dest: &Path) -> Result<usize, PublishError> {
    let file = File::open(archive).map_err(io_error(archive))?;
    let mut zip = ZipArchive::new(BufReader::new(file))?;
    let mut files = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(PublishError::UnsafeEntry(entry.name().to_string()));
        };
        let path = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&path).map_err(io_error(&path))?;
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        let mut out = File::create(&path).map_err(io_error(&path))?;
        io::copy(&mut entry, &mut out).map_err(io_error(&path))?;
        files += 1;
    }
    tracing::debug!("Extracted {} files from {}", files, archive.display());
    Ok(files)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::{Cursor, Write};

    use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

    use super::*;

    pub(crate) fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, contents) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(contents.as_bytes()).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    pub(crate) fn write_zip(dir: &Path, entries: &[(&str, &str)]) -> std::path::PathBuf {
        let path = dir.join("artifact.zip");
        fs::write(&path, zip_bytes(entries)).unwrap();
        path
    }

    #[test]
    fn test_extract_archive() {
        let temp = tempfile::tempdir().unwrap();
        let archive = write_zip(temp.path(), &[
            ("index.html", "<h1>hi</h1>"),
            ("assets/", ""),
            ("assets/style.css", "body {}"),
            ("deep/nested/page.html", "page"),
        ]);
        let dest = temp.path().join("out");
        assert_eq!(extract_archive(&archive, &dest).unwrap(), 3);
        assert_eq!(fs::read_to_string(dest.join("index.html")).unwrap(), "<h1>hi</h1>");
        assert_eq!(fs::read_to_string(dest.join("assets/style.css")).unwrap(), "body {}");
        assert_eq!(fs::read_to_string(dest.join("deep/nested/page.html")).unwrap(), "page");
    }

    #[test]
    fn test_reject_escaping_entry() {
        let temp = tempfile::tempdir().unwrap();
        let archive =
            write_zip(temp.path(), &[("index.html", "ok"), ("../escape.txt", "gotcha")]);
        let dest = temp.path().join("out");
        fs::create_dir(&dest).unwrap();
        let err = extract_archive(&archive, &dest).unwrap_err();
        assert!(matches!(err, PublishError::UnsafeEntry(ref name) if name == "../escape.txt"));
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[test]
    fn test_reject_absolute_entry() {
        let temp = tempfile::tempdir().unwrap();
        let archive = write_zip(temp.path(), &[("/etc/cron.d/job", "* * * * * root true")]);
        let dest = temp.path().join("out");
        assert!(matches!(
            extract_archive(&archive, &dest),
            Err(PublishError::UnsafeEntry(_))
        ));
    }

    #[test]
    fn test_invalid_archive() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("artifact.zip");
        fs::write(&archive, b"definitely not a zip file").unwrap();
        assert!(matches!(
            extract_archive(&archive, &temp.path().join("out")),
            Err(PublishError::Archive(_))
        ));
    }
}
