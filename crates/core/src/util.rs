use std::path::{Component, Path, PathBuf};

/// Resolve the output directory for `branch` under `root`.
///
/// Branch names containing `/` map to nested directories. Returns `None` when
/// the name is empty or any segment is not a plain directory name (`..`, `.`,
/// empty, hidden, absolute or containing a backslash), so the result is always
/// strictly inside `root`.
pub fn branch_dir(root: impl AsRef<Path>, branch: &str) -> Option<PathBuf> {
    if branch.is_empty() || branch.contains(['\\', '\0']) {
        return None;
    }
    let mut out = root.as_ref().to_path_buf();
    for segment in branch.split('/') {
        // Hidden names are reserved for staging directories
        if segment.is_empty() || segment.starts_with('.') {
            return None;
        }
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => out.push(part),
            _ => return None,
        }
    }
    Some(out)
}

/// Human-readable byte count for log lines, in SI units (1 kB = 1000 B).
pub fn size(bytes: u64) -> String {
    const UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];
    let exponent = bytes.checked_ilog10().map_or(0, |digits| digits / 3) as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let scaled = bytes as f64 / 1000f64.powi(exponent as i32);
    format!("{scaled:.2} {}", UNITS[exponent])
}
