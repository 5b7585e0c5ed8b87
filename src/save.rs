use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Reduce an attachment name to its final path component.
///
/// Returns `None` when nothing usable is left (empty, `..`, a bare `/`).
pub fn safe_file_name(name: &str) -> Option<String> {
    Path::new(name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Split `name` into base and extension the way `photo.tar.gz` → (`photo.tar`, `.gz`).
/// Leading dots belong to the base, so `.hidden` has no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(i) => name.split_at(leading + i),
        None => (name, ""),
    }
}

/// Candidate names for `name` in the order they are tried: `name`, `base_1.ext`, `base_2.ext`, …
fn candidate_name(name: &str, counter: u32) -> String {
    if counter == 0 {
        return name.to_string();
    }
    let (base, ext) = split_extension(name);
    format!("{base}_{counter}{ext}")
}

/// Write `data` into `dir` under `name`, picking the first free suffixed name
/// when `name` is taken. Never replaces an existing file.
pub fn save_new(dir: &Path, name: &str, data: &[u8]) -> Result<PathBuf, String> {
    let mut counter = 0u32;
    loop {
        let path = dir.join(candidate_name(name, counter));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(data)
                    .map_err(|e| format!("write {}: {e}", path.display()))?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                log::debug!("{} exists, trying next suffix", path.display());
                counter = counter
                    .checked_add(1)
                    .ok_or_else(|| format!("no free file name left for {name}"))?;
            }
            Err(e) => return Err(format!("create {}: {e}", path.display())),
        }
    }
}
