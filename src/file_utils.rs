use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> io::Result<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() || path.exists() {
            return Ok(());
        }
        fs::create_dir_all(path)
    }

    // @converts: Shell glob (`*`, `?`, `[abc]`) to an anchored regex
    pub fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
        let mut regex = String::from("^");
        let mut in_class = false;
        for c in pattern.chars() {
            match c {
                '*' if !in_class => regex.push_str(".*"),
                '?' if !in_class => regex.push('.'),
                '[' if !in_class => {
                    in_class = true;
                    regex.push('[');
                }
                ']' if in_class => {
                    in_class = false;
                    regex.push(']');
                }
                '!' if in_class && regex.ends_with('[') => regex.push('^'),
                _ if in_class => regex.push(c),
                _ => regex.push_str(&regex::escape(&c.to_string())),
            }
        }
        regex.push('$');
        Regex::new(&regex)
    }

    /// Files under `dir` whose name matches `pattern`, sorted by path
    pub fn find_files_matching<P: AsRef<Path>>(dir: P, pattern: &str, recursive: bool) -> io::Result<Vec<PathBuf>> {
        let matcher =
            Self::glob_to_regex(pattern).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let max_depth = if recursive { usize::MAX } else { 1 };

        let mut result = Vec::new();
        for entry in WalkDir::new(dir.as_ref()).follow_links(true).max_depth(max_depth) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if matcher.is_match(&entry.file_name().to_string_lossy()) {
                result.push(entry.into_path());
            }
        }

        result.sort();
        Ok(result)
    }

    /// Read a whole file into memory
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    /// Write a file so that readers never observe partial content
    ///
    /// The data goes to a sibling temp file which is then renamed over the
    /// destination.
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &[u8]) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            Self::ensure_dir(parent)?;
        }

        let file_name = path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name"))?;
        let mut temp_name = file_name.to_os_string();
        temp_name.push(format!(".tmp-{}", std::process::id()));
        let temp_path = path.with_file_name(temp_name);

        if let Err(e) = fs::write(&temp_path, content).and_then(|_| fs::rename(&temp_path, path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        Ok(())
    }
}
