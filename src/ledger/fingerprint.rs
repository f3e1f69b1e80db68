use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::language_utils::filename_tag;

/// Hex characters of the fingerprint that appear in output filenames
pub const FINGERPRINT_NAME_LEN: usize = 8;

/// SHA-256 of a subtitle file's normalized content
///
/// A UTF-8 byte-order mark is dropped and CRLF becomes LF before hashing, so
/// the same subtitles saved on different platforms share one fingerprint.
/// Every other byte counts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

        let mut hasher = Sha256::new();
        let mut rest = body;
        while let Some(pos) = rest.windows(2).position(|w| w == b"\r\n") {
            hasher.update(&rest[..pos]);
            hasher.update(b"\n");
            rest = &rest[pos + 2..];
        }
        hasher.update(rest);

        Fingerprint(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Prefix used in output filenames
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(FINGERPRINT_NAME_LEN);
        hex
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Output filename `{stem}_{sourceTag}{targetTag}_{fingerprint8}.{ext}`
pub fn output_file_name(input: &Path, source_language: &str, target_language: &str, fingerprint: &Fingerprint) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "subtitles".to_string());
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "srt".to_string());

    format!(
        "{}_{}{}_{}.{}",
        stem,
        filename_tag(source_language),
        filename_tag(target_language),
        fingerprint.short(),
        extension
    )
}

/// Full output path inside `output_dir`
pub fn output_path(
    input: &Path,
    output_dir: &Path,
    source_language: &str,
    target_language: &str,
    fingerprint: &Fingerprint,
) -> PathBuf {
    output_dir.join(output_file_name(input, source_language, target_language, fingerprint))
}

/// Recognizes files this pipeline wrote
///
/// Matches outputs of the configured language pair, whatever its tags look
/// like, and outputs of any pair of ISO 639 codes (`auto` allowed as the
/// source), so earlier runs into other languages are not fed back in.
#[derive(Debug, Clone)]
pub struct OutputNameMatcher {
    pattern: Regex,
}

impl OutputNameMatcher {
    pub fn new(source_language: &str, target_language: &str) -> Result<Self, regex::Error> {
        let tags = format!("{}{}", filename_tag(source_language), filename_tag(target_language));
        let pattern = Regex::new(&format!(
            r"^.+_(?:{}|(?i:auto|[a-z]{{2,3}})(?i:[a-z]{{2,3}}))_[0-9a-f]{{{}}}\.[^.]+$",
            regex::escape(&tags),
            FINGERPRINT_NAME_LEN
        ))?;
        Ok(Self { pattern })
    }

    pub fn is_output(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.pattern.is_match(&name.to_string_lossy()))
            .unwrap_or(false)
    }
}
