use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities
///
/// Languages are configured either as ISO 639 codes (`es`, `spa`, `fre`)
/// or as plain names (`Spanish`). Prompts get an English name, output
/// filenames get the configured string made filesystem-safe.

/// Source language value meaning "let the model detect it"
pub const AUTO_LANGUAGE: &str = "auto";

/// ISO 639-2/B codes that differ from their 639-2/T form
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Look up an ISO 639-1, 639-2/T or 639-2/B code
fn lookup_code(code: &str) -> Option<Language> {
    let code = code.trim().to_lowercase();
    match code.len() {
        2 => Language::from_639_1(&code),
        3 => {
            let part2t = PART2B_TO_PART2T
                .iter()
                .find(|(bibliographic, _)| *bibliographic == code)
                .map(|(_, terminology)| *terminology)
                .unwrap_or(&code);
            Language::from_639_3(part2t)
        }
        _ => None,
    }
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    lookup_code(code)
        .map(|lang| lang.to_639_3().to_string())
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (lookup_code(code1), lookup_code(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    lookup_code(code)
        .map(|lang| lang.to_name().to_string())
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", code))
}

/// Check that a configured language is a code, a plain name, or `auto`
pub fn validate_language(language: &str, allow_auto: bool) -> Result<()> {
    let trimmed = language.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Language must not be empty"));
    }
    if trimmed.eq_ignore_ascii_case(AUTO_LANGUAGE) {
        return if allow_auto {
            Ok(())
        } else {
            Err(anyhow!("'auto' is only valid as a source language"))
        };
    }
    if lookup_code(trimmed).is_some() {
        return Ok(());
    }
    if trimmed.chars().all(|c| c.is_alphabetic() || c == ' ' || c == '-' || c == '_') {
        return Ok(());
    }
    Err(anyhow!("Invalid language: {}", language))
}

/// Name used when talking to the model: codes become English names
pub fn prompt_language_name(language: &str) -> String {
    get_language_name(language).unwrap_or_else(|_| language.trim().to_string())
}

/// Filesystem-safe tag for output filenames, keeps the configured spelling
pub fn filename_tag(language: &str) -> String {
    language
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
