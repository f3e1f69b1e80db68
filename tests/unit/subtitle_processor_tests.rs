/*!
 * Tests for the SRT document model
 */

use anyhow::Result;
use std::fmt::Write;

use srtlingo::errors::SubtitleError;
use srtlingo::subtitle_processor::{SubtitleDocument, SubtitleEntry};

const MULTILINE_SRT: &str = "1\n00:00:01,000 --> 00:00:02,500\n<i>First line</i>\nSecond line\n\n2\n00:01:02,003 --> 00:01:04,000\n{\\an8}Top\n";

/// Test timestamp parsing and formatting
#[test]
fn test_timestampParsing_withValidTimestamp_shouldParseAndFormat() {
    let ts = "01:23:45,678";
    let ms = SubtitleEntry::parse_timestamp(ts).unwrap();
    assert_eq!(ms, 5_025_678);
    assert_eq!(SubtitleEntry::format_timestamp(ms), ts);
}

/// Test subtitle entry display formatting
#[test]
fn test_subtitleEntryDisplay_withValidEntry_shouldFormatBlock() {
    let entry = SubtitleEntry::new(1, 5000, 10000, "Test subtitle");
    let mut output = String::new();
    write!(output, "{}", entry).unwrap();

    assert_eq!(output, "1\n00:00:05,000 --> 00:00:10,000\nTest subtitle\n\n");
}

#[test]
fn test_parseAndSerialize_withMultilineMarkup_shouldRoundTrip() -> Result<()> {
    let doc = SubtitleDocument::parse(MULTILINE_SRT.as_bytes())?;
    assert_eq!(doc.len(), 2);
    assert_eq!(doc.entries()[0].text, "<i>First line</i>\nSecond line");
    assert_eq!(doc.entries()[1].start_time_ms, 62_003);

    let reparsed = SubtitleDocument::parse(&doc.to_srt_bytes())?;
    assert_eq!(reparsed, doc);
    Ok(())
}

#[test]
fn test_parse_withCrlfAndBom_shouldMatchPlainInput() -> Result<()> {
    let windows = format!("\u{feff}{}", MULTILINE_SRT.replace('\n', "\r\n"));
    let plain = SubtitleDocument::parse(MULTILINE_SRT.as_bytes())?;
    let variant = SubtitleDocument::parse(windows.as_bytes())?;
    assert_eq!(plain, variant);
    Ok(())
}

#[test]
fn test_parse_withMalformedTiming_shouldReportLine() {
    let content = "1\n00:00:01,000 --> 00:00:02,000\nOk\n\n2\n00:00:03 -> 00:00:04\nBroken\n";
    let err = SubtitleDocument::parse(content.as_bytes()).unwrap_err();
    assert!(matches!(err, SubtitleError::Parse { line: 6, .. }), "{err:?}");
}

#[test]
fn test_parse_withEmptyInput_shouldGiveEmptyDocument() -> Result<()> {
    let doc = SubtitleDocument::parse(b"")?;
    assert!(doc.is_empty());
    assert_eq!(doc.to_srt_string(), "");
    Ok(())
}

#[test]
fn test_withTranslations_shouldKeepTimingAndOrder() -> Result<()> {
    let doc = SubtitleDocument::parse(MULTILINE_SRT.as_bytes())?;
    let translated = doc.with_translations(vec!["Primera\nSegunda".to_string(), "{\\an8}Arriba".to_string()])?;

    for (before, after) in doc.entries().iter().zip(translated.entries()) {
        assert_eq!(before.start_time_ms, after.start_time_ms);
        assert_eq!(before.end_time_ms, after.end_time_ms);
        assert_eq!(before.seq_num, after.seq_num);
    }
    assert_eq!(translated.texts(), vec!["Primera\nSegunda", "{\\an8}Arriba"]);
    Ok(())
}

#[test]
fn test_withTranslations_withWrongCount_shouldFail() -> Result<()> {
    let doc = SubtitleDocument::parse(MULTILINE_SRT.as_bytes())?;
    let err = doc.with_translations(vec!["only one".to_string()]).unwrap_err();
    assert_eq!(err, SubtitleError::LengthMismatch { expected: 2, actual: 1 });
    Ok(())
}

#[test]
fn test_parseAndSerialize_withGappedIndices_shouldKeepTimingAndText() -> Result<()> {
    let content = "3\n00:00:01,000 --> 00:00:02,000\nFirst\n\n17\n00:00:05,500 --> 00:00:07,250\nSecond\nline two\n\n4\n01:00:00,000 --> 01:00:01,001\nThird\n";
    let doc = SubtitleDocument::parse(content.as_bytes())?;
    let serialized = doc.to_srt_bytes();
    let reparsed = SubtitleDocument::parse(&serialized)?;

    let seq: Vec<usize> = reparsed.entries().iter().map(|e| e.seq_num).collect();
    assert_eq!(seq, vec![1, 2, 3]);
    for (before, after) in doc.entries().iter().zip(reparsed.entries()) {
        assert_eq!(before.start_time_ms, after.start_time_ms);
        assert_eq!(before.end_time_ms, after.end_time_ms);
        assert_eq!(before.text, after.text);
    }
    assert_eq!(reparsed.to_srt_bytes(), serialized);
    Ok(())
}
