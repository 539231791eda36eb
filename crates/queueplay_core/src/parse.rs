use crate::index::ChapterIndex;
use crate::types::ChapterRecord;
use std::ops::Range;

/// Characters stripped from both ends of a chapter title.
const TITLE_SEPARATORS: &[char] = &['-', '–', '—', ':', '|', '(', ')', '[', ']', '•', '*'];

/// Extract authored chapters from `[h:]m:ss` timestamps in a video
/// description.
///
/// Every line holding a timestamp becomes a chapter titled by the rest of
/// the line. A single timestamp is not treated as a chapter list. End times
/// are left open for the importer to derive.
pub fn parse_description_chapters(description: &str) -> Vec<ChapterRecord> {
    let chapters: Vec<ChapterRecord> = description
        .lines()
        .filter_map(parse_line)
        .map(|(start, title)| ChapterRecord::new(title, start, None))
        .collect();

    if chapters.len() < 2 {
        return vec![];
    }

    ChapterIndex::build(chapters)
        .dedup_start_times()
        .into_chapters()
}

fn parse_line(line: &str) -> Option<(f64, String)> {
    let (range, seconds) = find_timestamp(line)?;
    let before = trim_title(&line[..range.start]);
    let after = trim_title(&line[range.end..]);

    let title = match (before.is_empty(), after.is_empty()) {
        (true, _) => after.to_string(),
        (false, true) => before.to_string(),
        (false, false) => format!("{before} {after}"),
    };
    Some((seconds, title))
}

fn trim_title(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || TITLE_SEPARATORS.contains(&c))
}

/// Byte range and value of the first valid timestamp in `line`.
fn find_timestamp(line: &str) -> Option<(Range<usize>, f64)> {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b':') {
            i += 1;
        }
        let token = line[start..i].trim_end_matches(':');
        if let Some(seconds) = parse_timestamp(token) {
            return Some((start..start + token.len(), seconds));
        }
    }
    None
}

/// Parse `m:ss` or `h:mm:ss`.
pub fn parse_timestamp(token: &str) -> Option<f64> {
    let parts: Vec<&str> = token.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    if parts[0].is_empty() || parts[0].len() > 3 {
        return None;
    }

    let mut total: u64 = parts[0].parse().ok()?;
    for part in &parts[1..] {
        if part.len() != 2 {
            return None;
        }
        let value: u64 = part.parse().ok()?;
        if value >= 60 {
            return None;
        }
        total = total * 60 + value;
    }
    Some(total as f64)
}
