//! Association of free-standing comments with the key that follows them.
//!
//! Only an uninterrupted run of comment lines directly above a key is attached
//! to it. A blank line, or any other item, between the comments and the key
//! breaks the run; such comments stay in the document untouched but belong to
//! no unit.

/// One item of a document body, as seen by the comment scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyItem<'a> {
    /// A comment line, marker included.
    Comment(&'a str),
    /// A whitespace-only line.
    Blank,
    /// An item that defines `key`.
    Key(&'a str),
    /// Anything else (table headers, junk).
    Other,
}

/// Returns the comment attached to `key`: the run of comments immediately
/// preceding its first definition, markers stripped and lines trimmed.
pub fn comment_before(body: &[BodyItem<'_>], key: &str) -> Option<String> {
    let mut run: Vec<&str> = Vec::new();

    for item in body {
        match item {
            BodyItem::Comment(text) => run.push(text),
            BodyItem::Key(name) if *name == key => {
                if run.is_empty() {
                    return None;
                }
                let lines: Vec<String> = run.iter().map(|line| strip_marker(line)).collect();
                return Some(lines.join("\n"));
            }
            BodyItem::Key(_) | BodyItem::Blank | BodyItem::Other => run.clear(),
        }
    }

    None
}

/// Extracts the attached comment from the raw text preceding a key on its own
/// line (a TOML key decor prefix, for instance).
///
/// Text after the last newline is the key's own indentation and is ignored.
pub fn comment_in_prefix(prefix: &str) -> Option<String> {
    let full_lines = &prefix[..prefix.rfind('\n')?];
    let mut body: Vec<BodyItem<'_>> = full_lines.split('\n').map(classify_line).collect();
    body.push(BodyItem::Key(""));
    comment_before(&body, "")
}

fn classify_line(line: &str) -> BodyItem<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        BodyItem::Blank
    } else if trimmed.starts_with('#') || trimmed.starts_with("//") {
        BodyItem::Comment(trimmed)
    } else {
        BodyItem::Other
    }
}

fn strip_marker(line: &str) -> String {
    let trimmed = line.trim();
    let stripped = if let Some(rest) = trimmed.strip_prefix("//") {
        rest
    } else {
        trimmed.trim_start_matches('#')
    };
    stripped.trim().to_string()
}
