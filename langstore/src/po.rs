//! A minimal gettext PO catalog: the bilingual side of every conversion.
//!
//! Comment kinds understood by the parser:
//! - `#  ` translator comments
//! - `#. ` developer (extracted) comments
//! - `#: ` locations, which hold unit ids; spaces inside an id are written
//!   as U+00A0 so the id stays a single location
//! - `#, ` flags such as `fuzzy`
//! - `#| ` previous msgid, ignored
//! - `#~ ` obsolete entries, skipped
//!
//! The header entry (`msgid ""`) is kept apart from the units and is always
//! written first.

use std::{collections::HashMap, fmt::Write};

use crate::{error::Error, types::Translation};

const GENERATOR: &str = concat!("langstore ", env!("CARGO_PKG_VERSION"));

/// One PO entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoUnit {
    pub translator_comments: Vec<String>,
    pub developer_comments: Vec<String>,
    pub locations: Vec<String>,
    pub flags: Vec<String>,
    pub msgctxt: Option<String>,
    pub msgid: String,
    pub msgid_plural: Option<String>,
    /// One string per plural form, or exactly one for a singular entry.
    pub msgstr: Vec<String>,
}

impl PoUnit {
    /// Creates an untranslated entry for `source`.
    ///
    /// A plural source uses its first variant as `msgid` and its last as
    /// `msgid_plural`, with one empty `msgstr[n]` per variant.
    pub fn new(source: &Translation) -> Self {
        let mut unit = PoUnit::default();
        match source {
            Translation::Singular(text) => {
                unit.msgid = text.clone();
                unit.msgstr = vec![String::new()];
            }
            Translation::Plural(forms) => {
                unit.msgid = source.first().to_string();
                unit.msgid_plural = Some(forms.last().cloned().unwrap_or_default());
                unit.msgstr = vec![String::new(); forms.len().max(1)];
            }
        }
        unit
    }

    pub fn is_plural(&self) -> bool {
        self.msgid_plural.is_some()
    }

    pub fn is_fuzzy(&self) -> bool {
        self.flags.iter().any(|f| f == "fuzzy")
    }

    pub fn is_header(&self) -> bool {
        self.msgid.is_empty() && self.msgctxt.is_none()
    }

    /// Whether any form carries a translation.
    pub fn is_translated(&self) -> bool {
        self.msgstr.iter().any(|s| !s.is_empty())
    }

    pub fn source(&self) -> Translation {
        match &self.msgid_plural {
            Some(plural) => Translation::Plural(vec![self.msgid.clone(), plural.clone()]),
            None => Translation::Singular(self.msgid.clone()),
        }
    }

    pub fn target(&self) -> Translation {
        if self.is_plural() {
            Translation::Plural(self.msgstr.clone())
        } else {
            Translation::Singular(self.msgstr.first().cloned().unwrap_or_default())
        }
    }

    /// Stores `target`, keeping the entry's singular or plural layout.
    pub fn set_target(&mut self, target: &Translation) {
        self.msgstr = match target {
            Translation::Singular(text) => vec![text.clone()],
            Translation::Plural(forms) if self.is_plural() => forms.clone(),
            Translation::Plural(_) => vec![target.first().to_string()],
        };
    }

    pub fn add_location(&mut self, location: impl Into<String>) {
        let location = location.into();
        if !self.locations.contains(&location) {
            self.locations.push(location);
        }
    }
}

/// The header entry, as ordered `Name: value` fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoHeader {
    pub developer_comments: Vec<String>,
    pub translator_comments: Vec<String>,
    fields: Vec<(String, String)>,
}

impl Default for PoHeader {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl PoHeader {
    /// A header for a catalog extracted from `source_name`.
    pub fn new(source_name: Option<&str>, language: Option<&str>) -> Self {
        let mut header = PoHeader {
            developer_comments: Vec::new(),
            translator_comments: Vec::new(),
            fields: Vec::new(),
        };
        if let Some(name) = source_name {
            header
                .developer_comments
                .push(format!("extracted from {}", name));
        }
        header.set("Project-Id-Version", "PACKAGE VERSION");
        if let Some(language) = language {
            header.set("Language", language);
        }
        header.set("MIME-Version", "1.0");
        header.set("Content-Type", "text/plain; charset=UTF-8");
        header.set("Content-Transfer-Encoding", "8bit");
        header.set("X-Generator", GENERATOR);
        header
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Sets a field, keeping its position if it already exists.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .fields
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn language(&self) -> Option<&str> {
        self.get("Language").filter(|l| !l.is_empty())
    }

    fn from_unit(unit: PoUnit) -> Self {
        let fields = unit
            .msgstr
            .first()
            .map(|body| {
                body.lines()
                    .filter_map(|line| line.split_once(':'))
                    .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                    .collect()
            })
            .unwrap_or_default();
        PoHeader {
            developer_comments: unit.developer_comments,
            translator_comments: unit.translator_comments,
            fields,
        }
    }

    fn to_unit(&self) -> PoUnit {
        let mut body = String::new();
        for (key, value) in &self.fields {
            let _ = writeln!(body, "{}: {}", key, value);
        }
        PoUnit {
            translator_comments: self.translator_comments.clone(),
            developer_comments: self.developer_comments.clone(),
            msgstr: vec![body],
            ..PoUnit::default()
        }
    }
}

/// A parsed or generated PO catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoFile {
    pub header: PoHeader,
    pub units: Vec<PoUnit>,
}

impl PoFile {
    pub fn new(header: PoHeader) -> Self {
        Self {
            header,
            units: Vec::new(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, Error> {
        let mut parser = PoParser::default();
        for (n, line) in raw.lines().enumerate() {
            parser.line(n + 1, line)?;
        }
        parser.finish(raw.lines().count())?;

        let mut units = parser.units.into_iter();
        let mut file = PoFile::default();
        let mut first = units.next();
        if let Some(header) = first.take_if(|u| u.is_header()) {
            file.header = PoHeader::from_unit(header);
        }
        file.units = first.into_iter().chain(units).collect();
        tracing::debug!(units = file.units.len(), "parsed PO catalog");
        Ok(file)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Maps every location to the first unit that lists it.
    pub fn location_index(&self) -> HashMap<&str, usize> {
        let mut index = HashMap::new();
        for (position, unit) in self.units.iter().enumerate() {
            for location in &unit.locations {
                index.entry(location.as_str()).or_insert(position);
            }
        }
        index
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        write_unit(&mut out, &self.header.to_unit());
        for unit in &self.units {
            out.push('\n');
            write_unit(&mut out, unit);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Msgctxt,
    Msgid,
    MsgidPlural,
    Msgstr(usize),
}

#[derive(Debug, Default)]
struct PoParser {
    units: Vec<PoUnit>,
    current: PoUnit,
    field: Option<Field>,
    has_msgid: bool,
    has_msgstr: bool,
    /// Line where the current entry started.
    start: usize,
}

impl PoParser {
    fn line(&mut self, number: usize, line: &str) -> Result<(), Error> {
        let line = line.trim_matches(|c: char| c.is_ascii_whitespace());
        if line.is_empty() {
            return self.finish(number);
        }
        if line.starts_with("#~") {
            return Ok(());
        }

        if let Some(comment) = line.strip_prefix('#') {
            if self.has_msgstr {
                self.finish(number)?;
            }
            self.mark_start(number);
            self.comment(comment);
            return Ok(());
        }

        if line.starts_with('"') {
            let value = unquote(line, number)?;
            let target = match self.field {
                Some(Field::Msgctxt) => self.current.msgctxt.get_or_insert_with(String::new),
                Some(Field::Msgid) => &mut self.current.msgid,
                Some(Field::MsgidPlural) => self.current.msgid_plural.get_or_insert_with(String::new),
                Some(Field::Msgstr(n)) => &mut self.current.msgstr[n],
                None => return Err(Error::parse("po", "string without a keyword", Some(number))),
            };
            target.push_str(&value);
            return Ok(());
        }

        let (keyword, rest) = line
            .split_once(|c: char| c.is_whitespace() || c == '"')
            .map(|(keyword, _)| (keyword, line[keyword.len()..].trim_start()))
            .unwrap_or((line, ""));
        let value = unquote(rest, number)?;

        match keyword {
            "msgctxt" | "msgid" if self.has_msgstr => self.finish(number)?,
            _ => {}
        }
        self.mark_start(number);

        match keyword {
            "msgctxt" => {
                self.current.msgctxt = Some(value);
                self.field = Some(Field::Msgctxt);
            }
            "msgid" => {
                self.current.msgid = value;
                self.has_msgid = true;
                self.field = Some(Field::Msgid);
            }
            "msgid_plural" => {
                self.current.msgid_plural = Some(value);
                self.field = Some(Field::MsgidPlural);
            }
            "msgstr" => {
                self.current.msgstr = vec![value];
                self.has_msgstr = true;
                self.field = Some(Field::Msgstr(0));
            }
            other => {
                let index = other
                    .strip_prefix("msgstr[")
                    .and_then(|rest| rest.strip_suffix(']'))
                    .and_then(|n| n.parse::<usize>().ok())
                    .ok_or_else(|| {
                        Error::parse("po", format!("unknown keyword `{}`", other), Some(number))
                    })?;
                if self.current.msgstr.len() <= index {
                    self.current.msgstr.resize(index + 1, String::new());
                }
                self.current.msgstr[index] = value;
                self.has_msgstr = true;
                self.field = Some(Field::Msgstr(index));
            }
        }
        Ok(())
    }

    fn mark_start(&mut self, number: usize) {
        if self.start == 0 {
            self.start = number;
        }
    }

    fn comment(&mut self, comment: &str) {
        let unit = &mut self.current;
        if let Some(text) = comment.strip_prefix('.') {
            unit.developer_comments.push(text.trim().to_string());
        } else if let Some(text) = comment.strip_prefix(':') {
            unit.locations.extend(text.split_ascii_whitespace().map(decode_location));
        } else if let Some(text) = comment.strip_prefix(',') {
            unit.flags.extend(
                text.split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(str::to_string),
            );
        } else if comment.starts_with('|') {
            // previous msgid, not kept
        } else {
            let text = comment.strip_prefix(' ').unwrap_or(comment);
            unit.translator_comments.push(text.trim_end().to_string());
        }
    }

    /// Closes the current entry, if it has started.
    fn finish(&mut self, number: usize) -> Result<(), Error> {
        let unit = std::mem::take(&mut self.current);
        let start = std::mem::take(&mut self.start);
        let (has_msgid, has_msgstr) = (self.has_msgid, self.has_msgstr);
        self.field = None;
        self.has_msgid = false;
        self.has_msgstr = false;

        match (has_msgid, has_msgstr) {
            (true, true) => {
                self.units.push(unit);
                Ok(())
            }
            (true, false) => Err(Error::parse("po", "entry has no msgstr", Some(start.max(1)))),
            (false, true) => Err(Error::parse("po", "msgstr without msgid", Some(start.max(1)))),
            // Comments not followed by an entry.
            (false, false) if unit.msgctxt.is_none() => Ok(()),
            (false, false) => Err(Error::parse("po", "msgctxt without msgid", Some(number))),
        }
    }
}

fn unquote(raw: &str, line: usize) -> Result<String, Error> {
    let body = raw
        .trim()
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| Error::parse("po", "expected a quoted string", Some(line)))?;

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => return Err(Error::parse("po", "unterminated escape", Some(line))),
        }
    }
    Ok(out)
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn write_string(out: &mut String, keyword: &str, value: &str) {
    let chunks: Vec<&str> = value.split_inclusive('\n').collect();
    if chunks.len() > 1 {
        let _ = writeln!(out, "{} \"\"", keyword);
        for chunk in chunks {
            let _ = writeln!(out, "\"{}\"", escape(chunk));
        }
    } else {
        let _ = writeln!(out, "{} \"{}\"", keyword, escape(value));
    }
}

fn write_unit(out: &mut String, unit: &PoUnit) {
    for comment in &unit.translator_comments {
        if comment.is_empty() {
            out.push_str("#\n");
        } else {
            let _ = writeln!(out, "# {}", comment);
        }
    }
    for comment in &unit.developer_comments {
        for line in comment.lines() {
            let _ = writeln!(out, "#. {}", line);
        }
    }
    for location in &unit.locations {
        let _ = writeln!(out, "#: {}", encode_location(location));
    }
    if !unit.flags.is_empty() {
        let _ = writeln!(out, "#, {}", unit.flags.join(", "));
    }
    if let Some(context) = &unit.msgctxt {
        write_string(out, "msgctxt", context);
    }
    write_string(out, "msgid", &unit.msgid);
    match &unit.msgid_plural {
        Some(plural) => {
            write_string(out, "msgid_plural", plural);
            for (n, form) in unit.msgstr.iter().enumerate() {
                write_string(out, &format!("msgstr[{}]", n), form);
            }
        }
        None => write_string(
            out,
            "msgstr",
            unit.msgstr.first().map(String::as_str).unwrap_or_default(),
        ),
    }
}

fn encode_location(location: &str) -> String {
    location.replace(' ', "\u{a0}")
}

fn decode_location(location: &str) -> String {
    location.replace('\u{a0}', " ")
}
