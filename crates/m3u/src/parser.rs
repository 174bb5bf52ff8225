use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const EXTINF: &str = "#EXTINF:";

static LOGO_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)tvg-logo="([^"]*)""#).unwrap());
static GROUP_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)group-title="([^"]*)""#).unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub id: String,
    pub name: String,
    pub url: String,
    pub logo: String,
    pub group: String,
}

#[derive(Debug, Default)]
struct PartialEntry {
    name: Option<String>,
    logo: Option<String>,
    group: Option<String>,
}

impl PartialEntry {
    fn from_extinf(line: &str) -> Self {
        let metadata = &line[EXTINF.len()..];
        let Some(comma) = metadata.rfind(',') else {
            return Self {
                name: non_empty(metadata.trim()),
                ..Default::default()
            };
        };

        let attributes = &metadata[..comma];
        Self {
            name: non_empty(metadata[comma + 1..].trim()),
            logo: capture(&LOGO_ATTR, attributes),
            group: capture(&GROUP_ATTR, attributes),
        }
    }

    fn finish(self, url: &str) -> PlaylistEntry {
        PlaylistEntry {
            id: url.to_string(),
            url: url.to_string(),
            name: self.name.unwrap_or_else(|| "Unknown".to_string()),
            logo: self.logo.unwrap_or_default(),
            group: self.group.unwrap_or_else(|| "Default".to_string()),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn capture(pattern: &Regex, attributes: &str) -> Option<String> {
    pattern
        .captures(attributes)
        .and_then(|c| c.get(1))
        .and_then(|m| non_empty(m.as_str()))
}

/// Single forward pass over the lines of a playlist, yielding one entry per
/// `#EXTINF:` line that is followed by a stream URL.
pub struct EntryReader<'a> {
    lines: std::str::Split<'a, char>,
    pending: Option<PartialEntry>,
}

impl<'a> EntryReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.split('\n'),
            pending: None,
        }
    }
}

impl Iterator for EntryReader<'_> {
    type Item = PlaylistEntry;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            let line = line.trim();
            if line.starts_with(EXTINF) {
                if let Some(dropped) = self.pending.replace(PartialEntry::from_extinf(line)) {
                    log::trace!("Dropped channel without stream url: {:?}", dropped.name);
                }
            } else if self.pending.is_some()
                && !line.is_empty()
                && !line.starts_with('#')
                && line.contains("://")
            {
                if let Some(pending) = self.pending.take() {
                    return Some(pending.finish(line));
                }
            }
        }

        if let Some(dropped) = self.pending.take() {
            log::trace!("Dropped channel without stream url: {:?}", dropped.name);
        }
        None
    }
}

pub fn parse(text: &str) -> Vec<PlaylistEntry> {
    EntryReader::new(text).collect()
}
