//! GUID to display-name resolution from an ibnetdiscover node name map.
//!
//! The map file holds one entry per line, `0x<hex guid> "<display name>"`.
//! Lines that do not match that shape are ignored, which lets the same file
//! carry comments and whatever else the fabric tooling writes into it.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Immutable GUID lookup table, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct NameMap {
    names: HashMap<String, String>,
}

impl NameMap {
    /// Read and parse a node name map file. Unreadable files are a startup
    /// error; unparseable lines are not.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read node name map {}", path.display()))?;
        let map = Self::parse(&text);
        debug!(path = %path.display(), entries = map.len(), "loaded node name map");
        Ok(map)
    }

    pub fn parse(text: &str) -> Self {
        let mut names = HashMap::new();
        for line in text.lines() {
            if let Some((guid, name)) = parse_entry(line) {
                names.insert(guid.to_string(), name.to_string());
            }
        }
        Self { names }
    }

    /// Resolve a GUID to its display name, or hand back the fallback the
    /// report text already provided.
    pub fn resolve_or<'a>(&'a self, guid: &str, fallback: &'a str) -> &'a str {
        self.names.get(guid).map(String::as_str).unwrap_or(fallback)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn parse_entry(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    let (guid, rest) = line.split_once(char::is_whitespace)?;
    if !guid.starts_with("0x") || guid.len() <= 2 {
        return None;
    }
    if !guid[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('"')?;
    let (name, _) = rest.split_once('"')?;
    Some((guid, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_well_formed_entries() {
        let map = NameMap::parse(
            "0x7cfe900300bdf570 \"ibsw01\"\n0x248a070300f3c9d6 \"node001 HCA-1\"\n",
        );
        assert_eq!(map.len(), 2);
        assert_eq!(map.resolve_or("0x7cfe900300bdf570", "x"), "ibsw01");
        assert_eq!(map.resolve_or("0x248a070300f3c9d6", "x"), "node001 HCA-1");
    }

    #[test]
    fn test_parse_ignores_garbage_lines() {
        let map = NameMap::parse(
            "# comment\n\n0xZZZZ \"bad guid\"\nno quotes here\n0xabc \"good\"\n",
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map.resolve_or("0xabc", "x"), "good");
    }

    #[test]
    fn test_resolve_falls_back_to_report_name() {
        let map = NameMap::default();
        assert_eq!(map.resolve_or("0x1", "sw1"), "sw1");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0xdeadbeef \"leaf switch 3\"").unwrap();
        let map = NameMap::load(file.path()).unwrap();
        assert_eq!(map.resolve_or("0xdeadbeef", "x"), "leaf switch 3");
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        assert!(NameMap::load(Path::new("/nonexistent/node-name-map")).is_err());
    }
}
