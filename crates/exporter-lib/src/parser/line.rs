//! Line tokenizers for the ibqueryerrors report grammar.
//!
//! Each function recognizes one line shape and returns `None` when the line
//! does not have it. The decision of whether a non-match is benign or a
//! structural anomaly belongs to the record parser in `parser`.

/// Minimal left-to-right scanner over one line.
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn tag(&mut self, tag: &str) -> Option<()> {
        self.rest = self.rest.strip_prefix(tag)?;
        Some(())
    }

    fn uint(&mut self) -> Option<u64> {
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let value = self.rest[..end].parse().ok()?;
        self.rest = &self.rest[end..];
        Some(value)
    }

    fn decimal(&mut self) -> Option<f64> {
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let value = self.rest[..end].parse().ok()?;
        self.rest = &self.rest[end..];
        Some(value)
    }

    /// Consume a `[...]` group, ignoring its content.
    fn bracket_group(&mut self) -> Option<()> {
        self.tag("[")?;
        let end = self.rest.find(']')?;
        self.rest = &self.rest[end + 1..];
        Some(())
    }

    fn word(&mut self) -> Option<&'a str> {
        let end = self
            .rest
            .find(|c: char| !c.is_alphanumeric() && c != '_')
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let word = &self.rest[..end];
        self.rest = &self.rest[end..];
        Some(word)
    }

    /// Whitespace-delimited token.
    fn token(&mut self) -> Option<&'a str> {
        let end = self
            .rest
            .find(char::is_whitespace)
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let token = &self.rest[..end];
        self.rest = &self.rest[end..];
        Some(token)
    }

    fn quoted(&mut self) -> Option<&'a str> {
        self.tag("\"")?;
        let end = self.rest.find('"')?;
        let content = &self.rest[..end];
        self.rest = &self.rest[end + 1..];
        Some(content)
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.rest.starts_with(prefix)
    }
}

/// A `Errors for [<GUID>] "<name>"` device header.
pub fn parse_header(line: &str) -> Option<(Option<&str>, &str)> {
    let rest = line.strip_prefix("Errors for ")?;
    let (guid, rest) = if rest.starts_with("0x") {
        let (guid, rest) = rest.split_once(' ')?;
        if guid.len() <= 2 || !guid[2..].chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        (Some(guid), rest)
    } else {
        (None, rest)
    };
    let name = rest.strip_prefix('"')?.strip_suffix('"')?;
    Some((guid, name))
}

/// The `GUID 0x... port ALL: [...]` aggregate marker that opens a switch
/// record.
pub fn is_all_ports_line(line: &str) -> bool {
    let mut c = Cursor::new(line);
    c.skip_ws();
    if c.tag("GUID ").is_none() {
        return false;
    }
    let Some(guid) = c.token() else { return false };
    if !guid.starts_with("0x") || guid.len() <= 2 {
        return false;
    }
    if !guid[2..].chars().all(|ch| ch.is_ascii_hexdigit()) {
        return false;
    }
    c.skip_ws();
    if c.tag("port ALL: ").is_none() {
        return false;
    }
    c.starts_with("[") && c.rest.contains(']')
}

/// A per-port counter line, split into its GUID, port number, and the raw
/// bracketed counter list.
#[derive(Debug, PartialEq, Eq)]
pub struct PortLine<'a> {
    pub guid: &'a str,
    pub port: u64,
    pub counters: &'a str,
}

pub fn parse_port_line(line: &str) -> Option<PortLine<'_>> {
    let mut c = Cursor::new(line);
    c.skip_ws();
    c.tag("GUID ")?;
    let guid = c.token()?;
    if !guid.starts_with("0x") {
        return None;
    }
    c.skip_ws();
    c.tag("port ")?;
    let port = c.uint()?;
    c.tag(":")?;
    Some(PortLine {
        guid,
        port,
        counters: c.rest,
    })
}

/// `name == value` tokens from the bracketed groups of a port line.
/// Groups without the `name == value` shape are skipped, matching what the
/// tool emits for annotated values.
pub fn parse_counters(raw: &str) -> Vec<(&str, u64)> {
    let mut out = Vec::new();
    let mut rest = raw;
    while let Some(start) = rest.find('[') {
        rest = &rest[start + 1..];
        let Some(end) = rest.find(']') else { break };
        let group = &rest[..end];
        rest = &rest[end + 1..];

        let Some((name, value)) = group.split_once(" == ") else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            continue;
        }
        let digits_end = value
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(value.len());
        let Ok(value) = value[..digits_end].parse::<u64>() else {
            continue;
        };
        out.push((name, value));
    }
    out
}

/// Parsed attributes of an Active link info line.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveLink {
    pub lid: u64,
    pub local_port: u64,
    pub width: u64,
    pub speed: f64,
    pub remote_guid: Option<String>,
    pub remote_lid: u64,
    pub remote_port: u64,
    pub remote_name: String,
}

/// Classification of one `Link info:` line.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkLine {
    Active(ActiveLink),
    Down,
    /// Parsed but in a state other than Active or Down.
    Other(String),
}

/// Parse a `Link info:` line. `None` means the line does not have the link
/// info shape at all (or an Active line is truncated), which the record
/// parser treats as a structural anomaly.
pub fn parse_link_line(line: &str) -> Option<LinkLine> {
    let mut c = Cursor::new(line);
    c.skip_ws();
    c.tag("Link info:")?;
    c.skip_ws();
    let lid = c.uint()?;
    c.skip_ws();
    let local_port = c.uint()?;
    c.bracket_group()?;
    c.skip_ws();
    c.tag("==")?;
    c.skip_ws();
    c.tag("(")?;
    c.skip_ws();
    let width = c.uint()?;
    c.tag("X")?;
    c.skip_ws();
    let speed = c.decimal()?;
    c.skip_ws();
    c.tag("Gbps")?;
    c.skip_ws();
    let state = c.word()?;
    match state {
        "Active" => {}
        // The remainder of an inactive line is junk the tool prints for the
        // last known peer; it is not validated.
        "Down" => return Some(LinkLine::Down),
        other => return Some(LinkLine::Other(other.to_string())),
    }
    c.tag("/")?;
    c.skip_ws();
    let _phys_state = c.word()?;
    c.skip_ws();
    c.tag(")")?;
    c.skip_ws();
    c.tag("==>")?;
    c.skip_ws();
    let remote_guid = if c.starts_with("0x") {
        let guid = c.token()?;
        c.skip_ws();
        Some(guid.to_string())
    } else {
        None
    };
    let remote_lid = c.uint()?;
    c.skip_ws();
    let remote_port = c.uint()?;
    c.bracket_group()?;
    c.skip_ws();
    let remote_name = c.quoted()?.to_string();
    Some(LinkLine::Active(ActiveLink {
        lid,
        local_port,
        width,
        speed,
        remote_guid,
        remote_lid,
        remote_port,
        remote_name,
    }))
}
