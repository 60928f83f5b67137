//! Parse and generate the `---` delimited `key: value` header block that
//! prefixes every book markdown file.
//!
//! The format is deliberately dumb: one field per line, split at the first
//! colon, optional surrounding quotes on the value, no nesting, no escaping.
//! Anything the splitter cannot make sense of is skipped rather than
//! rejected, because these files are also edited by hand.

/// Insertion-ordered field map.
///
/// Setting an existing name replaces the value in place, so a parse →
/// modify → generate cycle keeps hand-written field order stable and
/// appends new fields at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap(Vec<(String, String)>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for FieldMap {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.set(name, value);
        }
        map
    }
}

/// Split `raw` into its frontmatter fields and body text.
///
/// The header must open with a first line that is exactly `---` and closes
/// at the next such line. Without an opening delimiter — or with a header
/// that never closes — the field map is empty and the entire text is the
/// body.
pub fn parse(raw: &str) -> (FieldMap, String) {
    let Some(after_open) = raw.strip_prefix("---\n") else {
        return (FieldMap::new(), raw.to_owned());
    };
    let Some((header, body)) = split_at_close(after_open) else {
        return (FieldMap::new(), raw.to_owned());
    };

    let mut fields = FieldMap::new();
    for line in header.lines() {
        // A colon at position 0 leaves an empty name; skip it like a
        // colon-free line.
        let Some(colon) = line.find(':') else {
            continue;
        };
        if colon == 0 {
            continue;
        }
        let name = line[..colon].trim();
        let value = strip_quotes(line[colon + 1..].trim());
        fields.set(name, value);
    }

    (fields, body.trim().to_owned())
}

/// Render `fields` back into a header block, closing delimiter followed by
/// one blank line. Fields with empty values are omitted entirely — clearing
/// a field and never having set it are indistinguishable after a write-out.
pub fn generate(fields: &FieldMap) -> String {
    let mut out = String::from("---\n");
    for (name, value) in fields.iter() {
        if value.is_empty() {
            continue;
        }
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
    }
    out.push_str("---\n\n");
    out
}

fn split_at_close(text: &str) -> Option<(&str, &str)> {
    let mut pos = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.strip_suffix('\n').unwrap_or(line);
        if trimmed == "---" {
            let header = text[..pos].strip_suffix('\n').unwrap_or(&text[..pos]);
            let body = &text[pos + line.len()..];
            return Some((header, body));
        }
        pos += line.len();
    }
    None
}

fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
