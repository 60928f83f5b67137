use serde::ser::SerializeMap as _;
use serde::{Deserialize, Serialize, Serializer};

use crate::frontmatter::FieldMap;

/// A book record as read from its markdown file.
///
/// Frontmatter fields stay an ordered map rather than a fixed struct so that
/// hand-added fields survive an update round-trip and pass through to the
/// API unchanged. `notes_count` is only computed for listings; `get` leaves
/// it unset.
#[derive(Debug, Clone)]
pub struct Book {
    pub slug: String,
    pub fields: FieldMap,
    pub notes_count: Option<usize>,
}

impl Book {
    /// Name of the companion notes file, without extension. Older posts can
    /// point elsewhere via the `book` frontmatter field.
    pub fn notes_slug(&self) -> &str {
        match self.fields.get("book") {
            Some(book) if !book.is_empty() => book,
            _ => &self.slug,
        }
    }
}

impl Serialize for Book {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = 1 + usize::from(self.notes_count.is_some());
        let mut map = serializer.serialize_map(Some(self.fields.iter().count() + extra))?;
        map.serialize_entry("slug", &self.slug)?;
        for (name, value) in self.fields.iter() {
            map.serialize_entry(name, value)?;
        }
        if let Some(count) = self.notes_count {
            map.serialize_entry("notesCount", &count)?;
        }
        map.end()
    }
}

/// One recipe note. Field order here is the on-disk YAML order; absent
/// fields read back as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub recipe: String,
    #[serde(default)]
    pub rating: String,
}

/// On-disk shape of a notes file: `{notes: [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotesFile {
    #[serde(default)]
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookRequest {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub rating: Option<String>,
    pub progress: Option<String>,
    pub bookshop: Option<String>,
}

/// Partial book update. `None` keeps the stored value; `Some("")` clears
/// the field, which the frontmatter writer then drops entirely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub rating: Option<String>,
    pub progress: Option<String>,
    pub bookshop: Option<String>,
}

/// Body of both note creation and note replacement. On append, `recipe` is
/// required and the others default to empty; on replace, `None` preserves
/// the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteRequest {
    pub text: Option<String>,
    pub recipe: Option<String>,
    pub rating: Option<String>,
}
