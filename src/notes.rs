//! Recipe notes: one YAML file per book slug holding an ordered list. A
//! note's position is its only identifier, so every mutation loads and
//! rewrites the whole file.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{Result, StoreError};
use crate::fsutil::{read_to_string_opt, write_text_atomic};
use crate::model::{Note, NoteRequest, NotesFile};

#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn list(&self, slug: &str) -> Result<Vec<Note>>;
    async fn append(&self, slug: &str, req: NoteRequest) -> Result<usize>;
    async fn replace(&self, slug: &str, index: usize, req: NoteRequest) -> Result<Note>;
    async fn remove(&self, slug: &str, index: usize) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct LocalFsNoteStore {
    data_dir: PathBuf,
}

impl LocalFsNoteStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn notes_path(&self, slug: &str) -> PathBuf {
        self.data_dir.join(format!("{slug}.yaml"))
    }

    /// Read paths treat an absent or unparsable file as empty; a corrupt
    /// file is silently replaced by the next write.
    async fn load_or_default(&self, slug: &str) -> Result<NotesFile> {
        let Some(raw) = read_to_string_opt(&self.notes_path(slug)).await? else {
            return Ok(NotesFile::default());
        };
        Ok(serde_yaml::from_str(&raw).unwrap_or_default())
    }

    /// Mutations addressed by index require the file to exist and to parse.
    async fn load_required(&self, slug: &str) -> Result<NotesFile> {
        let Some(raw) = read_to_string_opt(&self.notes_path(slug)).await? else {
            return Err(StoreError::NotFound("Note not found".to_owned()));
        };
        Ok(serde_yaml::from_str(&raw)?)
    }

    async fn save(&self, slug: &str, file: &NotesFile) -> Result<()> {
        let yaml = serde_yaml::to_string(file)?;
        write_text_atomic(&self.notes_path(slug), &yaml).await
    }
}

#[async_trait]
impl NoteStore for LocalFsNoteStore {
    async fn list(&self, slug: &str) -> Result<Vec<Note>> {
        Ok(self.load_or_default(slug).await?.notes)
    }

    async fn append(&self, slug: &str, req: NoteRequest) -> Result<usize> {
        let Some(recipe) = req.recipe.filter(|r| !r.is_empty()) else {
            return Err(StoreError::Validation("recipe is required".to_owned()));
        };

        let mut file = self.load_or_default(slug).await?;
        file.notes.push(Note {
            text: req.text.unwrap_or_default(),
            recipe,
            rating: req.rating.unwrap_or_default(),
        });
        self.save(slug, &file).await?;
        Ok(file.notes.len() - 1)
    }

    async fn replace(&self, slug: &str, index: usize, req: NoteRequest) -> Result<Note> {
        let mut file = self.load_required(slug).await?;
        let Some(note) = file.notes.get_mut(index) else {
            return Err(StoreError::NotFound("Note not found".to_owned()));
        };

        // Only supplied fields overwrite; an omitted field keeps its stored
        // value, an explicit empty string is stored as given.
        if let Some(text) = req.text {
            note.text = text;
        }
        if let Some(recipe) = req.recipe {
            note.recipe = recipe;
        }
        if let Some(rating) = req.rating {
            note.rating = rating;
        }
        let updated = note.clone();

        self.save(slug, &file).await?;
        Ok(updated)
    }

    async fn remove(&self, slug: &str, index: usize) -> Result<()> {
        let mut file = self.load_required(slug).await?;
        if index >= file.notes.len() {
            return Err(StoreError::NotFound("Note not found".to_owned()));
        }
        file.notes.remove(index);
        self.save(slug, &file).await
    }
}
