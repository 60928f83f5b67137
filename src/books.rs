//! Book records: one markdown file per book under the posts directory, with
//! all metadata in the frontmatter header.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use tokio::fs;

use crate::error::{Result, StoreError};
use crate::frontmatter::{self, FieldMap};
use crate::fsutil::{read_to_string_opt, write_text_atomic};
use crate::model::{Book, CreateBookRequest, NotesFile, UpdateBookRequest};

/// Public URL prefix the site serves cover images under.
pub const COVER_URL_PREFIX: &str = "/assets/images/covers";

#[async_trait]
pub trait BookStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Book>>;
    async fn get(&self, slug: &str) -> Result<Book>;
    async fn create(&self, req: CreateBookRequest) -> Result<Book>;
    async fn update(&self, slug: &str, req: UpdateBookRequest) -> Result<Book>;
    async fn delete(&self, slug: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct LocalFsBookStore {
    posts_dir: PathBuf,
    data_dir: PathBuf,
    covers_dir: PathBuf,
}

impl LocalFsBookStore {
    pub fn new(
        posts_dir: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
        covers_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            posts_dir: posts_dir.into(),
            data_dir: data_dir.into(),
            covers_dir: covers_dir.into(),
        }
    }

    fn book_path(&self, slug: &str) -> PathBuf {
        self.posts_dir.join(format!("{slug}.md"))
    }

    fn notes_path(&self, slug: &str) -> PathBuf {
        self.data_dir.join(format!("{slug}.yaml"))
    }

    /// Number of notes with a non-empty recipe, skipping blank placeholder
    /// entries. An absent or unreadable notes file counts as zero.
    async fn recipe_note_count(&self, slug: &str) -> usize {
        let Ok(Some(raw)) = read_to_string_opt(&self.notes_path(slug)).await else {
            return 0;
        };
        let Ok(file) = serde_yaml::from_str::<NotesFile>(&raw) else {
            return 0;
        };
        file.notes.iter().filter(|n| !n.recipe.is_empty()).count()
    }
}

#[async_trait]
impl BookStore for LocalFsBookStore {
    async fn list(&self) -> Result<Vec<Book>> {
        let mut dir = match fs::read_dir(&self.posts_dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut dated: Vec<(Option<DateTime<Utc>>, Book)> = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                continue;
            }
            let Some(slug) = name.strip_suffix(".md") else {
                continue;
            };

            let raw = fs::read_to_string(entry.path()).await?;
            let (fields, _) = frontmatter::parse(&raw);
            let mut book = Book {
                slug: slug.to_owned(),
                fields,
                notes_count: None,
            };
            let count = self.recipe_note_count(book.notes_slug()).await;
            book.notes_count = Some(count);
            dated.push((sort_date(&book.fields), book));
        }

        // Newest first; a missing or unparsable date sorts as oldest.
        dated.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(dated.into_iter().map(|(_, book)| book).collect())
    }

    async fn get(&self, slug: &str) -> Result<Book> {
        let Some(raw) = read_to_string_opt(&self.book_path(slug)).await? else {
            return Err(StoreError::NotFound("Book not found".to_owned()));
        };
        let (fields, _) = frontmatter::parse(&raw);
        Ok(Book {
            slug: slug.to_owned(),
            fields,
            notes_count: None,
        })
    }

    async fn create(&self, req: CreateBookRequest) -> Result<Book> {
        let (Some(slug), Some(title), Some(author)) = (
            non_empty(req.slug),
            non_empty(req.title),
            non_empty(req.author),
        ) else {
            return Err(StoreError::Validation(
                "slug, title, and author are required".to_owned(),
            ));
        };

        // Existence check, then write: a racing creator can slip between the
        // two. Accepted for a single local operator.
        let path = self.book_path(&slug);
        match fs::metadata(&path).await {
            Ok(_) => {
                return Err(StoreError::Conflict(
                    "Book with this slug already exists".to_owned(),
                ));
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let mut fields = FieldMap::new();
        fields.set("title", title);
        fields.set("book", slug.clone());
        fields.set("author", author);
        fields.set(
            "date",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        fields.set("rating", req.rating.unwrap_or_default());
        fields.set("progress", req.progress.unwrap_or_default());
        fields.set("bookshop", req.bookshop.unwrap_or_default());
        fields.set("png", format!("{COVER_URL_PREFIX}/{slug}.png"));
        fields.set("webp", format!("{COVER_URL_PREFIX}/{slug}.webp"));
        write_text_atomic(&path, &frontmatter::generate(&fields)).await?;

        let empty = serde_yaml::to_string(&NotesFile::default())?;
        write_text_atomic(&self.notes_path(&slug), &empty).await?;

        Ok(Book {
            slug,
            fields,
            notes_count: None,
        })
    }

    async fn update(&self, slug: &str, req: UpdateBookRequest) -> Result<Book> {
        let path = self.book_path(slug);
        let Some(raw) = read_to_string_opt(&path).await? else {
            return Err(StoreError::NotFound("Book not found".to_owned()));
        };
        let (mut fields, _) = frontmatter::parse(&raw);

        // A field present in the request overwrites, an explicit empty
        // string included; the writer then omits empty values, so a cleared
        // field vanishes from the file on the next read.
        for (name, value) in [
            ("title", req.title),
            ("author", req.author),
            ("rating", req.rating),
            ("progress", req.progress),
            ("bookshop", req.bookshop),
        ] {
            if let Some(value) = value {
                fields.set(name, value);
            }
        }

        write_text_atomic(&path, &frontmatter::generate(&fields)).await?;
        Ok(Book {
            slug: slug.to_owned(),
            fields,
            notes_count: None,
        })
    }

    async fn delete(&self, slug: &str) -> Result<()> {
        match fs::remove_file(self.book_path(slug)).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound("Book not found".to_owned()));
            }
            Err(err) => return Err(err.into()),
        }

        // Companion artifacts may never have existed.
        let _ = fs::remove_file(self.notes_path(slug)).await;
        let _ = fs::remove_file(self.covers_dir.join(format!("{slug}.png"))).await;
        let _ = fs::remove_file(self.covers_dir.join(format!("{slug}.webp"))).await;
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn sort_date(fields: &FieldMap) -> Option<DateTime<Utc>> {
    let raw = fields.get("date")?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Hand-edited posts sometimes carry a bare date.
    raw.parse::<NaiveDate>()
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(temp: &tempfile::TempDir) -> LocalFsBookStore {
        let posts = temp.path().join("posts");
        let data = temp.path().join("_data").join("books");
        let covers = temp.path().join("covers");
        for dir in [&posts, &data, &covers] {
            std::fs::create_dir_all(dir).expect("create store dir");
        }
        LocalFsBookStore::new(posts, data, covers)
    }

    fn create_request(slug: &str) -> CreateBookRequest {
        CreateBookRequest {
            slug: Some(slug.to_owned()),
            title: Some("Dune".to_owned()),
            author: Some("Frank Herbert".to_owned()),
            rating: None,
            progress: None,
            bookshop: None,
        }
    }

    #[tokio::test]
    async fn create_writes_frontmatter_and_empty_notes_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = store(&temp);

        store.create(create_request("dune")).await.unwrap();

        let md = std::fs::read_to_string(temp.path().join("posts").join("dune.md")).unwrap();
        assert!(md.starts_with("---\ntitle: Dune\nbook: dune\nauthor: Frank Herbert\ndate: "));
        assert!(md.ends_with(
            "png: /assets/images/covers/dune.png\nwebp: /assets/images/covers/dune.webp\n---\n\n"
        ));
        // Empty optional fields never reach the file.
        assert!(!md.contains("rating"));
        assert!(!md.contains("progress"));

        let yaml =
            std::fs::read_to_string(temp.path().join("_data").join("books").join("dune.yaml"))
                .unwrap();
        assert_eq!(yaml, "notes: []\n");
    }

    #[tokio::test]
    async fn create_then_get_then_conflict() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = store(&temp);

        store.create(create_request("dune")).await.unwrap();
        let book = store.get("dune").await.unwrap();
        assert_eq!(book.slug, "dune");
        assert_eq!(book.fields.get("title"), Some("Dune"));

        let err = store.create(create_request("dune")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_requires_slug_title_author() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = store(&temp);

        let mut req = create_request("dune");
        req.author = Some(String::new());
        let err = store.create(req).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn get_missing_book_is_not_found() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = store(&temp).get("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_clearing_a_field_drops_it_from_the_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = store(&temp);

        let mut req = create_request("dune");
        req.rating = Some("4".to_owned());
        store.create(req).await.unwrap();

        store
            .update(
                "dune",
                UpdateBookRequest {
                    rating: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let book = store.get("dune").await.unwrap();
        assert_eq!(book.fields.get("rating"), None);
        // Untouched fields survive.
        assert_eq!(book.fields.get("title"), Some("Dune"));
        assert_eq!(book.fields.get("author"), Some("Frank Herbert"));
    }

    #[tokio::test]
    async fn update_preserves_hand_added_fields() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = store(&temp);
        std::fs::write(
            temp.path().join("posts").join("dune.md"),
            "---\ntitle: Dune\nseries: Dune Saga\n---\n",
        )
        .unwrap();

        store
            .update(
                "dune",
                UpdateBookRequest {
                    title: Some("Dune Messiah".to_owned()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let book = store.get("dune").await.unwrap();
        assert_eq!(book.fields.get("title"), Some("Dune Messiah"));
        assert_eq!(book.fields.get("series"), Some("Dune Saga"));
    }

    #[tokio::test]
    async fn list_sorts_newest_first_and_counts_recipe_notes() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = store(&temp);
        let posts = temp.path().join("posts");
        let data = temp.path().join("_data").join("books");

        std::fs::write(
            posts.join("older.md"),
            "---\ntitle: Older\ndate: 2023-05-01T00:00:00.000Z\n---\n",
        )
        .unwrap();
        std::fs::write(
            posts.join("newer.md"),
            "---\ntitle: Newer\ndate: 2024-05-01T00:00:00.000Z\n---\n",
        )
        .unwrap();
        std::fs::write(posts.join("undated.md"), "---\ntitle: Undated\n---\n").unwrap();
        std::fs::write(posts.join(".draft.md"), "---\ntitle: Hidden\n---\n").unwrap();
        std::fs::write(posts.join("notes.txt"), "not a book").unwrap();

        std::fs::write(
            data.join("newer.yaml"),
            "notes:\n- text: ''\n  recipe: pie\n  rating: ''\n- text: placeholder\n  recipe: ''\n  rating: ''\n",
        )
        .unwrap();

        let books = store.list().await.unwrap();
        let slugs: Vec<&str> = books.iter().map(|b| b.slug.as_str()).collect();
        assert_eq!(slugs, ["newer", "older", "undated"]);
        assert_eq!(books[0].notes_count, Some(1));
        assert_eq!(books[1].notes_count, Some(0));
    }

    #[tokio::test]
    async fn list_counts_notes_through_the_book_field() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = store(&temp);

        std::fs::write(
            temp.path().join("posts").join("dune-2024.md"),
            "---\ntitle: Dune\nbook: dune\ndate: 2024-01-01T00:00:00.000Z\n---\n",
        )
        .unwrap();
        std::fs::write(
            temp.path().join("_data").join("books").join("dune.yaml"),
            "notes:\n- text: ''\n  recipe: pie\n  rating: ''\n",
        )
        .unwrap();

        let books = store.list().await.unwrap();
        assert_eq!(books[0].notes_count, Some(1));
    }

    #[tokio::test]
    async fn delete_removes_book_and_companions_best_effort() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = store(&temp);

        store.create(create_request("dune")).await.unwrap();
        std::fs::write(temp.path().join("covers").join("dune.png"), b"png").unwrap();

        store.delete("dune").await.unwrap();
        assert!(!temp.path().join("posts").join("dune.md").exists());
        assert!(
            !temp
                .path()
                .join("_data")
                .join("books")
                .join("dune.yaml")
                .exists()
        );
        assert!(!temp.path().join("covers").join("dune.png").exists());

        let err = store.get("dune").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        // A book whose notes file and covers never existed deletes cleanly.
        store.create(create_request("sands")).await.unwrap();
        std::fs::remove_file(temp.path().join("_data").join("books").join("sands.yaml")).unwrap();
        store.delete("sands").await.unwrap();
    }

    #[test]
    fn sort_date_accepts_rfc3339_and_bare_dates() {
        let rfc: FieldMap = [("date", "2024-05-01T10:30:00.000Z")].into_iter().collect();
        let bare: FieldMap = [("date", "2024-05-01")].into_iter().collect();
        let junk: FieldMap = [("date", "next tuesday")].into_iter().collect();
        assert!(sort_date(&rfc).is_some());
        assert!(sort_date(&bare).is_some());
        assert_eq!(sort_date(&junk), None);
        assert_eq!(sort_date(&FieldMap::new()), None);
    }
}
