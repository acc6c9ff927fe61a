use crate::error::{GalleryError, Result};
use crate::model::{BlobId, Gallery, GalleryPatch, Photo, PhotoId, PhotoPatch};
use crate::storage::RecordStore;
use async_trait::async_trait;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, ToSql, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed record store.
///
/// A fresh connection is opened for every call, so each record write is its
/// own statement with no transaction spanning several records.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    db_path: PathBuf,
}

impl MetadataStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { db_path };
        store.init_schema()?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn init_schema(&self) -> Result<()> {
        let conn = open_conn(&self.db_path)?;
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS galleries (
                name TEXT PRIMARY KEY,
                description TEXT NOT NULL,
                head TEXT,
                tail TEXT,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        // seq defines storage order; chain order lives in prev/next
        conn.execute(
            "CREATE TABLE IF NOT EXISTS photos (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                gallery TEXT NOT NULL,
                prev TEXT,
                next TEXT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                thumbnail TEXT,
                large TEXT,
                original TEXT,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_photos_gallery ON photos(gallery)",
            [],
        )?;

        Ok(())
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open_conn(&db_path)?;
            f(&conn)
        })
        .await
        .map_err(|error| GalleryError::Storage(format!("metadata task failed: {}", error)))?
    }
}

fn open_conn(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

fn parse_timestamp(value: &str) -> rusqlite::Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&chrono::Utc))
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn row_to_gallery(row: &Row<'_>) -> rusqlite::Result<Gallery> {
    let created_at: String = row.get("created_at")?;
    Ok(Gallery {
        name: row.get("name")?,
        description: row.get("description")?,
        head: row.get::<_, Option<String>>("head")?.map(PhotoId::from),
        tail: row.get::<_, Option<String>>("tail")?.map(PhotoId::from),
        created_at: parse_timestamp(&created_at)?,
    })
}

fn row_to_photo(row: &Row<'_>) -> rusqlite::Result<Photo> {
    let created_at: String = row.get("created_at")?;
    Ok(Photo {
        id: PhotoId::from(row.get::<_, String>("id")?),
        gallery: row.get("gallery")?,
        prev: row.get::<_, Option<String>>("prev")?.map(PhotoId::from),
        next: row.get::<_, Option<String>>("next")?.map(PhotoId::from),
        title: row.get("title")?,
        description: row.get("description")?,
        thumbnail: row.get::<_, Option<String>>("thumbnail")?.map(BlobId::from),
        large: row.get::<_, Option<String>>("large")?.map(BlobId::from),
        original: row.get::<_, Option<String>>("original")?.map(BlobId::from),
        created_at: parse_timestamp(&created_at)?,
    })
}

fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

fn opt_str(id: &Option<PhotoId>) -> Option<String> {
    id.as_ref().map(|id| id.as_str().to_string())
}

#[async_trait]
impl RecordStore for MetadataStore {
    async fn list_galleries(&self) -> Result<Vec<Gallery>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM galleries ORDER BY rowid")?;
            let rows = stmt.query_map([], row_to_gallery)?;

            let mut galleries = Vec::new();
            for row in rows {
                galleries.push(row?);
            }
            Ok(galleries)
        })
        .await
    }

    async fn find_gallery(&self, name: &str) -> Result<Option<Gallery>> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let gallery = conn
                .query_row(
                    "SELECT * FROM galleries WHERE name = ?1",
                    [&name],
                    row_to_gallery,
                )
                .optional()?;
            Ok(gallery)
        })
        .await
    }

    async fn insert_gallery(&self, gallery: &Gallery) -> Result<()> {
        let gallery = gallery.clone();
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO galleries (name, description, head, tail, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    gallery.name,
                    gallery.description,
                    opt_str(&gallery.head),
                    opt_str(&gallery.tail),
                    gallery.created_at.to_rfc3339(),
                ],
            );

            match inserted {
                Ok(_) => Ok(()),
                Err(e) if is_unique_violation(&e) => Err(GalleryError::DuplicateKey(format!(
                    "gallery {} already exists",
                    gallery.name
                ))),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn update_gallery(&self, name: &str, patch: &GalleryPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let name = name.to_string();
        let patch = patch.clone();
        self.with_conn(move |conn| {
            let mut updates = Vec::new();
            let mut values: Vec<Box<dyn ToSql>> = Vec::new();

            if let Some(description) = patch.description {
                updates.push("description = ?");
                values.push(Box::new(description));
            }
            if let Some(head) = patch.head {
                updates.push("head = ?");
                values.push(Box::new(opt_str(&head)));
            }
            if let Some(tail) = patch.tail {
                updates.push("tail = ?");
                values.push(Box::new(opt_str(&tail)));
            }

            let sql = format!("UPDATE galleries SET {} WHERE name = ?", updates.join(", "));
            values.push(Box::new(name.clone()));

            let params: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
            let affected = conn.execute(&sql, params.as_slice())?;
            if affected == 0 {
                return Err(GalleryError::NotFound(format!("gallery {}", name)));
            }

            tracing::debug!("Updated gallery {}: {}", name, updates.join(", "));
            Ok(())
        })
        .await
    }

    async fn rename_gallery(&self, name: &str, new_name: &str) -> Result<()> {
        let name = name.to_string();
        let new_name = new_name.to_string();
        self.with_conn(move |conn| {
            let renamed = conn.execute(
                "UPDATE galleries SET name = ?1 WHERE name = ?2",
                params![new_name, name],
            );

            match renamed {
                Ok(0) => Err(GalleryError::NotFound(format!("gallery {}", name))),
                Ok(_) => Ok(()),
                Err(e) if is_unique_violation(&e) => Err(GalleryError::DuplicateKey(format!(
                    "gallery {} already exists",
                    new_name
                ))),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn delete_gallery(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let affected = conn.execute("DELETE FROM galleries WHERE name = ?1", [&name])?;
            if affected == 0 {
                return Err(GalleryError::NotFound(format!("gallery {}", name)));
            }
            Ok(())
        })
        .await
    }

    async fn find_photo(&self, id: &PhotoId) -> Result<Option<Photo>> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let photo = conn
                .query_row(
                    "SELECT * FROM photos WHERE id = ?1",
                    [id.as_str()],
                    row_to_photo,
                )
                .optional()?;
            Ok(photo)
        })
        .await
    }

    async fn list_photos(&self, gallery: &str) -> Result<Vec<Photo>> {
        let gallery = gallery.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare("SELECT * FROM photos WHERE gallery = ?1 ORDER BY seq")?;
            let rows = stmt.query_map([&gallery], row_to_photo)?;

            let mut photos = Vec::new();
            for row in rows {
                photos.push(row?);
            }
            Ok(photos)
        })
        .await
    }

    async fn count_photos(&self, gallery: &str) -> Result<usize> {
        let gallery = gallery.to_string();
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM photos WHERE gallery = ?1",
                [&gallery],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await
    }

    async fn insert_photo(&self, photo: &Photo) -> Result<()> {
        let photo = photo.clone();
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO photos (
                    id, gallery, prev, next, title, description,
                    thumbnail, large, original, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    photo.id.as_str(),
                    photo.gallery,
                    opt_str(&photo.prev),
                    opt_str(&photo.next),
                    photo.title,
                    photo.description,
                    photo.thumbnail.as_ref().map(|b| b.as_str().to_string()),
                    photo.large.as_ref().map(|b| b.as_str().to_string()),
                    photo.original.as_ref().map(|b| b.as_str().to_string()),
                    photo.created_at.to_rfc3339(),
                ],
            );

            match inserted {
                Ok(_) => Ok(()),
                Err(e) if is_unique_violation(&e) => Err(GalleryError::DuplicateKey(format!(
                    "photo {} already exists",
                    photo.id
                ))),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn update_photo(&self, id: &PhotoId, patch: &PhotoPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let id = id.clone();
        let patch = patch.clone();
        self.with_conn(move |conn| {
            let mut updates = Vec::new();
            let mut values: Vec<Box<dyn ToSql>> = Vec::new();

            if let Some(gallery) = patch.gallery {
                updates.push("gallery = ?");
                values.push(Box::new(gallery));
            }
            if let Some(prev) = patch.prev {
                updates.push("prev = ?");
                values.push(Box::new(opt_str(&prev)));
            }
            if let Some(next) = patch.next {
                updates.push("next = ?");
                values.push(Box::new(opt_str(&next)));
            }
            if let Some(title) = patch.title {
                updates.push("title = ?");
                values.push(Box::new(title));
            }
            if let Some(description) = patch.description {
                updates.push("description = ?");
                values.push(Box::new(description));
            }

            let sql = format!("UPDATE photos SET {} WHERE id = ?", updates.join(", "));
            values.push(Box::new(id.as_str().to_string()));

            let params: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
            let affected = conn.execute(&sql, params.as_slice())?;
            if affected == 0 {
                return Err(GalleryError::NotFound(format!("photo {}", id)));
            }

            tracing::debug!("Updated photo {}: {}", id, updates.join(", "));
            Ok(())
        })
        .await
    }

    async fn delete_photo(&self, id: &PhotoId) -> Result<()> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let affected = conn.execute("DELETE FROM photos WHERE id = ?1", [id.as_str()])?;
            if affected == 0 {
                return Err(GalleryError::NotFound(format!("photo {}", id)));
            }
            Ok(())
        })
        .await
    }

    async fn delete_photos_in_gallery(&self, gallery: &str) -> Result<usize> {
        let gallery = gallery.to_string();
        self.with_conn(move |conn| {
            let affected = conn.execute("DELETE FROM photos WHERE gallery = ?1", [&gallery])?;
            Ok(affected)
        })
        .await
    }
}
