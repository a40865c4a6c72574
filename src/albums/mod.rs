//! Albums declared by `.saved_searches.pg2conf` files.
//!
//! The file holds a JSON array of `{"name", "searchQuery"}` objects. Each
//! supported query becomes a locked album; its content is evaluated against
//! the index whenever albums are listed.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::db::{albums, media, Database, PersonMatch};
use crate::error::Result;
use crate::model::{Directory, Media};

/// Query an album is defined by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SearchQuery {
    /// Media with a face tagged with a matching name.
    #[serde(rename_all = "camelCase")]
    Person {
        text: String,
        #[serde(default)]
        match_type: PersonMatch,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearch {
    pub name: String,
    pub search_query: SearchQuery,
}

/// An album with its evaluated content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: i64,
    pub name: String,
    pub locked: bool,
    pub search_query: SearchQuery,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<Media>,
}

/// Parse a saved-search file. Entries with a query type this index cannot
/// evaluate are skipped.
pub fn parse_saved_searches(content: &str) -> Result<Vec<SavedSearch>> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(content)?;
    let mut searches = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<SavedSearch>(entry) {
            Ok(search) => searches.push(search),
            Err(e) => tracing::warn!(error = %e, "skipping unsupported saved search"),
        }
    }
    Ok(searches)
}

/// Import every saved-search file of `tree` and its materialized
/// descendants. Returns the number of albums written.
pub fn sync_saved_searches(db: &Database, media_root: &Path, tree: &Directory) -> Result<usize> {
    let mut files = Vec::new();
    tree.walk(&mut |dir| {
        if let Some(children) = dir.children() {
            for file in children.meta_files.iter().filter(|f| f.is_saved_searches()) {
                let mut path = media_root.to_path_buf();
                if !dir.is_root() {
                    path.push(dir.relative_path());
                }
                files.push(path.join(&file.name));
            }
        }
    });

    let mut written = 0;
    for path in files {
        let searches = match read_saved_searches(&path) {
            Ok(searches) => searches,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping saved-search file");
                continue;
            }
        };
        db.transaction(|tx| {
            for search in &searches {
                let query = serde_json::to_string(&search.search_query)?;
                albums::upsert_locked(tx, &search.name, &query)?;
            }
            Ok(())
        })?;
        tracing::debug!(path = %path.display(), albums = searches.len(), "imported saved searches");
        written += searches.len();
    }
    Ok(written)
}

fn read_saved_searches(path: &Path) -> Result<Vec<SavedSearch>> {
    let content = std::fs::read_to_string(path)?;
    parse_saved_searches(&content)
}

pub struct AlbumManager {
    db: Arc<Database>,
}

impl AlbumManager {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// All albums, oldest first, with their count and preview.
    pub async fn get_albums(&self) -> Result<Vec<Album>> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || db.read(load_albums)).await?
    }
}

fn load_albums(conn: &rusqlite::Connection) -> Result<Vec<Album>> {
    let mut result = Vec::new();
    for row in albums::list(conn)? {
        let search_query: SearchQuery = match serde_json::from_str(&row.search_query) {
            Ok(query) => query,
            Err(e) => {
                tracing::warn!(album = %row.name, error = %e, "skipping album with unreadable query");
                continue;
            }
        };

        let ids = match &search_query {
            SearchQuery::Person { text, match_type } => media::find_by_person(conn, text, *match_type)?,
        };
        let preview = match ids.first() {
            Some(&id) => media::get(conn, id)?,
            None => None,
        };

        result.push(Album {
            id: row.id,
            name: row.name,
            locked: row.locked,
            search_query,
            count: ids.len(),
            preview,
        });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MetaFile, SAVED_SEARCHES_FILE};

    #[test]
    fn test_parse_skips_unknown_queries() {
        let searches = parse_saved_searches(
            r#"[
                {"name": "Alvin", "searchQuery": {"type": "person", "text": "Alvin", "matchType": "like"}},
                {"name": "Sunsets", "searchQuery": {"type": "keyword", "text": "sunset"}},
                {"name": "Bea", "searchQuery": {"type": "person", "text": "Bea"}}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            searches,
            vec![
                SavedSearch {
                    name: "Alvin".to_string(),
                    search_query: SearchQuery::Person {
                        text: "Alvin".to_string(),
                        match_type: PersonMatch::Like,
                    },
                },
                SavedSearch {
                    name: "Bea".to_string(),
                    search_query: SearchQuery::Person {
                        text: "Bea".to_string(),
                        match_type: PersonMatch::Like,
                    },
                },
            ]
        );
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        assert!(parse_saved_searches("{not json").is_err());
    }

    #[test]
    fn test_bad_file_does_not_stop_later_imports() {
        let media_root = tempfile::tempdir().unwrap();
        std::fs::create_dir(media_root.path().join("a")).unwrap();
        std::fs::create_dir(media_root.path().join("b")).unwrap();
        std::fs::write(media_root.path().join("a").join(SAVED_SEARCHES_FILE), "{not json").unwrap();
        std::fs::write(
            media_root.path().join("b").join(SAVED_SEARCHES_FILE),
            r#"[{"name": "Bea", "searchQuery": {"type": "person", "text": "Bea"}}]"#,
        )
        .unwrap();

        let mut root = Directory::root();
        for name in ["a", "b"] {
            let mut dir = Directory::new(name, "./");
            dir.children_mut().meta_files.push(MetaFile::new(SAVED_SEARCHES_FILE, 1));
            root.children_mut().directories.push(dir);
        }
        // Listed but missing on disk.
        let mut gone = Directory::new("gone", "./");
        gone.children_mut().meta_files.push(MetaFile::new(SAVED_SEARCHES_FILE, 1));
        root.children_mut().directories.insert(0, gone);

        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let written = sync_saved_searches(&db, media_root.path(), &root).unwrap();

        assert_eq!(written, 1);
        let rows = db.read(albums::list).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Bea");
        assert!(rows[0].locked);
    }
}
