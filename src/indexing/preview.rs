//! Picks the media item that represents a directory.
//!
//! A directory with direct media uses the first one by byte-ordered name.
//! Otherwise it borrows the preview of its first child, by name, that has
//! one. Children are refreshed before their parent, so a single level of
//! lookup covers the whole subtree.

use rusqlite::Connection;
use std::collections::HashSet;

use crate::db::{directories, media};
use crate::error::Result;

/// Compute the preview of `directory_id` from storage.
pub fn select(conn: &Connection, directory_id: i64) -> Result<Option<i64>> {
    match media::first_in_directory(conn, directory_id)? {
        Some(id) => Ok(Some(id)),
        None => directories::first_child_preview(conn, directory_id),
    }
}

/// Recompute and store the preview. Returns true when it changed.
pub fn refresh(conn: &Connection, directory_id: i64) -> Result<bool> {
    let Some(row) = directories::get(conn, directory_id)? else {
        return Ok(false);
    };
    let preview = select(conn, directory_id)?;
    if preview == row.preview_id {
        return Ok(false);
    }
    directories::set_preview(conn, directory_id, preview)?;
    Ok(true)
}

/// Refresh every preview from `start` up to the top of its chain.
///
/// An unchanged ancestor does not end the walk: deleting media nulls every
/// preview pointing at it through the foreign key, so a higher ancestor can
/// be stale even when the ones below it compare equal.
pub fn refresh_ancestors(conn: &Connection, start: Option<i64>) -> Result<()> {
    let mut visited = HashSet::new();
    let mut next = start;
    while let Some(id) = next {
        if !visited.insert(id) {
            break;
        }
        refresh(conn, id)?;
        next = directories::get(conn, id)?.and_then(|row| row.parent_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::indexing::merge::{save_directory, MergeOptions};
    use crate::model::{Directory, Media};

    #[test]
    fn test_direct_media_wins_over_children() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let (parent, own, child_media) = db
            .transaction(|tx| {
                let parent = directories::insert(tx, "p", "./", None, 0, Some(0))?;
                let child = directories::insert(tx, "c", "./p/", Some(parent), 0, Some(0))?;
                let child_media = media::insert(tx, child, &Media::photo("a.jpg"))?;
                refresh(tx, child)?;
                refresh(tx, parent)?;
                let before = directories::get(tx, parent)?.unwrap().preview_id;
                assert_eq!(before, Some(child_media));

                let own = media::insert(tx, parent, &Media::photo("z.jpg"))?;
                refresh(tx, parent)?;
                Ok((parent, own, child_media))
            })
            .unwrap();

        let row = db.read(|conn| directories::get(conn, parent)).unwrap().unwrap();
        assert_eq!(row.preview_id, Some(own));
        assert_ne!(row.preview_id, Some(child_media));
    }

    #[test]
    fn test_ancestors_follow_new_preview() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let (top, leaf_media) = db
            .transaction(|tx| {
                let top = directories::insert(tx, "a", "./", None, 0, Some(0))?;
                let mid = directories::insert(tx, "b", "./a/", Some(top), 0, Some(0))?;
                let leaf = directories::insert(tx, "c", "./a/b/", Some(mid), 0, Some(0))?;
                let leaf_media = media::insert(tx, leaf, &Media::photo("x.jpg"))?;
                refresh(tx, leaf)?;
                refresh_ancestors(tx, Some(mid))?;
                Ok((top, leaf_media))
            })
            .unwrap();

        let row = db.read(|conn| directories::get(conn, top)).unwrap().unwrap();
        assert_eq!(row.preview_id, Some(leaf_media));
    }

    fn save(db: &Database, dir: &Directory) {
        db.transaction(|tx| save_directory(tx, dir, MergeOptions::default()))
            .unwrap();
    }

    fn stored_preview(db: &Database, name: &str, path: &str) -> Option<i64> {
        db.read(|conn| directories::find(conn, name, path))
            .unwrap()
            .unwrap()
            .preview_id
    }

    fn media_id(db: &Database, dir: &str, path: &str, name: &str) -> Option<i64> {
        let row = db.read(|conn| directories::find(conn, dir, path)).unwrap().unwrap();
        db.read(|conn| media::for_directory(conn, row.id))
            .unwrap()
            .into_iter()
            .find(|m| m.name == name)
            .and_then(|m| m.id)
    }

    #[test]
    fn test_emptied_grandchild_moves_preview_to_sibling_subtree() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let mut g = Directory::new("g", "./");
        let mut p = Directory::new("p", "./g/");
        let mut c = Directory::new("c", "./g/p/");
        c.children_mut().media.push(Media::photo("x.jpg"));
        p.children_mut().directories.push(c);
        let mut q = Directory::new("q", "./g/");
        q.children_mut().media.push(Media::photo("q.jpg"));
        g.children_mut().directories.extend([p, q]);
        save(&db, &g);
        assert_eq!(stored_preview(&db, "g", "./"), media_id(&db, "c", "./g/p/", "x.jpg"));

        save(&db, &Directory::new("c", "./g/p/"));

        let q_photo = media_id(&db, "q", "./g/", "q.jpg");
        assert_eq!(stored_preview(&db, "c", "./g/p/"), None);
        assert_eq!(stored_preview(&db, "p", "./g/"), None);
        assert_eq!(stored_preview(&db, "g", "./"), q_photo);
    }

    #[test]
    fn test_removed_own_photo_falls_back_to_child() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let mut parent = Directory::new("parent", "./");
        parent.children_mut().media.push(Media::photo("own.jpg"));
        let mut child = Directory::new("child", "./parent/");
        child.children_mut().media.push(Media::photo("child.jpg"));
        parent.children_mut().directories.push(child.clone());
        save(&db, &parent);
        assert_eq!(
            stored_preview(&db, "parent", "./"),
            media_id(&db, "parent", "./", "own.jpg")
        );

        parent.children_mut().media.clear();
        save(&db, &parent);
        assert_eq!(
            stored_preview(&db, "parent", "./"),
            media_id(&db, "child", "./parent/", "child.jpg")
        );

        child.children_mut().media.clear();
        save(&db, &child);
        assert_eq!(stored_preview(&db, "parent", "./"), None);
    }
}
