//! On-disk form of a similarity index.
//!
//! An index is stored as a single SQLite file holding every passage with its
//! embedding as a little-endian f32 blob. Loading only decodes rows.

use super::{Passage, SimilarityIndex};
use crate::error::{Result, YoutubotError};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use tracing::{debug, instrument};

/// File name of the index inside a directory.
pub const INDEX_FILE: &str = "index.sqlite";

const SCHEMA_VERSION: i64 = 1;

impl SimilarityIndex {
    /// Write the index to `<dir>/index.sqlite`, replacing any existing file.
    #[instrument(skip(self), fields(passages = self.len()))]
    pub fn save_to_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(INDEX_FILE);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }

        let mut conn = Connection::open(&path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE index_info (
                schema_version INTEGER NOT NULL,
                dimensions INTEGER NOT NULL
            );

            CREATE TABLE passages (
                position INTEGER PRIMARY KEY,
                text TEXT NOT NULL,
                source_title TEXT NOT NULL,
                source_url TEXT NOT NULL,
                author TEXT NOT NULL,
                language TEXT NOT NULL,
                embedding BLOB NOT NULL
            );
            "#,
        )?;

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO index_info (schema_version, dimensions) VALUES (?1, ?2)",
            params![SCHEMA_VERSION, self.dimensions() as i64],
        )?;

        for (position, (passage, embedding)) in self.passages.iter().zip(&self.embeddings).enumerate() {
            tx.execute(
                r#"
                INSERT INTO passages
                (position, text, source_title, source_url, author, language, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    position as i64,
                    passage.text,
                    passage.source_title,
                    passage.source_url,
                    passage.author,
                    passage.language,
                    embedding_to_bytes(embedding),
                ],
            )?;
        }
        tx.commit()?;

        debug!("Saved index to {:?}", path);
        Ok(())
    }

    /// Read an index written by [`SimilarityIndex::save_to_dir`].
    #[instrument]
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(INDEX_FILE);
        if !path.exists() {
            return Err(YoutubotError::Index(format!("{:?} does not exist", path)));
        }

        let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

        let (version, dimensions): (i64, i64) = conn.query_row(
            "SELECT schema_version, dimensions FROM index_info LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        if version != SCHEMA_VERSION {
            return Err(YoutubotError::Index(format!(
                "Unsupported index format version {}",
                version
            )));
        }

        let mut stmt = conn.prepare(
            r#"
            SELECT text, source_title, source_url, author, language, embedding
            FROM passages ORDER BY position
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let passage = Passage {
                text: row.get(0)?,
                source_title: row.get(1)?,
                source_url: row.get(2)?,
                author: row.get(3)?,
                language: row.get(4)?,
            };
            let blob: Vec<u8> = row.get(5)?;
            Ok((passage, blob))
        })?;

        let mut passages = Vec::new();
        let mut embeddings = Vec::new();
        for row in rows {
            let (passage, blob) = row?;
            let embedding = bytes_to_embedding(&blob)?;
            if embedding.len() as i64 != dimensions {
                return Err(YoutubotError::Index(format!(
                    "Embedding has {} dimensions, expected {}",
                    embedding.len(),
                    dimensions
                )));
            }
            passages.push(passage);
            embeddings.push(embedding);
        }

        debug!("Loaded {} passages from {:?}", passages.len(), path);
        Self::from_parts(passages, embeddings)
    }
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(YoutubotError::Index(format!(
            "Embedding blob of {} bytes is not a whole number of f32 values",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::passage;

    fn sample_index() -> SimilarityIndex {
        SimilarityIndex::from_parts(
            vec![passage("alpha"), passage("beta"), passage("çay ve simit")],
            vec![vec![1.0, 0.0, 0.25], vec![0.0, 1.0, -0.5], vec![0.5, 0.5, 0.5]],
        )
        .unwrap()
    }

    #[test]
    fn test_save_and_load_preserves_search_results() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index();
        index.save_to_dir(dir.path()).unwrap();

        let loaded = SimilarityIndex::load_from_dir(dir.path()).unwrap();
        assert_eq!(loaded.passages(), index.passages());

        let query = [0.9, 0.2, 0.1];
        let before: Vec<_> = index.search(&query, 3).into_iter().map(|r| (r.passage.text, r.score)).collect();
        let after: Vec<_> = loaded.search(&query, 3).into_iter().map(|r| (r.passage.text, r.score)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        sample_index().save_to_dir(dir.path()).unwrap();

        let smaller = SimilarityIndex::from_parts(vec![passage("gamma")], vec![vec![0.0, 0.0, 1.0]]).unwrap();
        smaller.save_to_dir(dir.path()).unwrap();

        let loaded = SimilarityIndex::load_from_dir(dir.path()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.passages()[0].text, "gamma");
    }

    #[test]
    fn test_load_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SimilarityIndex::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_load_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), b"definitely not sqlite").unwrap();
        assert!(SimilarityIndex::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_odd_blob_rejected() {
        assert!(bytes_to_embedding(&[0, 1, 2]).is_err());
        assert_eq!(bytes_to_embedding(&1.5f32.to_le_bytes()).unwrap(), vec![1.5]);
    }
}
