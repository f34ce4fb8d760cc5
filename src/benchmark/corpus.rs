//! Corpus discovery
//!
//! A corpus is a directory tree holding `.sql` files (one schema per file) and
//! Spider catalogs (`*.json`, one schema per database entry). Files are
//! visited in sorted path order so runs are reproducible.

use crate::common::error::{SchemaPressError, SchemaPressResult};
use crate::schema::parser::parse_ddl;
use crate::schema::spider::{load_spider_file, parse_spider, SpiderDatabase};
use crate::schema::Schema;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where a schema comes from
#[derive(Debug, Clone)]
pub enum CorpusSource {
    Ddl(PathBuf),
    Spider(Box<SpiderDatabase>),
    /// A catalog that could not be read; every case of it fails
    Unreadable(String),
}

/// One schema of the corpus, loaded lazily so parse errors stay per case
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    pub id: String,
    pub source: CorpusSource,
}

impl CorpusEntry {
    pub fn load_schema(&self) -> SchemaPressResult<Schema> {
        match &self.source {
            CorpusSource::Ddl(path) => {
                let ddl = std::fs::read_to_string(path)?;
                parse_ddl(&self.id, &ddl)
            }
            CorpusSource::Spider(db) => parse_spider(db),
            CorpusSource::Unreadable(reason) => Err(crate::parse_err!(reason)),
        }
    }
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> SchemaPressResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Path of `path` relative to the corpus root, the file name for a single file
fn relative_id(root: &Path, path: &Path) -> String {
    let id = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned();
    if id.is_empty() {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        id
    }
}

/// Lists the schemas under `root`, which may also be a single file
pub fn load_corpus(root: &Path) -> SchemaPressResult<Vec<CorpusEntry>> {
    let mut files = Vec::new();
    if root.is_dir() {
        collect_files(root, &mut files)?;
    } else if root.is_file() {
        files.push(root.to_path_buf());
    } else {
        return Err(SchemaPressError::InvalidArgument(format!(
            "corpus path {} does not exist",
            root.display()
        )));
    }
    files.sort();

    let mut entries = Vec::new();
    for path in files {
        if has_extension(&path, "sql") {
            entries.push(CorpusEntry {
                id: relative_id(root, &path),
                source: CorpusSource::Ddl(path),
            });
        } else if has_extension(&path, "json") {
            match load_spider_file(&path) {
                Ok(dbs) => {
                    debug!(path = %path.display(), databases = dbs.len(), "loaded spider catalog");
                    entries.extend(dbs.into_iter().map(|db| CorpusEntry {
                        id: db.db_id.clone(),
                        source: CorpusSource::Spider(Box::new(db)),
                    }));
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "unreadable catalog");
                    entries.push(CorpusEntry {
                        id: relative_id(root, &path),
                        source: CorpusSource::Unreadable(err.to_string()),
                    });
                }
            }
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_loads_sql_and_spider() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.sql"), "CREATE TABLE t (a INT);").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("a.sql"), "CREATE TABLE u (b INT);").unwrap();
        std::fs::write(
            dir.path().join("tables.json"),
            r#"[{"db_id": "pets", "table_names_original": ["pet"],
                "column_names_original": [[-1, "*"], [0, "PetID"]],
                "column_types": ["text", "number"], "primary_keys": [1], "foreign_keys": []}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let entries = load_corpus(dir.path()).unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0], "b.sql");
        assert!(ids.contains(&"pets"));

        for entry in &entries {
            assert_eq!(entry.load_schema().unwrap().table_count(), 1);
        }
    }

    #[test]
    fn test_broken_ddl_fails_on_load_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.sql"), "CREATE TABLE (((").unwrap();
        let entries = load_corpus(dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].load_schema().is_err());
    }

    #[test]
    fn test_unreadable_catalog_becomes_failing_entry() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tables.json"), "[{\"db_id\": ").unwrap();
        let entries = load_corpus(dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "tables.json");
        let err = entries[0].load_schema().unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn test_missing_corpus() {
        assert!(load_corpus(Path::new("/nonexistent/corpus")).is_err());
    }
}
