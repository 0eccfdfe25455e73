// Offline book-graph index.
//
// The corpus is two JSON-lines files: abstract works and concrete book
// editions. Building the index is one pass over both, recording for each ISBN
// the owning work and the byte range of the edition's line, so later lookups
// seek straight to the record instead of rescanning a multi-gigabyte file.
// The finished index is persisted in the bookgraph store.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{ResolveError, Result};
use crate::store::BlobStore;

pub const WORKS_FILE: &str = "goodreads_book_works.json";
pub const BOOKS_FILE: &str = "goodreads_books.json";
const INDEX_KEY: &str = "work_index";
const PROGRESS_EVERY: u64 = 10_000;

/// One edition's identifiers as recorded under its work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsbnPair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn13: Option<String>,
}

/// An abstract work: every edition of the same book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    pub work_id: String,
    #[serde(default)]
    pub isbns: Vec<IsbnPair>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Work {
    pub fn title(&self) -> Option<&str> {
        self.extra
            .get("original_title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkKey<'a> {
    WorkId(&'a str),
    Isbn13(&'a str),
    Isbn10(&'a str),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WorkData {
    works: BTreeMap<String, Work>,
    isbn10_to_work: BTreeMap<String, String>,
    isbn13_to_work: BTreeMap<String, String>,
    /// ISBN → (start, end) byte offsets of the edition's line.
    book_index10: BTreeMap<String, (u64, u64)>,
    book_index13: BTreeMap<String, (u64, u64)>,
}

#[derive(Deserialize)]
struct BookLine {
    #[serde(default)]
    work_id: Option<String>,
    #[serde(default)]
    isbn: String,
    #[serde(default)]
    isbn13: String,
}

#[derive(Debug)]
pub struct WorkIndex {
    data: WorkData,
    books_path: PathBuf,
}

impl WorkIndex {
    /// Load the persisted index, building it first if it does not exist yet.
    pub fn open(corpus_dir: &Path, store: &BlobStore) -> Result<Self> {
        match store.read_json::<WorkData>(INDEX_KEY)? {
            Some(data) => {
                info!(works = data.works.len(), "works: loaded cached index");
                Ok(Self {
                    data,
                    books_path: corpus_dir.join(BOOKS_FILE),
                })
            }
            None => Self::build(corpus_dir, store),
        }
    }

    /// Scan the corpus and persist a fresh index, replacing any existing one.
    pub fn build(corpus_dir: &Path, store: &BlobStore) -> Result<Self> {
        let works_path = corpus_dir.join(WORKS_FILE);
        let books_path = corpus_dir.join(BOOKS_FILE);
        let mut data = WorkData::default();

        info!(path = %works_path.display(), "works: reading works");
        let reader = BufReader::new(open(&works_path)?);
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| ResolveError::storage(&works_path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let work: Work = parse_line(&works_path, line_no, &line)?;
            if work.work_id.is_empty() {
                continue;
            }
            data.works.insert(work.work_id.clone(), work);
        }

        info!(path = %books_path.display(), "works: reading book graph");
        let mut reader = BufReader::new(open(&books_path)?);
        let mut line = String::new();
        let mut pos = 0u64;
        let mut line_no = 0u64;
        let mut missing_works = 0u64;
        loop {
            line.clear();
            let read = reader
                .read_line(&mut line)
                .map_err(|e| ResolveError::storage(&books_path, e))?;
            if read == 0 {
                break;
            }
            let (start, end) = (pos, pos + read as u64);
            pos = end;
            line_no += 1;
            if line_no % PROGRESS_EVERY == 0 {
                info!(line_no, "works: indexing");
            }
            if line.trim().is_empty() {
                continue;
            }

            let book: BookLine = parse_line(&books_path, line_no as usize - 1, &line)?;
            let Some(work) = book
                .work_id
                .filter(|id| !id.is_empty())
                .and_then(|id| data.works.get_mut(&id))
            else {
                missing_works += 1;
                continue;
            };

            let mut pair = IsbnPair::default();
            if !book.isbn.is_empty() {
                data.isbn10_to_work.insert(book.isbn.clone(), work.work_id.clone());
                data.book_index10.insert(book.isbn.clone(), (start, end));
                pair.isbn = Some(book.isbn);
            }
            if !book.isbn13.is_empty() {
                data.isbn13_to_work.insert(book.isbn13.clone(), work.work_id.clone());
                data.book_index13.insert(book.isbn13.clone(), (start, end));
                pair.isbn13 = Some(book.isbn13);
            }
            work.isbns.push(pair);
        }

        if missing_works > 0 {
            warn!(missing_works, "works: editions without a known work");
        }
        info!(works = data.works.len(), editions = line_no, "works: index built");
        store.write_json(INDEX_KEY, &data)?;
        Ok(Self { data, books_path })
    }

    pub fn get_work(&self, key: WorkKey<'_>) -> Option<&Work> {
        let work_id = match key {
            WorkKey::WorkId(id) => id,
            WorkKey::Isbn13(isbn) => self.data.isbn13_to_work.get(isbn)?,
            WorkKey::Isbn10(isbn) => self.data.isbn10_to_work.get(isbn)?,
        };
        self.data.works.get(work_id)
    }

    /// The work owning either ISBN, ISBN-13 first.
    pub fn work_for(&self, isbn10: Option<&str>, isbn13: Option<&str>) -> Option<&Work> {
        isbn13
            .and_then(|isbn| self.get_work(WorkKey::Isbn13(isbn)))
            .or_else(|| isbn10.and_then(|isbn| self.get_work(WorkKey::Isbn10(isbn))))
    }

    /// Full edition records for each pair, in order; `None` for unindexed pairs.
    pub fn get_books(&self, isbns: &[IsbnPair]) -> Result<Vec<Option<Value>>> {
        let mut reader = BufReader::new(open(&self.books_path)?);
        let mut books = Vec::with_capacity(isbns.len());
        let mut line = String::new();
        for pair in isbns {
            let pos = pair
                .isbn13
                .as_ref()
                .and_then(|isbn| self.data.book_index13.get(isbn))
                .or_else(|| pair.isbn.as_ref().and_then(|isbn| self.data.book_index10.get(isbn)));
            let Some(&(start, _)) = pos else {
                books.push(None);
                continue;
            };

            reader
                .seek(SeekFrom::Start(start))
                .map_err(|e| ResolveError::storage(&self.books_path, e))?;
            line.clear();
            reader
                .read_line(&mut line)
                .map_err(|e| ResolveError::storage(&self.books_path, e))?;
            let book = serde_json::from_str(&line).map_err(|e| {
                ResolveError::corrupt(format!("{}@{start}", self.books_path.display()), e.to_string())
            })?;
            books.push(Some(book));
        }
        Ok(books)
    }

    pub fn work_count(&self) -> usize {
        self.data.works.len()
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| ResolveError::storage(path, e))
}

fn parse_line<T: serde::de::DeserializeOwned>(path: &Path, line_no: usize, line: &str) -> Result<T> {
    serde_json::from_str(line)
        .map_err(|e| ResolveError::corrupt(format!("{}:{}", path.display(), line_no + 1), e.to_string()))
}
