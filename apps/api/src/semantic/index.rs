//! Semantic index: a flat Euclidean vector index paired with an append-only
//! document list. Position `i` in one is always position `i` in the other.
//!
//! Both structures are persisted under one directory after every mutation:
//! `index.bin` (bincode) and `documents.json`. Both are staged as temporary
//! siblings before either is renamed into place.
//!
//! Writers are serialised by an async mutex held for the whole add/rebuild,
//! embedding call included. A writer builds and persists the next snapshot
//! off the runtime threads, then swaps it in under a short `RwLock` write.
//! A search sees the state before or after an add, never between.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::semantic::embedder::{EmbedError, Embedder};

pub const INDEX_FILE: &str = "index.bin";
pub const DOCUMENTS_FILE: &str = "documents.json";
const REBUILD_BATCH: usize = 32;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Semantic index is corrupted: {0}")]
    Corrupted(String),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("Embedding has dimension {actual}, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index encoding error: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub id: String,
    pub text: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub source: String,
    pub distance: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexHealth {
    /// "ready" or "corrupted".
    pub status: &'static str,
    pub documents: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Row-major vectors of a fixed dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FlatIndex {
    dim: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.vectors.len() / self.dim
        }
    }

    fn is_well_formed(&self) -> bool {
        self.dim > 0 && self.vectors.len() % self.dim == 0
    }

    fn push(&mut self, vector: &[f32]) {
        self.vectors.extend_from_slice(vector);
    }

    #[cfg(test)]
    fn vector(&self, position: usize) -> &[f32] {
        &self.vectors[position * self.dim..(position + 1) * self.dim]
    }

    /// `(position, euclidean distance)` of the `k` nearest vectors, nearest
    /// first, ties broken by position.
    fn nearest(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(position, v)| {
                let sum: f32 = v.iter().zip(query).map(|(a, b)| (a - b) * (a - b)).sum();
                (position, sum)
            })
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        scored
            .into_iter()
            .map(|(position, sum)| (position, sum.sqrt()))
            .collect()
    }
}

struct IndexInner {
    flat: FlatIndex,
    documents: Vec<IndexedDocument>,
    /// Set while the on-disk state could not be trusted at startup.
    corruption: Option<String>,
    /// Documents recovered from a corrupted store, kept for `rebuild`.
    salvage: Vec<IndexedDocument>,
}

impl IndexInner {
    fn empty(dim: usize) -> Self {
        Self {
            flat: FlatIndex::new(dim),
            documents: Vec::new(),
            corruption: None,
            salvage: Vec::new(),
        }
    }

    fn corrupted(dim: usize, reason: String, salvage: Vec<IndexedDocument>) -> Self {
        Self {
            corruption: Some(reason),
            salvage,
            ..Self::empty(dim)
        }
    }
}

/// Process-wide index service. Construct once and share behind an `Arc`.
pub struct SemanticIndex {
    dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    inner: RwLock<IndexInner>,
    writer: Mutex<()>,
}

impl SemanticIndex {
    /// Loads the persisted index from `dir`, creating the directory if needed.
    ///
    /// Only a failure to create the directory is an error. A store that
    /// cannot be trusted opens in the corrupted state instead.
    pub fn open(dir: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Result<Self, IndexError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let inner = load(&dir, embedder.dim());

        match &inner.corruption {
            Some(reason) => error!(
                "Semantic index at {} is corrupted: {reason} ({} documents salvaged)",
                dir.display(),
                inner.salvage.len()
            ),
            None => info!(
                "Semantic index loaded from {} ({} documents)",
                dir.display(),
                inner.documents.len()
            ),
        }

        Ok(Self {
            dir,
            embedder,
            inner: RwLock::new(inner),
            writer: Mutex::new(()),
        })
    }

    pub fn health(&self) -> IndexHealth {
        let inner = self.inner.read();
        IndexHealth {
            status: if inner.corruption.is_some() {
                "corrupted"
            } else {
                "ready"
            },
            documents: inner.documents.len(),
            reason: inner.corruption.clone(),
        }
    }

    pub fn is_corrupted(&self) -> bool {
        self.inner.read().corruption.is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Documents a rebuild without explicit input would use: the salvage of
    /// a corrupted store, otherwise the current documents.
    pub fn salvage(&self) -> Vec<IndexedDocument> {
        let inner = self.inner.read();
        if inner.corruption.is_some() {
            inner.salvage.clone()
        } else {
            inner.documents.clone()
        }
    }

    fn ensure_ready(&self) -> Result<(), IndexError> {
        match &self.inner.read().corruption {
            Some(reason) => Err(IndexError::Corrupted(reason.clone())),
            None => Ok(()),
        }
    }

    /// Embeds and appends one document. Returns `false` for empty text,
    /// which is skipped.
    pub async fn add(&self, id: &str, text: &str, source: &str) -> Result<bool, IndexError> {
        if text.trim().is_empty() {
            return Ok(false);
        }

        let _writer = self.writer.lock().await;
        self.ensure_ready()?;

        let vector = self.embed_one(text).await?;
        let document = IndexedDocument {
            id: id.to_string(),
            text: text.to_string(),
            source: source.to_string(),
        };

        let (mut flat, mut documents) = {
            let inner = self.inner.read();
            (inner.flat.clone(), inner.documents.clone())
        };
        let position = documents.len();
        flat.push(&vector);
        documents.push(document);

        let (flat, documents) = match self.persist_snapshot(flat, documents).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Failed to persist semantic index, dropping add of {id}: {e}");
                return Err(e);
            }
        };

        let mut inner = self.inner.write();
        inner.flat = flat;
        inner.documents = documents;
        info!("Indexed document {id} from {source} at position {position}");
        Ok(true)
    }

    /// The `k` nearest documents to `query`, nearest first.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, IndexError> {
        self.ensure_ready()?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let vector = self.embed_one(query).await?;

        let inner = self.inner.read();
        if let Some(reason) = &inner.corruption {
            return Err(IndexError::Corrupted(reason.clone()));
        }
        let hits = inner
            .flat
            .nearest(&vector, k)
            .into_iter()
            .filter_map(|(position, distance)| {
                let Some(doc) = inner.documents.get(position) else {
                    warn!("Index position {position} has no document; skipping");
                    return None;
                };
                Some(SearchHit {
                    id: doc.id.clone(),
                    text: doc.text.clone(),
                    source: doc.source.clone(),
                    distance,
                })
            })
            .collect();
        Ok(hits)
    }

    /// Re-embeds `documents` into a fresh index, persists it and swaps it
    /// in. Clears the corrupted state on success. Returns the document count.
    pub async fn rebuild(&self, documents: Vec<IndexedDocument>) -> Result<usize, IndexError> {
        let _writer = self.writer.lock().await;

        let documents: Vec<IndexedDocument> = documents
            .into_iter()
            .filter(|d| !d.text.trim().is_empty())
            .collect();

        let dim = self.embedder.dim();
        let mut flat = FlatIndex::new(dim);
        for chunk in documents.chunks(REBUILD_BATCH) {
            let texts: Vec<String> = chunk.iter().map(|d| d.text.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(EmbedError::CountMismatch {
                    expected: texts.len(),
                    actual: vectors.len(),
                }
                .into());
            }
            for vector in &vectors {
                check_dim(dim, vector)?;
                flat.push(vector);
            }
        }

        let (flat, documents) = self.persist_snapshot(flat, documents).await?;

        let count = documents.len();
        let mut inner = self.inner.write();
        *inner = IndexInner {
            flat,
            documents,
            corruption: None,
            salvage: Vec::new(),
        };
        info!("Semantic index rebuilt with {count} documents");
        Ok(count)
    }

    /// Writes the snapshot on the blocking pool and hands it back.
    async fn persist_snapshot(
        &self,
        flat: FlatIndex,
        documents: Vec<IndexedDocument>,
    ) -> Result<(FlatIndex, Vec<IndexedDocument>), IndexError> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || -> Result<_, IndexError> {
            persist(&dir, &flat, &documents)?;
            Ok((flat, documents))
        })
        .await
        .map_err(|e| IndexError::Io(std::io::Error::other(e)))?
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let vectors = self.embedder.embed(&[text.to_string()]).await?;
        let [vector]: [Vec<f32>; 1] =
            vectors
                .try_into()
                .map_err(|v: Vec<Vec<f32>>| EmbedError::CountMismatch {
                    expected: 1,
                    actual: v.len(),
                })?;
        check_dim(self.embedder.dim(), &vector)?;
        Ok(vector)
    }
}

fn check_dim(expected: usize, vector: &[f32]) -> Result<(), IndexError> {
    if vector.len() != expected {
        return Err(IndexError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Persistence
// ────────────────────────────────────────────────────────────────────────────

fn discard(paths: &[&Path]) {
    for path in paths {
        let _ = fs::remove_file(path);
    }
}

/// Stages both files, then renames them into place. If the documents rename
/// fails, the previous `index.bin` is put back so the pair stays consistent.
fn persist(dir: &Path, flat: &FlatIndex, documents: &[IndexedDocument]) -> Result<(), IndexError> {
    let index_bytes = bincode::serialize(flat).map_err(|e| IndexError::Encode(e.to_string()))?;
    let doc_bytes =
        serde_json::to_vec(documents).map_err(|e| IndexError::Encode(e.to_string()))?;

    let index_path = dir.join(INDEX_FILE);
    let docs_path = dir.join(DOCUMENTS_FILE);
    let index_tmp = index_path.with_extension("tmp");
    let docs_tmp = docs_path.with_extension("tmp");

    let staged =
        fs::write(&index_tmp, &index_bytes).and_then(|()| fs::write(&docs_tmp, &doc_bytes));
    if let Err(e) = staged {
        discard(&[&index_tmp, &docs_tmp]);
        return Err(e.into());
    }

    let previous_index = fs::read(&index_path).ok();
    if let Err(e) = fs::rename(&index_tmp, &index_path) {
        discard(&[&index_tmp, &docs_tmp]);
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&docs_tmp, &docs_path) {
        discard(&[&docs_tmp]);
        let restored = match previous_index {
            Some(bytes) => {
                fs::write(&index_tmp, bytes).and_then(|()| fs::rename(&index_tmp, &index_path))
            }
            None => fs::remove_file(&index_path),
        };
        if let Err(restore) = restored {
            error!("Could not restore {INDEX_FILE} after a failed write: {restore}");
        }
        return Err(e.into());
    }
    Ok(())
}

fn read_documents(path: &Path) -> Result<Vec<IndexedDocument>, String> {
    let bytes = fs::read(path).map_err(|e| format!("{DOCUMENTS_FILE} unreadable: {e}"))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("{DOCUMENTS_FILE} undecodable: {e}"))
}

fn read_flat(path: &Path) -> Result<FlatIndex, String> {
    let bytes = fs::read(path).map_err(|e| format!("{INDEX_FILE} unreadable: {e}"))?;
    bincode::deserialize(&bytes).map_err(|e| format!("{INDEX_FILE} undecodable: {e}"))
}

/// Startup policy: no files is an empty index; both files consistent with
/// each other and with `dim` is a loaded index; anything else is corrupted.
fn load(dir: &Path, dim: usize) -> IndexInner {
    let index_path = dir.join(INDEX_FILE);
    let docs_path = dir.join(DOCUMENTS_FILE);

    match (index_path.exists(), docs_path.exists()) {
        (false, false) => IndexInner::empty(dim),
        (true, false) => {
            IndexInner::corrupted(dim, format!("{DOCUMENTS_FILE} is missing"), Vec::new())
        }
        (false, true) => {
            let salvage = read_documents(&docs_path).unwrap_or_default();
            IndexInner::corrupted(dim, format!("{INDEX_FILE} is missing"), salvage)
        }
        (true, true) => {
            let documents = match read_documents(&docs_path) {
                Ok(documents) => documents,
                Err(reason) => return IndexInner::corrupted(dim, reason, Vec::new()),
            };
            let flat = match read_flat(&index_path) {
                Ok(flat) => flat,
                Err(reason) => return IndexInner::corrupted(dim, reason, documents),
            };
            if flat.dim != dim || !flat.is_well_formed() {
                let reason = format!("{INDEX_FILE} has dimension {}, expected {dim}", flat.dim);
                return IndexInner::corrupted(dim, reason, documents);
            }
            if flat.len() != documents.len() {
                let reason = format!(
                    "{INDEX_FILE} holds {} vectors but {DOCUMENTS_FILE} holds {} documents",
                    flat.len(),
                    documents.len()
                );
                return IndexInner::corrupted(dim, reason, documents);
            }
            IndexInner {
                flat,
                documents,
                corruption: None,
                salvage: Vec::new(),
            }
        }
    }
}
