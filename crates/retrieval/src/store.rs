use crate::chunker::chunk_text;
use crate::embeddings::Embedder;
use crate::index::FlatIndex;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const INDEX_FILE: &str = "index.bin";
const DOCSTORE_FILE: &str = "docstore.json";
const POSITIONS_FILE: &str = "positions.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub title: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChunkRecord {
    id: String,
    doc_id: String,
    text: String,
}

/// On-disk metadata layout; must stay stable for compatibility.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Docstore {
    docs: HashMap<String, DocumentRecord>,
    chunks: Vec<ChunkRecord>,
}

#[derive(Debug, Serialize)]
pub struct AddOutcome {
    pub doc_id: String,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// 1-based, rank 1 is the best match.
    pub rank: usize,
    pub score: f32,
    pub chunk_id: String,
    pub text: String,
    pub doc: DocMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocMeta {
    pub id: String,
    pub title: Option<String>,
    pub source: Option<String>,
}

struct StoreState {
    index: FlatIndex,
    /// Ordered chunk ids, aligned 1:1 with index rows. Desynchronizing
    /// this from the index makes every result silently wrong, so all
    /// mutations of the pair happen inside one critical section.
    positions: Vec<String>,
    docstore: Docstore,
}

/// Persistent vector store over a flat cosine index. Append-only: the flat
/// index has no native delete, so document removal is not offered.
pub struct VectorStore {
    dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    state: Mutex<StoreState>,
}

impl VectorStore {
    /// Open (or create) a store rooted at `dir`, reconstructing in-memory
    /// state from disk.
    pub fn open(dir: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create storage dir: {dir:?}"))?;

        let index_path = dir.join(INDEX_FILE);
        let index = if index_path.exists() {
            FlatIndex::load(&index_path)?
        } else {
            FlatIndex::new(embedder.dimension())
        };

        let docstore = read_json_or_default::<Docstore>(&dir.join(DOCSTORE_FILE))?;
        let positions = read_json_or_default::<Vec<String>>(&dir.join(POSITIONS_FILE))?;

        if positions.len() != index.len() {
            anyhow::bail!(
                "position map out of sync with index: {} positions, {} rows",
                positions.len(),
                index.len()
            );
        }

        info!(dir = ?dir, rows = index.len(), "opened vector store");
        Ok(Self {
            dir,
            embedder,
            state: Mutex::new(StoreState {
                index,
                positions,
                docstore,
            }),
        })
    }

    /// Chunk, embed and index a document, persisting index, positions and
    /// metadata together. Re-adding the same title+source overwrites the
    /// document metadata but appends fresh chunks; chunk-level dedup is
    /// deliberately not performed.
    pub async fn add_document(&self, title: &str, source: &str, text: &str) -> Result<AddOutcome> {
        let doc_id = doc_id_for(title, source);
        let chunks = chunk_text(text);
        if chunks.is_empty() {
            warn!(doc_id, "document had no indexable text");
            return Ok(AddOutcome {
                doc_id,
                chunk_count: 0,
            });
        }

        // Embed outside the lock; only the append + persist is critical.
        let vectors = self.embedder.embed(&chunks).await?;

        let mut state = self.state.lock().expect("vector store lock poisoned");
        // Index first: `add` is all-or-nothing, so a dimension failure here
        // leaves positions and metadata untouched and the row alignment
        // intact.
        state.index.add(vectors)?;

        state
            .docstore
            .docs
            .insert(doc_id.clone(), DocumentRecord {
                title: title.to_string(),
                source: source.to_string(),
            });

        for (j, chunk) in chunks.iter().enumerate() {
            let chunk_id = format!("{doc_id}:{j}");
            state.positions.push(chunk_id.clone());
            state.docstore.chunks.push(ChunkRecord {
                id: chunk_id,
                doc_id: doc_id.clone(),
                text: chunk.clone(),
            });
        }
        debug_assert_eq!(state.positions.len(), state.index.len());

        self.persist(&state)?;
        info!(doc_id, chunks = chunks.len(), "indexed document");
        Ok(AddOutcome {
            doc_id,
            chunk_count: chunks.len(),
        })
    }

    /// Top-k chunks by cosine similarity. An empty store yields an empty
    /// result, never an error.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        {
            let state = self.state.lock().expect("vector store lock poisoned");
            if state.index.is_empty() {
                return Ok(Vec::new());
            }
        }

        let query_texts = [query.to_string()];
        let query_vec = self
            .embedder
            .embed(&query_texts)
            .await?
            .into_iter()
            .next()
            .context("embedder returned no vector for query")?;

        let state = self.state.lock().expect("vector store lock poisoned");
        let mut hits = Vec::new();
        for (rank0, (pos, score)) in state.index.search(&query_vec, k).into_iter().enumerate() {
            let Some(chunk_id) = state.positions.get(pos) else {
                continue;
            };
            let Some(chunk) = state.docstore.chunks.iter().find(|c| &c.id == chunk_id) else {
                continue;
            };
            let doc = state.docstore.docs.get(&chunk.doc_id);
            hits.push(SearchHit {
                rank: rank0 + 1,
                score,
                chunk_id: chunk_id.clone(),
                text: chunk.text.clone(),
                doc: DocMeta {
                    id: chunk.doc_id.clone(),
                    title: doc.map(|d| d.title.clone()),
                    source: doc.map(|d| d.source.clone()),
                },
            });
        }
        Ok(hits)
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .expect("vector store lock poisoned")
            .index
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, state: &StoreState) -> Result<()> {
        state.index.save(&self.dir.join(INDEX_FILE))?;
        write_json(&self.dir.join(DOCSTORE_FILE), &state.docstore)?;
        write_json(&self.dir.join(POSITIONS_FILE), &state.positions)?;
        Ok(())
    }
}

/// Deterministic short id for a document identity. Callers can compute it
/// before background ingestion completes.
pub fn doc_id_for(title: &str, source: &str) -> String {
    short_hash(&format!("{title}{source}"))
}

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())[..12].to_string()
}

fn read_json_or_default<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let data =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path:?}"))?;
    serde_json::from_str(&data).with_context(|| format!("Failed to parse {path:?}"))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Deterministic embedder: byte histogram folded into a fixed
    /// dimension. Texts with similar character distributions land close
    /// together, which is all these tests need.
    struct HistogramEmbedder;

    const DIM: usize = 16;

    #[async_trait]
    impl Embedder for HistogramEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; DIM];
                    for b in t.bytes() {
                        v[b as usize % DIM] += 1.0;
                    }
                    v
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            DIM
        }
    }

    fn open_store(dir: &Path) -> VectorStore {
        VectorStore::open(dir, Arc::new(HistogramEmbedder)).unwrap()
    }

    #[tokio::test]
    async fn add_then_search_returns_ranked_hits() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        let text = "word ".repeat(2000);
        let outcome = store.add_document("T", "S", &text).await.unwrap();
        assert!(outcome.chunk_count > 1);

        let hits = store.search("word", 3).await.unwrap();
        assert_eq!(hits.len(), 3);
        for (i, hit) in hits.iter().enumerate() {
            assert_eq!(hit.rank, i + 1);
            assert!(hit.chunk_id.starts_with(&outcome.doc_id));
            assert_eq!(hit.doc.title.as_deref(), Some("T"));
        }
        // Scores are non-increasing.
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn empty_store_search_is_empty_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        assert!(store.search("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn whitespace_document_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        let outcome = store.add_document("T", "S", "   \n\t ").await.unwrap();
        assert_eq!(outcome.chunk_count, 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let doc_id;
        {
            let store = open_store(dir.path());
            doc_id = store
                .add_document("Title", "src.txt", "evidence text here")
                .await
                .unwrap()
                .doc_id;
        }

        let reopened = open_store(dir.path());
        assert_eq!(reopened.len(), 1);
        let hits = reopened.search("evidence", 1).await.unwrap();
        assert_eq!(hits[0].chunk_id, format!("{doc_id}:0"));
        assert_eq!(hits[0].doc.source.as_deref(), Some("src.txt"));
    }

    #[tokio::test]
    async fn reingest_overwrites_metadata_and_appends_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        let first = store.add_document("T", "S", "some text").await.unwrap();
        let second = store.add_document("T", "S", "some text").await.unwrap();

        // Same identity, duplicated chunks: the documented quirk.
        assert_eq!(first.doc_id, second.doc_id);
        assert_eq!(store.len(), 2);
    }

    /// Reports the store's dimension but produces vectors of another.
    struct WrongDimEmbedder;

    #[async_trait]
    impl Embedder for WrongDimEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 2.0, 3.0]).collect())
        }

        fn dimension(&self) -> usize {
            DIM
        }
    }

    #[tokio::test]
    async fn failed_index_append_leaves_positions_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path(), Arc::new(WrongDimEmbedder)).unwrap();

        let err = store.add_document("T", "S", "some text").await;
        assert!(err.is_err());

        // The failed add must not leave partial state behind.
        {
            let state = store.state.lock().unwrap();
            assert_eq!(state.positions.len(), state.index.len());
            assert_eq!(state.positions.len(), 0);
            assert!(state.docstore.docs.is_empty());
            assert!(state.docstore.chunks.is_empty());
        }

        // A later good ingest into the same directory starts from row 0.
        drop(store);
        let store = open_store(dir.path());
        let outcome = store.add_document("T", "S", "some text").await.unwrap();
        assert_eq!(outcome.chunk_count, 1);
        let hits = store.search("some text", 1).await.unwrap();
        assert_eq!(hits[0].chunk_id, format!("{}:0", outcome.doc_id));
    }

    #[tokio::test]
    async fn positions_stay_aligned_across_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        store.add_document("A", "a", "alpha text").await.unwrap();
        store.add_document("B", "b", "beta text").await.unwrap();

        let state = store.state.lock().unwrap();
        assert_eq!(state.positions.len(), state.index.len());
    }

    #[test]
    fn doc_id_is_deterministic_and_short() {
        assert_eq!(short_hash("TS"), short_hash("TS"));
        assert_eq!(short_hash("TS").len(), 12);
        assert_ne!(short_hash("TS"), short_hash("other"));
    }
}
