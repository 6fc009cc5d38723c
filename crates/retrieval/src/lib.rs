//! Persistent vector retrieval store: chunk, embed, index, search.
//!
//! An exact flat index is enough at this scale; corpora are per-user and
//! modest. Search is cosine similarity via dot product over normalized
//! vectors. The index is append-only; document deletion is out of scope.

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod store;

pub use chunker::{chunk_text, CHUNK_OVERLAP, CHUNK_SIZE};
pub use embeddings::{Embedder, HttpEmbedder};
pub use index::FlatIndex;
pub use store::{doc_id_for, AddOutcome, DocMeta, DocumentRecord, SearchHit, VectorStore};
