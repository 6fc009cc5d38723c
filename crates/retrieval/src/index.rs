//! Exact flat similarity index.
//!
//! Brute-force dot product over L2-normalized rows equals cosine
//! similarity. Trades sub-linear search for simplicity and exactness; an
//! approximate index could replace this behind the same interface.

use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::path::Path;

pub struct FlatIndex {
    dim: usize,
    rows: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Append rows, normalizing each so dot-product search is cosine.
    /// All-or-nothing: dimensions are checked up front, so a failed call
    /// leaves the index untouched.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<()> {
        for v in &vectors {
            if v.len() != self.dim {
                anyhow::bail!(
                    "vector dimension mismatch: expected {}, got {}",
                    self.dim,
                    v.len()
                );
            }
        }
        for mut v in vectors {
            normalize(&mut v);
            self.rows.push(v);
        }
        Ok(())
    }

    /// Top-k rows by cosine similarity, best first. Empty index yields an
    /// empty result, never an error.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if self.rows.is_empty() || k == 0 {
            return Vec::new();
        }
        let mut q = query.to_vec();
        normalize(&mut q);

        let mut scored: Vec<(usize, f32)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i, dot(row, &q)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// Write the index: `u32` dim, `u32` row count, then row-major
    /// little-endian `f32` values.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut buf =
            Vec::with_capacity(8 + self.rows.len() * self.dim * std::mem::size_of::<f32>());
        buf.write_all(&(self.dim as u32).to_le_bytes())?;
        buf.write_all(&(self.rows.len() as u32).to_le_bytes())?;
        for row in &self.rows {
            for value in row {
                buf.write_all(&value.to_le_bytes())?;
            }
        }
        std::fs::write(path, buf).with_context(|| format!("Failed to write index: {path:?}"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data =
            std::fs::read(path).with_context(|| format!("Failed to read index: {path:?}"))?;
        let mut reader = data.as_slice();

        let mut header = [0u8; 4];
        reader
            .read_exact(&mut header)
            .context("index file truncated: missing dimension")?;
        let dim = u32::from_le_bytes(header) as usize;
        reader
            .read_exact(&mut header)
            .context("index file truncated: missing row count")?;
        let row_count = u32::from_le_bytes(header) as usize;

        let mut rows = Vec::with_capacity(row_count);
        let mut value = [0u8; 4];
        for _ in 0..row_count {
            let mut row = Vec::with_capacity(dim);
            for _ in 0..dim {
                reader
                    .read_exact(&mut value)
                    .context("index file truncated: missing vector data")?;
                row.push(f32::from_le_bytes(value));
            }
            rows.push(row);
        }
        Ok(Self { dim, rows })
    }
}

fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
