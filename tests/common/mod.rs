#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use vector_relay::{
    config::VECTOR_DIMENSION,
    embeddings::Embedder,
    store::{IndexDescription, InMemoryStore, ScoredVector, UpsertAck, VectorRecord, VectorStore},
    RelayError, RelayResult,
};

/// Deterministic bag-of-words embedder: every distinct lowercase word gets its
/// own slot, so unrelated texts are orthogonal.
#[derive(Default)]
pub struct FakeEmbedder {
    pub calls: AtomicUsize,
    vocabulary: Mutex<HashMap<String, usize>>,
}

impl FakeEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vocabulary = self.vocabulary.lock().unwrap();
        let mut vector = vec![0.0; VECTOR_DIMENSION];
        for word in text.split_whitespace() {
            let word = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if word.is_empty() {
                continue;
            }
            let next = vocabulary.len();
            let slot = *vocabulary.entry(word).or_insert(next);
            vector[slot % VECTOR_DIMENSION] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn dimension(&self) -> usize {
        VECTOR_DIMENSION
    }

    async fn embed_documents(&self, texts: &[String]) -> RelayResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> RelayResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vectorize(text))
    }
}

/// In-memory store that counts every call made to it. Upserts fail while
/// `fail_upserts` is set, health checks while `unreachable` is.
pub struct CountingStore {
    pub inner: InMemoryStore,
    pub calls: AtomicUsize,
    pub fail_upserts: AtomicBool,
    pub unreachable: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryStore::new(),
            calls: AtomicUsize::new(0),
            fail_upserts: AtomicBool::new(false),
            unreachable: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl VectorStore for CountingStore {
    fn id(&self) -> &'static str {
        "counting-memory"
    }

    async fn health_check(&self) -> RelayResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RelayError::Downstream("store unreachable".into()));
        }
        self.inner.health_check().await
    }

    async fn describe_index(&self, name: &str) -> RelayResult<IndexDescription> {
        self.hit();
        self.inner.describe_index(name).await
    }

    async fn create_index(&self, name: &str, dimension: usize) -> RelayResult<Value> {
        self.hit();
        self.inner.create_index(name, dimension).await
    }

    async fn upsert(
        &self,
        index: &str,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> RelayResult<UpsertAck> {
        self.hit();
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(RelayError::Downstream("upsert rejected by store".into()));
        }
        self.inner.upsert(index, namespace, records).await
    }

    async fn query(
        &self,
        index: &str,
        namespace: &str,
        vector: Vec<f32>,
        top_k: usize,
    ) -> RelayResult<Vec<ScoredVector>> {
        self.hit();
        self.inner.query(index, namespace, vector, top_k).await
    }
}

pub struct Fixture {
    pub store: Arc<CountingStore>,
    pub embedder: Arc<FakeEmbedder>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            store: Arc::new(CountingStore::new()),
            embedder: Arc::new(FakeEmbedder::default()),
        }
    }

    pub fn relay(&self) -> vector_relay::RelayService {
        vector_relay::RelayService::new(self.store.clone(), self.embedder.clone(), 200)
    }

    pub fn downstream_calls(&self) -> usize {
        self.store.calls() + self.embedder.calls()
    }
}
