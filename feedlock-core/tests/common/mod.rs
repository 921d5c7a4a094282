//! Shared test doubles for the integration suites.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use feedlock_core::selections::ImplementationStore;
use feedlock_core::trust::{
    Fingerprint, Presenter, SignatureRecord, TrustChangeSink, TrustError, TrustRequest,
    TrustStore, ValidSignature, Verdict,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;

/// Fingerprint made of one repeated hex digit
pub fn fp(seed: char) -> Fingerprint {
    Fingerprint::new(&seed.to_string().repeat(40)).unwrap()
}

/// Trust request over the given key seeds
pub fn request(uri: &str, seeds: &[char]) -> TrustRequest {
    let records = seeds
        .iter()
        .map(|seed| SignatureRecord::Valid(ValidSignature::new(fp(*seed))))
        .collect();
    TrustRequest::new(uri, b"<feed/>".to_vec(), records).unwrap()
}

/// In-memory trust store
#[derive(Default)]
pub struct MemStore {
    trusted: RwLock<HashSet<Fingerprint>>,
}

impl TrustStore for MemStore {
    fn is_trusted(&self, fingerprint: &Fingerprint) -> bool {
        self.trusted.read().unwrap().contains(fingerprint)
    }

    fn trust_key(&self, fingerprint: &Fingerprint) -> Result<(), TrustError> {
        self.trusted.write().unwrap().insert(fingerprint.clone());
        Ok(())
    }
}

/// Change sink that ignores notifications
pub struct NullSink;

impl TrustChangeSink for NullSink {
    fn trust_changed(&self) {}
}

/// Presenter that records what it showed and replays verdicts fed to it
/// through a channel
pub struct MockPresenter {
    presented: Mutex<Vec<String>>,
    verdicts: tokio::sync::Mutex<mpsc::UnboundedReceiver<Verdict>>,
}

impl MockPresenter {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedSender<Verdict>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let presenter = Arc::new(Self {
            presented: Mutex::new(Vec::new()),
            verdicts: tokio::sync::Mutex::new(receiver),
        });
        (presenter, sender)
    }

    pub fn presented(&self) -> Vec<String> {
        self.presented.lock().unwrap().clone()
    }
}

#[async_trait]
impl Presenter for MockPresenter {
    async fn present(&self, request: &TrustRequest) -> Result<Verdict> {
        self.presented
            .lock()
            .unwrap()
            .push(request.interface_uri.clone());
        let mut verdicts = self.verdicts.lock().await;
        verdicts
            .recv()
            .await
            .ok_or_else(|| anyhow!("no verdict scripted for {}", request.interface_uri))
    }
}

/// Implementation store with a fixed set of available ids
#[derive(Default)]
pub struct MemImplementationStore {
    available: HashSet<String>,
}

impl MemImplementationStore {
    pub fn with(ids: &[&str]) -> Self {
        Self {
            available: ids.iter().map(|id| id.to_string()).collect(),
        }
    }
}

impl ImplementationStore for MemImplementationStore {
    fn is_available(&self, implementation_id: &str) -> bool {
        self.available.contains(implementation_id)
    }
}

/// Poll until `check` passes or the deadline expires
pub async fn wait_until(check: impl Fn() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("condition not reached within deadline");
}
