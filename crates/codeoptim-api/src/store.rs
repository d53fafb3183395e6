//! In-memory experiment table.

use chrono::{DateTime, Utc};
use codeoptim_core::{
    CodeAnalysis, ExperimentId, ExperimentRequest, ExperimentResults, ExperimentStatus,
    PerformanceMetrics, ResearchFindings, VariantResult,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Everything known about one experiment, as returned by the results endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub id: ExperimentId,
    pub status: ExperimentStatus,
    pub request: ExperimentRequest,
    pub created_at: DateTime<Utc>,
    pub variants: Vec<VariantResult>,
    pub results: Option<ExperimentResults>,
    /// 0..=100
    pub progress: u8,
    pub analysis: Option<CodeAnalysis>,
    pub research: Option<ResearchFindings>,
    /// Measured run of the original code, only when the sandbox is enabled
    pub baseline: Option<PerformanceMetrics>,
    pub error: Option<String>,
    /// Creation order within this process
    #[serde(skip)]
    sequence: u64,
}

impl ExperimentRecord {
    fn new(id: ExperimentId, request: ExperimentRequest, sequence: u64) -> Self {
        Self {
            id,
            status: ExperimentStatus::Initializing,
            request,
            created_at: Utc::now(),
            variants: Vec::new(),
            results: None,
            progress: 0,
            analysis: None,
            research: None,
            baseline: None,
            error: None,
            sequence,
        }
    }

    pub fn summary(&self) -> ExperimentSummary {
        ExperimentSummary {
            id: self.id,
            status: self.status,
            progress: self.progress,
            language: self.request.language.clone(),
            target: self.request.target.clone(),
            variants_requested: self.request.variants,
            variants_count: self.variants.len(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub id: ExperimentId,
    pub status: ExperimentStatus,
    pub progress: u8,
    pub language: String,
    pub target: String,
    pub variants_requested: usize,
    pub variants_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct ExperimentStore {
    experiments: DashMap<ExperimentId, ExperimentRecord>,
    next_sequence: AtomicU64,
}

impl ExperimentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, request: ExperimentRequest) -> ExperimentId {
        let id = Uuid::new_v4();
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        self.experiments
            .insert(id, ExperimentRecord::new(id, request, sequence));
        id
    }

    /// Snapshot of the record; later updates are not reflected.
    pub fn get(&self, id: &ExperimentId) -> Option<ExperimentRecord> {
        self.experiments.get(id).map(|entry| entry.value().clone())
    }

    /// Apply `f` under the entry lock. Returns false for an unknown id.
    pub fn update<F>(&self, id: &ExperimentId, f: F) -> bool
    where
        F: FnOnce(&mut ExperimentRecord),
    {
        match self.experiments.get_mut(id) {
            Some(mut entry) => {
                f(entry.value_mut());
                true
            }
            None => false,
        }
    }

    /// Oldest first.
    pub fn list(&self) -> Vec<ExperimentSummary> {
        let mut records: Vec<(u64, ExperimentSummary)> = self
            .experiments
            .iter()
            .map(|entry| (entry.sequence, entry.summary()))
            .collect();
        records.sort_by_key(|(sequence, _)| *sequence);
        records.into_iter().map(|(_, summary)| summary).collect()
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    /// Experiments that have not completed or failed yet.
    pub fn running(&self) -> usize {
        self.experiments
            .iter()
            .filter(|entry| !entry.status.is_terminal())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn request(language: &str) -> ExperimentRequest {
        ExperimentRequest {
            code: "x = 1".to_string(),
            language: language.to_string(),
            target: "Performance".to_string(),
            variants: 3,
            iterations: 10,
            settings: HashMap::new(),
        }
    }

    #[test]
    fn create_starts_initializing() {
        let store = ExperimentStore::new();
        let id = store.create(request("python"));
        let record = store.get(&id).unwrap();
        assert_eq!(record.status, ExperimentStatus::Initializing);
        assert_eq!(record.progress, 0);
        assert!(record.variants.is_empty());
        assert_eq!(store.running(), 1);
    }

    #[test]
    fn update_changes_the_stored_record() {
        let store = ExperimentStore::new();
        let id = store.create(request("python"));

        assert!(store.update(&id, |r| {
            r.status = ExperimentStatus::Completed;
            r.progress = 100;
        }));
        assert_eq!(store.get(&id).unwrap().progress, 100);
        assert_eq!(store.running(), 0);

        assert!(!store.update(&Uuid::new_v4(), |r| r.progress = 1));
    }

    #[test]
    fn list_is_ordered_by_creation() {
        let store = ExperimentStore::new();
        let first = store.create(request("python"));
        let second = store.create(request("javascript"));

        let list = store.list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, first);
        assert_eq!(list[1].id, second);
        assert_eq!(list[1].language, "javascript");
        assert_eq!(list[0].variants_requested, 3);
    }
}
