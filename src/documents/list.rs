//! Ordered upload list and its reconciliation against the server's order

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::types::ServerDocument;

/// Two neighbouring rows that exchanged places; `left` was at `index`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Swap {
    pub index: usize,
    pub left: String,
    pub right: String,
}

/// What has to happen to the local list to match the server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Local entries the server no longer reports, in local order
    pub removals: Vec<String>,
    /// Entries to fetch: missing locally or marked for refresh, in server order
    pub fetches: Vec<String>,
    /// Server placement order
    pub order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry<R> {
    pub id: String,
    pub row: R,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadList<R> {
    entries: Vec<ListEntry<R>>,
}

impl<R> Default for UploadList<R> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<R> UploadList<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    pub fn entries(&self) -> &[ListEntry<R>] {
        &self.entries
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&R> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.row)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Append a new entry at the end
    pub fn push(&mut self, id: impl Into<String>, row: R) {
        self.entries.push(ListEntry { id: id.into(), row });
    }

    /// Replace the row of an existing entry in place, returning the old row.
    /// Unknown ids are appended and `None` is returned.
    pub fn upsert(&mut self, id: &str, row: R) -> Option<R> {
        match self.position(id) {
            Some(index) => Some(std::mem::replace(&mut self.entries[index].row, row)),
            None => {
                self.push(id, row);
                None
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<R> {
        let index = self.position(id)?;
        Some(self.entries.remove(index).row)
    }

    /// Compare with the server's canonical list
    pub fn plan(&self, server: &[ServerDocument]) -> ReconcilePlan {
        let server_ids: HashSet<&str> = server.iter().map(|d| d.id.as_str()).collect();
        let removals = self
            .entries
            .iter()
            .filter(|e| !server_ids.contains(e.id.as_str()))
            .map(|e| e.id.clone())
            .collect();
        let fetches = server
            .iter()
            .filter(|d| d.refresh || !self.contains(&d.id))
            .map(|d| d.id.clone())
            .collect();
        ReconcilePlan {
            removals,
            fetches,
            order: server.iter().map(|d| d.id.clone()).collect(),
        }
    }

    /// Reorder to `order` with adjacent swaps only.
    ///
    /// Bubble sort on the placement index, so the number of swaps equals the
    /// number of inversions. Entries missing from `order` sink to the end in
    /// their current relative order.
    pub fn reorder(&mut self, order: &[String]) -> Vec<Swap> {
        let placement: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let mut keys: Vec<usize> = self
            .entries
            .iter()
            .map(|e| placement.get(e.id.as_str()).copied().unwrap_or(usize::MAX))
            .collect();

        let mut swaps = Vec::new();
        let n = self.entries.len();
        for pass in 0..n {
            let mut swapped = false;
            for j in 0..n.saturating_sub(pass + 1) {
                if keys[j] > keys[j + 1] {
                    swaps.push(Swap {
                        index: j,
                        left: self.entries[j].id.clone(),
                        right: self.entries[j + 1].id.clone(),
                    });
                    keys.swap(j, j + 1);
                    self.entries.swap(j, j + 1);
                    swapped = true;
                }
            }
            if !swapped {
                break;
            }
        }
        swaps
    }
}
