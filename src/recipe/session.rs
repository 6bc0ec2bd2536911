// src/recipe/session.rs

//! Import session: identity registry and batch ordering
//!
//! A session accumulates the identities a data step declares, the logical
//! name attached to each, and the dependencies between them. From those it
//! derives one total order over all declared units, dependencies first,
//! deterministic across runs: ready units are taken lowest declaration
//! index first, so units with no ordering constraint keep their declaration
//! order. Batches are then contiguous windows over that order, walked with
//! a cursor that never hands the same unit out twice.

use crate::error::{Error, Result};
use crate::identity::ContentIdentity;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use tracing::debug;

/// Registry of declared import units and the batching state over them.
#[derive(Debug, Default)]
pub struct ImportSession {
    /// Identities in declaration order
    declared: Vec<ContentIdentity>,
    /// Logical name registered for each identity
    names: HashMap<ContentIdentity, String>,
    /// Dependent identity -> identities it requires
    dependencies: HashMap<ContentIdentity, Vec<ContentIdentity>>,
    /// Derived total order, built lazily on first batch
    order: Option<Vec<ContentIdentity>>,
    /// Identities already handed out by `next_in_batch`
    consumed: HashSet<ContentIdentity>,
    /// Current batch window
    batch: Vec<ContentIdentity>,
    cursor: usize,
}

impl ImportSession {
    pub fn new() -> Self {
        ImportSession::default()
    }

    /// Register an identity under a logical name. Redeclaring an identity
    /// updates its name but keeps its original declaration position.
    pub fn declare(&mut self, identity: ContentIdentity, logical_name: impl Into<String>) {
        if !self.names.contains_key(&identity) {
            self.declared.push(identity.clone());
        }
        self.names.insert(identity, logical_name.into());
        self.order = None;
    }

    /// Record that `dependent` must be imported after `requirement`.
    ///
    /// A requirement that is never declared in this session does not
    /// constrain ordering; it is treated as a reference to content outside
    /// the step and resolved at import time instead.
    pub fn add_dependency(&mut self, dependent: &ContentIdentity, requirement: ContentIdentity) {
        let requirements = self.dependencies.entry(dependent.clone()).or_default();
        if !requirements.contains(&requirement) {
            requirements.push(requirement);
            self.order = None;
        }
    }

    /// Number of identities declared so far.
    pub fn declared_count(&self) -> usize {
        self.declared.len()
    }

    pub fn is_declared(&self, identity: &ContentIdentity) -> bool {
        self.names.contains_key(identity)
    }

    /// The logical name an identity was declared under.
    pub fn logical_name(&self, identity: &ContentIdentity) -> Option<&str> {
        self.names.get(identity).map(|s| s.as_str())
    }

    /// Select the batch window starting at `start_offset` in the derived
    /// order, at most `max_size` units wide. Units already handed out are
    /// excluded, so re-initializing an earlier window never replays work.
    ///
    /// Fails when the declared dependencies contain a cycle; a cycle means
    /// no import order exists at all.
    pub fn initialize_batch(&mut self, start_offset: usize, max_size: usize) -> Result<()> {
        if self.order.is_none() {
            let order = self.derive_order()?;
            debug!("Derived import order over {} unit(s)", order.len());
            self.order = Some(order);
        }

        let selected: Vec<ContentIdentity> = {
            let order = self.order.as_deref().unwrap_or(&[]);
            let start = start_offset.min(order.len());
            let end = start_offset.saturating_add(max_size).min(order.len());
            order[start..end]
                .iter()
                .filter(|id| !self.consumed.contains(*id))
                .cloned()
                .collect()
        };
        self.batch = selected;
        self.cursor = 0;
        Ok(())
    }

    /// The next unit of the current batch, or `None` when the batch is
    /// exhausted. Exhaustion is stable: once `None` is returned, calling
    /// again keeps returning `None` until a new batch is initialized.
    pub fn next_in_batch(&mut self) -> Option<ContentIdentity> {
        while self.cursor < self.batch.len() {
            let identity = self.batch[self.cursor].clone();
            self.cursor += 1;
            if self.consumed.insert(identity.clone()) {
                return Some(identity);
            }
        }
        None
    }

    /// Kahn's algorithm over the declared units, lowest declaration index
    /// first among ready units.
    fn derive_order(&self) -> Result<Vec<ContentIdentity>> {
        let len = self.declared.len();
        let index: HashMap<&ContentIdentity, usize> = self
            .declared
            .iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();

        let mut in_degree = vec![0usize; len];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); len];
        for (dependent, requirements) in &self.dependencies {
            let Some(&dependent_index) = index.get(dependent) else {
                continue;
            };
            for requirement in requirements {
                // Undeclared requirement: external reference, not ordered here
                let Some(&requirement_index) = index.get(requirement) else {
                    continue;
                };
                dependents[requirement_index].push(dependent_index);
                in_degree[dependent_index] += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(len);
        while let Some(Reverse(i)) = ready.pop() {
            order.push(self.declared[i].clone());
            for &dependent in &dependents[i] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }

        if order.len() != len {
            let stuck: Vec<&str> = self
                .declared
                .iter()
                .enumerate()
                .filter(|(i, _)| in_degree[*i] > 0)
                .map(|(_, id)| id.as_str())
                .collect();
            return Err(Error::DependencyCycle(stuck.join(", ")));
        }
        Ok(order)
    }
}
