use std::collections::{BTreeSet, HashMap};

use billport_core::{AppError, AppResult};

use crate::{Company, CompanyId};

/// Immutable company-hierarchy snapshot with a parent-to-children index.
///
/// Built from a full company listing and never mutated afterwards; requests
/// resolve every hierarchy question against one snapshot, so concurrent
/// administrative writes only affect later snapshots. A parent pointer that
/// refers to a company missing from the snapshot (a deleted parent) makes
/// the subtree behave as a detached root.
#[derive(Debug, Clone)]
pub struct CompanyTree {
    companies: HashMap<CompanyId, Company>,
    children: HashMap<CompanyId, Vec<CompanyId>>,
}

impl CompanyTree {
    /// Builds a snapshot from a company listing.
    ///
    /// Fails with a conflict when the listing contains a duplicate id.
    pub fn new(listing: Vec<Company>) -> AppResult<Self> {
        let mut companies = HashMap::with_capacity(listing.len());
        let mut children: HashMap<CompanyId, Vec<CompanyId>> = HashMap::new();

        for company in listing {
            if let Some(parent_id) = company.parent_id() {
                children.entry(parent_id).or_default().push(company.id());
            }
            if companies.insert(company.id(), company).is_some() {
                return Err(AppError::Conflict(
                    "duplicate company id in hierarchy listing".to_owned(),
                ));
            }
        }

        Ok(Self {
            companies,
            children,
        })
    }

    /// Returns one company from the snapshot.
    #[must_use]
    pub fn company(&self, id: CompanyId) -> Option<&Company> {
        self.companies.get(&id)
    }

    /// Returns the number of companies in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.companies.len()
    }

    /// Returns whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    /// Returns the ancestor chain of a company, nearest parent first.
    ///
    /// Fails with `UnknownCompany` for an id absent from the snapshot and
    /// with `CycleDetected` when following parent pointers revisits a node,
    /// which indicates a data-integrity violation upstream.
    pub fn ancestors(&self, id: CompanyId) -> AppResult<Vec<&Company>> {
        let mut current = self
            .companies
            .get(&id)
            .ok_or_else(|| AppError::UnknownCompany(id.to_string()))?;

        let mut seen = BTreeSet::from([id]);
        let mut chain = Vec::new();

        while let Some(parent_id) = current.parent_id() {
            if !seen.insert(parent_id) {
                return Err(AppError::CycleDetected(format!(
                    "company '{parent_id}' revisited while walking ancestors of '{id}'"
                )));
            }

            let Some(parent) = self.companies.get(&parent_id) else {
                break;
            };
            chain.push(parent);
            current = parent;
        }

        Ok(chain)
    }

    /// Returns every transitive child of a company.
    ///
    /// Deterministic for a fixed snapshot; no further ordering guarantee.
    pub fn descendants(&self, id: CompanyId) -> AppResult<Vec<&Company>> {
        if !self.companies.contains_key(&id) {
            return Err(AppError::UnknownCompany(id.to_string()));
        }

        let mut collected = Vec::new();
        let mut visited = BTreeSet::from([id]);
        let mut stack = vec![id];

        while let Some(next) = stack.pop() {
            let Some(child_ids) = self.children.get(&next) else {
                continue;
            };
            for child_id in child_ids {
                if !visited.insert(*child_id) {
                    continue;
                }
                if let Some(child) = self.companies.get(child_id) {
                    collected.push(child);
                    stack.push(*child_id);
                }
            }
        }

        Ok(collected)
    }

    /// Expands a set of company ids with all of their descendants' ids.
    ///
    /// Input ids are always part of the result, even when absent from the
    /// snapshot: an explicit assignment stays an explicit grant. The walk
    /// touches only the subtrees below the input set, not the whole tree.
    #[must_use]
    pub fn expand_to_descendant_ids(&self, ids: &BTreeSet<CompanyId>) -> BTreeSet<CompanyId> {
        let mut expanded = BTreeSet::new();
        let mut stack = Vec::new();

        for id in ids {
            if expanded.insert(*id) && self.companies.contains_key(id) {
                stack.push(*id);
            }
            while let Some(next) = stack.pop() {
                let Some(child_ids) = self.children.get(&next) else {
                    continue;
                };
                for child_id in child_ids {
                    if expanded.insert(*child_id) {
                        stack.push(*child_id);
                    }
                }
            }
        }

        expanded
    }

    /// Validates a proposed parent assignment before it is written.
    ///
    /// Fails with `CycleDetected` when the proposed parent is the company
    /// itself or one of its descendants, and with `UnknownCompany` when
    /// either side is missing from the snapshot.
    pub fn validate_parent(&self, child_id: CompanyId, new_parent_id: CompanyId) -> AppResult<()> {
        if child_id == new_parent_id {
            return Err(AppError::CycleDetected(format!(
                "company '{child_id}' cannot be its own parent"
            )));
        }
        if !self.companies.contains_key(&new_parent_id) {
            return Err(AppError::UnknownCompany(new_parent_id.to_string()));
        }

        let descendant_ids: BTreeSet<CompanyId> = self
            .descendants(child_id)?
            .iter()
            .map(|company| company.id())
            .collect();
        if descendant_ids.contains(&new_parent_id) {
            return Err(AppError::CycleDetected(format!(
                "company '{new_parent_id}' is a descendant of '{child_id}'"
            )));
        }

        Ok(())
    }
}
