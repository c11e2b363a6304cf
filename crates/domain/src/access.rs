use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{CompanyId, CompanyTree, Principal};

/// The set of companies a principal may operate on.
///
/// This is the single value the rest of the system consumes; it carries no
/// role or hierarchy detail beyond the two variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessibleCompanySet {
    /// Organization-wide visibility with no company restriction.
    Unrestricted,
    /// Explicit, deduplicated, hierarchy-expanded set of visible companies.
    Companies(BTreeSet<CompanyId>),
}

impl AccessibleCompanySet {
    /// Returns whether the scope is unrestricted.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }

    /// Returns whether a company is inside the scope.
    #[must_use]
    pub fn contains(&self, company_id: CompanyId) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Companies(ids) => ids.contains(&company_id),
        }
    }
}

/// Computes the accessible-company set for a principal against a snapshot.
///
/// Internal staff roles resolve to [`AccessibleCompanySet::Unrestricted`];
/// scoped roles resolve to their assigned companies plus every descendant.
/// A scoped principal with no assignments resolves to the empty set, never
/// to unrestricted visibility.
#[must_use]
pub fn resolve_scope(principal: &Principal, tree: &CompanyTree) -> AccessibleCompanySet {
    if principal.role().has_unrestricted_scope() {
        return AccessibleCompanySet::Unrestricted;
    }

    AccessibleCompanySet::Companies(tree.expand_to_descendant_ids(principal.assigned_companies()))
}

/// Storage predicate derived from an accessible-company set.
///
/// The value is opaque to callers: storage adapters combine it with their
/// own clauses (soft-delete, document kind) without reinterpreting it. An
/// empty company set matches zero records, never all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFilter {
    /// No company restriction clause.
    Unrestricted,
    /// Restricts records to those whose company id is in the set.
    CompanyIn(BTreeSet<CompanyId>),
}

impl DocumentFilter {
    /// Builds the storage predicate for a resolved scope.
    #[must_use]
    pub fn from_scope(scope: AccessibleCompanySet) -> Self {
        match scope {
            AccessibleCompanySet::Unrestricted => Self::Unrestricted,
            AccessibleCompanySet::Companies(ids) => Self::CompanyIn(ids),
        }
    }

    /// Evaluates the predicate against one record's company.
    #[must_use]
    pub fn matches(&self, company_id: CompanyId) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::CompanyIn(ids) => ids.contains(&company_id),
        }
    }

    /// Evaluates the predicate against a record tied to several companies.
    ///
    /// Used for user records, which carry a set of assigned companies; the
    /// record matches when any assignment is inside the filter.
    #[must_use]
    pub fn matches_any(&self, company_ids: &BTreeSet<CompanyId>) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::CompanyIn(ids) => company_ids.iter().any(|id| ids.contains(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use uuid::Uuid;

    use super::{AccessibleCompanySet, DocumentFilter, resolve_scope};
    use crate::{Company, CompanyId, CompanyKind, CompanyTree, Principal, Role, UserId};

    fn company_id(index: u128) -> CompanyId {
        CompanyId::from_uuid(Uuid::from_u128(index + 1))
    }

    fn company(
        index: u128,
        kind: CompanyKind,
        parent: Option<u128>,
    ) -> Company {
        Company::new(
            company_id(index),
            format!("Company {index}"),
            kind,
            parent.map(company_id),
            true,
            None,
            false,
        )
        .unwrap_or_else(|_| unreachable!())
    }

    /// Corp A (0) -> Sub B (1) -> Branch C (2).
    fn chain_tree() -> CompanyTree {
        CompanyTree::new(vec![
            company(0, CompanyKind::Corporate, None),
            company(1, CompanyKind::Subsidiary, Some(0)),
            company(2, CompanyKind::Branch, Some(1)),
        ])
        .unwrap_or_else(|_| unreachable!())
    }

    fn principal(role: Role, assigned: &[u128]) -> Principal {
        Principal::new(
            UserId::new(),
            role,
            assigned.iter().map(|index| company_id(*index)).collect(),
        )
    }

    #[test]
    fn staff_roles_resolve_unrestricted_regardless_of_assignments() {
        let tree = chain_tree();
        for role in [Role::GlobalAdmin, Role::Administrator, Role::Manager] {
            let scope = resolve_scope(&principal(role, &[1]), &tree);
            assert!(scope.is_unrestricted());
            let scope = resolve_scope(&principal(role, &[]), &tree);
            assert!(scope.is_unrestricted());
        }
    }

    #[test]
    fn scoped_role_without_assignments_sees_nothing() {
        let tree = chain_tree();
        let scope = resolve_scope(&principal(Role::CreditController, &[]), &tree);
        assert_eq!(scope, AccessibleCompanySet::Companies(BTreeSet::new()));

        let filter = DocumentFilter::from_scope(scope);
        for index in 0..3 {
            assert!(!filter.matches(company_id(index)));
        }
    }

    #[test]
    fn external_user_assigned_to_root_sees_whole_chain() {
        let tree = chain_tree();
        let scope = resolve_scope(&principal(Role::ExternalUser, &[0]), &tree);
        assert_eq!(
            scope,
            AccessibleCompanySet::Companies(BTreeSet::from([
                company_id(0),
                company_id(1),
                company_id(2),
            ]))
        );
    }

    #[test]
    fn external_user_assigned_mid_chain_never_sees_ancestors() {
        let tree = chain_tree();
        let scope = resolve_scope(&principal(Role::ExternalUser, &[1]), &tree);
        assert_eq!(
            scope,
            AccessibleCompanySet::Companies(BTreeSet::from([company_id(1), company_id(2)]))
        );
        assert!(!scope.contains(company_id(0)));
    }

    #[test]
    fn unrestricted_filter_matches_everything() {
        let filter = DocumentFilter::from_scope(AccessibleCompanySet::Unrestricted);
        assert!(filter.matches(company_id(7)));
        assert!(filter.matches_any(&BTreeSet::new()));
    }

    #[test]
    fn empty_filter_matches_no_company_set() {
        let filter = DocumentFilter::CompanyIn(BTreeSet::new());
        assert!(!filter.matches(company_id(0)));
        assert!(!filter.matches_any(&BTreeSet::from([company_id(0), company_id(1)])));
    }

    #[test]
    fn filter_matches_any_requires_one_overlap() {
        let filter = DocumentFilter::CompanyIn(BTreeSet::from([company_id(1)]));
        assert!(filter.matches_any(&BTreeSet::from([company_id(0), company_id(1)])));
        assert!(!filter.matches_any(&BTreeSet::from([company_id(0), company_id(2)])));
    }
}
