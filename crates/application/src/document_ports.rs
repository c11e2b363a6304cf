use async_trait::async_trait;

use billport_core::AppResult;
use billport_domain::{BillingDocument, DocumentFilter, DocumentId, DocumentKind, DocumentStatus};

/// Listing parameters for billing documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentQuery {
    /// Optional document-kind filter.
    pub kind: Option<DocumentKind>,
    /// Optional settlement-status filter.
    pub status: Option<DocumentStatus>,
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
}

impl Default for DocumentQuery {
    fn default() -> Self {
        Self {
            kind: None,
            status: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Port for billing-document storage.
///
/// The scoping filter is combined with the query clauses by the adapter; it
/// is never widened or reinterpreted.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Finds one document by id, ignoring scope.
    async fn find_document(&self, id: DocumentId) -> AppResult<Option<BillingDocument>>;

    /// Lists documents matching the scoping filter and query.
    async fn list_documents(
        &self,
        filter: &DocumentFilter,
        query: DocumentQuery,
    ) -> AppResult<Vec<BillingDocument>>;

    /// Counts documents of one kind matching the scoping filter.
    async fn count_documents(
        &self,
        filter: &DocumentFilter,
        kind: DocumentKind,
    ) -> AppResult<u64>;
}
