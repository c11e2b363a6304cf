use std::collections::BTreeSet;

use chrono::NaiveDate;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use billport_application::{DocumentQuery, DocumentRepository};
use billport_domain::{
    BillingDocument, CompanyId, DocumentFilter, DocumentId, DocumentKind, DocumentStatus,
};

use super::PostgresDocumentRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres document repository tests: {error}");
    }

    Some(pool)
}

fn document(company_id: CompanyId, kind: DocumentKind, number: &str) -> BillingDocument {
    BillingDocument::new(
        DocumentId::new(),
        company_id,
        kind,
        number,
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap_or_else(|| unreachable!()),
        Some(NaiveDate::from_ymd_opt(2025, 7, 31).unwrap_or_else(|| unreachable!())),
        999_00,
        "EUR",
        DocumentStatus::Open,
    )
    .unwrap_or_else(|_| unreachable!())
}

async fn insert_document(pool: &PgPool, document: &BillingDocument) {
    let inserted = sqlx::query(
        r#"
        INSERT INTO billing_documents
            (id, company_id, kind, number, issued_on, due_on, amount_minor, currency, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(document.id().as_uuid())
    .bind(document.company_id().as_uuid())
    .bind(document.kind().as_str())
    .bind(document.number().as_str())
    .bind(document.issued_on())
    .bind(document.due_on())
    .bind(document.amount_minor())
    .bind(document.currency())
    .bind(document.status().as_str())
    .execute(pool)
    .await;

    assert!(inserted.is_ok());
}

#[tokio::test]
async fn scoped_listing_excludes_other_companies() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresDocumentRepository::new(pool.clone());
    let in_scope = CompanyId::new();
    let out_of_scope = CompanyId::new();
    insert_document(&pool, &document(in_scope, DocumentKind::Invoice, "INV-1")).await;
    insert_document(&pool, &document(out_of_scope, DocumentKind::Invoice, "INV-2")).await;

    let filter = DocumentFilter::CompanyIn(BTreeSet::from([in_scope]));
    let listed = repository
        .list_documents(&filter, DocumentQuery::default())
        .await;
    assert!(listed.is_ok());
    let listed = listed.unwrap_or_default();
    assert_eq!(listed.len(), 1);
    assert!(listed.iter().all(|document| document.company_id() == in_scope));
}

#[tokio::test]
async fn empty_filter_matches_zero_rows() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresDocumentRepository::new(pool.clone());
    let company_id = CompanyId::new();
    insert_document(&pool, &document(company_id, DocumentKind::Statement, "ST-1")).await;

    let filter = DocumentFilter::CompanyIn(BTreeSet::new());
    let listed = repository
        .list_documents(&filter, DocumentQuery::default())
        .await;
    assert_eq!(listed.map(|documents| documents.len()).ok(), Some(0));

    let count = repository
        .count_documents(&filter, DocumentKind::Statement)
        .await;
    assert_eq!(count.ok(), Some(0));
}

#[tokio::test]
async fn kind_count_is_scoped_to_the_filter() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresDocumentRepository::new(pool.clone());
    let company_id = CompanyId::new();
    insert_document(&pool, &document(company_id, DocumentKind::Invoice, "INV-1")).await;
    insert_document(&pool, &document(company_id, DocumentKind::CreditNote, "CN-1")).await;

    let filter = DocumentFilter::CompanyIn(BTreeSet::from([company_id]));
    let invoices = repository
        .count_documents(&filter, DocumentKind::Invoice)
        .await;
    assert_eq!(invoices.ok(), Some(1));
    let credit_notes = repository
        .count_documents(&filter, DocumentKind::CreditNote)
        .await;
    assert_eq!(credit_notes.ok(), Some(1));
}
