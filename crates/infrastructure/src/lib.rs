//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod database;
mod in_memory_portal_store;
mod postgres_audit_repository;
mod postgres_company_repository;
mod postgres_document_repository;
mod postgres_user_repository;

pub use database::{DatabaseConfig, connect, run_migrations};
pub use in_memory_portal_store::InMemoryPortalStore;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_company_repository::PostgresCompanyRepository;
pub use postgres_document_repository::PostgresDocumentRepository;
pub use postgres_user_repository::PostgresUserRepository;
