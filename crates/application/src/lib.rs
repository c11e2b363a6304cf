//! Application services and storage ports for the billing portal.

#![forbid(unsafe_code)]

mod audit;
mod company_admin_service;
mod company_ports;
mod dashboard_service;
mod document_ports;
mod document_service;
mod permission_gate;
mod scope_resolver;
mod user_admin_service;
mod user_ports;

pub use audit::{AuditEvent, AuditRepository};
pub use company_admin_service::CompanyAdminService;
pub use company_ports::{CompanyRepository, CreateCompanyInput};
pub use dashboard_service::{DashboardService, DashboardStatistics};
pub use document_ports::{DocumentQuery, DocumentRepository};
pub use document_service::DocumentService;
pub use permission_gate::{AccessDecision, DenyReason, PermissionGate};
pub use scope_resolver::ScopeResolver;
pub use user_admin_service::UserAdminService;
pub use user_ports::{CreateUserInput, UserRepository};
