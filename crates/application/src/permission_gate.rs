use std::sync::Arc;

use billport_core::{AppError, AppResult};
use billport_domain::{AccessPolicy, Capability, Principal};

/// Outcome of a request-time permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// The principal may use the capability.
    Allow,
    /// The principal may not use the capability.
    Deny(DenyReason),
}

/// Reason attached to a denied permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The principal's role is outside the capability's allowed set.
    InsufficientRole,
    /// The capability is missing from the configured table.
    UnknownCapability,
}

/// Request-time permission gate backed by the immutable access policy.
///
/// Checks are pure functions of (principal, policy); the gate holds no
/// per-request state and is safe for unbounded concurrent use.
#[derive(Clone)]
pub struct PermissionGate {
    policy: Arc<AccessPolicy>,
}

impl PermissionGate {
    /// Creates a gate over the given policy.
    #[must_use]
    pub fn new(policy: Arc<AccessPolicy>) -> Self {
        Self { policy }
    }

    /// Decides whether the principal may use the capability.
    ///
    /// Fails only when the principal's role is missing from the configured
    /// hierarchy; an unconfigured capability surfaces as a deny decision.
    pub fn check(&self, principal: &Principal, capability: Capability) -> AppResult<AccessDecision> {
        match self.policy.has_capability(principal.role(), capability) {
            Ok(true) => Ok(AccessDecision::Allow),
            Ok(false) => Ok(AccessDecision::Deny(DenyReason::InsufficientRole)),
            Err(AppError::UnknownCapability(_)) => {
                Ok(AccessDecision::Deny(DenyReason::UnknownCapability))
            }
            Err(error) => Err(error),
        }
    }

    /// Ensures the principal may use the capability.
    ///
    /// An insufficient role maps to an authorization failure; an
    /// unconfigured capability maps to a fatal configuration error and is
    /// never treated as permissive.
    pub fn require(&self, principal: &Principal, capability: Capability) -> AppResult<()> {
        match self.check(principal, capability)? {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny(DenyReason::InsufficientRole) => {
                Err(AppError::Forbidden(format!(
                    "role '{}' is missing capability '{}'",
                    principal.role().as_str(),
                    capability.as_str()
                )))
            }
            AccessDecision::Deny(DenyReason::UnknownCapability) => Err(
                AppError::UnknownCapability(capability.as_str().to_owned()),
            ),
        }
    }

    /// Returns whether the capability is allowed, for optional surfaces
    /// such as gated dashboard counts.
    pub fn allows(&self, principal: &Principal, capability: Capability) -> AppResult<bool> {
        match self.check(principal, capability)? {
            AccessDecision::Allow => Ok(true),
            AccessDecision::Deny(DenyReason::InsufficientRole) => Ok(false),
            AccessDecision::Deny(DenyReason::UnknownCapability) => Err(
                AppError::UnknownCapability(capability.as_str().to_owned()),
            ),
        }
    }
}
