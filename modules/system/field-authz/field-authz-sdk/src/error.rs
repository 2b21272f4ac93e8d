//! Error types for the field `AuthZ` module.

use std::fmt;

use crate::models::Action;

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialKind {
    /// The principal is the default (anonymous) role.
    Unauthenticated,
    /// The principal is authenticated but lacks the grant.
    Unauthorized,
}

impl fmt::Display for DenialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => f.write_str("unauthenticated"),
            Self::Unauthorized => f.write_str("unauthorized"),
        }
    }
}

/// A refused authorization check.
///
/// Carries the configured HTTP-like status so callers can map it directly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} ({status}): {action} on {resource_type}{}", field_suffix(.field.as_deref()))]
pub struct Denial {
    pub kind: DenialKind,
    pub status: u16,
    pub action: Action,
    pub resource_type: String,
    /// Offending field, for per-field backends that fail fast.
    pub field: Option<String>,
}

fn field_suffix(field: Option<&str>) -> String {
    field.map(|f| format!(" field `{f}`")).unwrap_or_default()
}

impl Denial {
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }
}

/// Failure inside a policy backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    #[error("invalid evaluation context: {0}")]
    InvalidContext(String),

    #[error("internal policy error: {0}")]
    Internal(String),
}

/// Failure while fetching the current state of the targeted rows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("lookup failed: {0}")]
    Lookup(String),

    #[error("resource store unavailable")]
    Unavailable,
}

/// Invalid module or backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no policy backend configured")]
    MissingBackend,

    #[error("unknown policy backend `{name}` (known: {})", .known.join(", "))]
    UnknownBackend { name: String, known: Vec<String> },

    #[error("invalid configuration for backend `{backend}`: {reason}")]
    InvalidBackendConfig { backend: String, reason: String },
}

/// Errors surfaced by the authorization lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizeError {
    #[error(transparent)]
    Denied(#[from] Denial),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AuthorizeError {
    /// Status for denials; `None` for everything else.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Denied(denial) => Some(denial.status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied(_))
    }

    #[must_use]
    pub fn as_denial(&self) -> Option<&Denial> {
        match self {
            Self::Denied(denial) => Some(denial),
            _ => None,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn denial(field: Option<&str>) -> Denial {
        Denial {
            kind: DenialKind::Unauthorized,
            status: 403,
            action: Action::Update,
            resource_type: "User".to_owned(),
            field: field.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn denial_message_mentions_field_when_present() {
        assert_eq!(denial(None).to_string(), "unauthorized (403): update on User");
        assert_eq!(
            denial(Some("fixedField")).to_string(),
            "unauthorized (403): update on User field `fixedField`"
        );
    }

    #[test]
    fn status_is_exposed_only_for_denials() {
        let err: AuthorizeError = denial(None).into();
        assert_eq!(err.status(), Some(403));
        assert!(err.is_denied());

        let err: AuthorizeError = StoreError::Unavailable.into();
        assert_eq!(err.status(), None);
        assert!(err.as_denial().is_none());
    }

    #[test]
    fn unknown_backend_lists_known_names() {
        let err = ConfigError::UnknownBackend {
            name: "opa".to_owned(),
            known: vec!["ability".to_owned(), "role_acl".to_owned()],
        };
        assert_eq!(
            err.to_string(),
            "unknown policy backend `opa` (known: ability, role_acl)"
        );
    }
}
