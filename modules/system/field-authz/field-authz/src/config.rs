//! Configuration for the field `AuthZ` engine.

use field_authz_sdk::AuthorizeOptions;
use serde::Deserialize;
use serde_json::Value;

/// Engine configuration for one entity type.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldAuthzConfig {
    /// Registry identifier of the policy backend.
    pub backend: String,
    /// Options shared by every query.
    pub options: AuthorizeOptions,
    /// Raw backend configuration, handed to the backend factory.
    pub backend_config: Value,
}

impl Default for FieldAuthzConfig {
    fn default() -> Self {
        Self {
            backend: "role_acl".to_owned(),
            options: AuthorizeOptions::default(),
            backend_config: Value::Null,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: FieldAuthzConfig = serde_saphyr::from_str("{}").unwrap();
        assert_eq!(config.backend, "role_acl");
        assert_eq!(config.options.default_role, "anonymous");
        assert!(config.backend_config.is_null());
    }

    #[test]
    fn backend_config_is_kept_raw() {
        let yaml = r"
backend: ability
options:
  unauthorized_error_code: 404
  ignore_fields: [updated_at]
backend_config:
  common:
    - action: read
      subject: User
";
        let config: FieldAuthzConfig = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(config.backend, "ability");
        assert_eq!(config.options.unauthorized_error_code, 404);
        assert_eq!(config.options.ignore_fields, vec!["updated_at"]);
        assert_eq!(
            config.backend_config["common"][0]["subject"],
            Value::String("User".to_owned())
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: Result<FieldAuthzConfig, _> = serde_saphyr::from_str("vendor: x\n");
        assert!(parsed.is_err());
    }
}
