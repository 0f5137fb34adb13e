// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loads [`pbsctl_core::Credentials`] from a TOML file overlaid by `PBS_*`
//! environment variables, validating the result and surfacing soft issues
//! (e.g. disabled TLS verification) as [`ConfigWarning`]s rather than hard
//! errors.
//!
//! Layering follows the same two-step shape as the config crate this one
//! replaces: [`load_config`] reads the optional file into a [`PbsConfig`],
//! then [`apply_env_overrides`] lets environment variables win
//! field-by-field. [`validate_config`] checks the merged result is enough
//! to build a [`pbsctl_core::Credentials`]; [`merge_configs`] combines two
//! layers directly for callers that manage their own file/override split
//! (e.g. a system config under an XDG path overridden by a project-local
//! one).

#![deny(unsafe_code)]
#![warn(missing_docs)]

use pbsctl_core::{AuthMethod, Credentials, TlsPolicy};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Errors loading, parsing, or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The given config file path does not exist.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// The path that was looked up.
        path: String,
    },
    /// The config file's contents are not valid TOML, or don't match the
    /// expected shape.
    #[error("failed to parse config file: {reason}")]
    ParseError {
        /// The underlying parser error message.
        reason: String,
    },
    /// The endpoint string is not a valid URL.
    #[error("invalid endpoint url: {reason}")]
    InvalidEndpoint {
        /// The underlying URL parser error message.
        reason: String,
    },
    /// The merged configuration is missing required fields or combines
    /// fields that can't coexist.
    #[error("config validation failed: {}", reasons.join("; "))]
    ValidationError {
        /// One message per violated rule.
        reasons: Vec<String>,
    },
}

/// Non-fatal issues surfaced by [`validate_config`] alongside a config that
/// is otherwise usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// `insecure_tls` is set and no `tls_fingerprint` pin is configured, so
    /// the connection has no certificate trust anchor at all.
    InsecureTlsWithoutPin,
    /// Both a username/password pair and an API token are configured; the
    /// token takes precedence per [`PbsConfig::into_credentials`].
    BothAuthMethodsConfigured,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsecureTlsWithoutPin => write!(
                f,
                "TLS verification is disabled and no certificate fingerprint is pinned"
            ),
            Self::BothAuthMethodsConfigured => write!(
                f,
                "both password and API token auth are configured; the API token will be used"
            ),
        }
    }
}

/// Raw configuration shape, deserialized from an optional TOML file and
/// then overlaid with `PBS_*` environment variables. Every field is
/// optional at this layer; [`PbsConfig::into_credentials`] is where absence
/// becomes a hard error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct PbsConfig {
    /// Base URL of the PBS API, e.g. `https://pbs.example.com:8007`.
    pub endpoint: Option<String>,
    /// Account name for username/password auth, without the `@realm` suffix.
    pub username: Option<String>,
    /// Password for username/password auth.
    pub password: Option<String>,
    /// PAM/PBS realm, e.g. `"pam"` or `"pbs"`.
    pub realm: Option<String>,
    /// Combined API token as PBS formats it on the wire: `token_id=secret`,
    /// e.g. `root@pam!ci=11111111-2222-3333-4444-555555555555`.
    pub api_token: Option<String>,
    /// Skip TLS certificate verification entirely.
    pub insecure_tls: bool,
    /// SHA-256 DER fingerprint of a single certificate to pin, bypassing
    /// normal CA verification.
    pub tls_fingerprint: Option<String>,
}

/// Parses a [`PbsConfig`] from TOML text.
pub fn parse_toml(content: &str) -> Result<PbsConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError { reason: e.to_string() })
}

/// Loads configuration from an optional file, then applies environment
/// overrides. `path = None` skips the file entirely and starts from
/// defaults, which is a supported mode: a purely environment-driven
/// deployment never needs a file on disk.
pub fn load_config(path: Option<&Path>) -> Result<PbsConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => PbsConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Overlays `PBS_*` environment variables onto `config`, field by field.
/// A set environment variable always wins over the file value.
pub fn apply_env_overrides(config: &mut PbsConfig) {
    if let Ok(v) = std::env::var("PBS_ENDPOINT") {
        config.endpoint = Some(v);
    }
    if let Ok(v) = std::env::var("PBS_USERNAME") {
        config.username = Some(v);
    }
    if let Ok(v) = std::env::var("PBS_PASSWORD") {
        config.password = Some(v);
    }
    if let Ok(v) = std::env::var("PBS_REALM") {
        config.realm = Some(v);
    }
    if let Ok(v) = std::env::var("PBS_API_TOKEN") {
        config.api_token = Some(v);
    }
    if let Ok(v) = std::env::var("PBS_INSECURE_TLS") {
        config.insecure_tls = matches!(v.as_str(), "1" | "true" | "yes");
    }
    if let Ok(v) = std::env::var("PBS_TLS_FINGERPRINT") {
        config.tls_fingerprint = Some(v);
    }
}

/// Combines two layers of configuration: every `Some`/non-default field in
/// `overlay` wins over `base`, field by field. Useful for callers layering
/// e.g. a system-wide file under a project-local one without going through
/// the environment at all.
pub fn merge_configs(base: &PbsConfig, overlay: &PbsConfig) -> PbsConfig {
    PbsConfig {
        endpoint: overlay.endpoint.clone().or_else(|| base.endpoint.clone()),
        username: overlay.username.clone().or_else(|| base.username.clone()),
        password: overlay.password.clone().or_else(|| base.password.clone()),
        realm: overlay.realm.clone().or_else(|| base.realm.clone()),
        api_token: overlay.api_token.clone().or_else(|| base.api_token.clone()),
        insecure_tls: overlay.insecure_tls || base.insecure_tls,
        tls_fingerprint: overlay
            .tls_fingerprint
            .clone()
            .or_else(|| base.tls_fingerprint.clone()),
    }
}

/// Validates that `config` carries enough information to build
/// [`Credentials`], returning soft-issue warnings that don't block use.
pub fn validate_config(config: &PbsConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut reasons = Vec::new();

    if config
        .endpoint
        .as_deref()
        .is_none_or(|s| s.trim().is_empty())
    {
        reasons.push("endpoint is required (set PBS_ENDPOINT or the config file's endpoint)".to_string());
    } else if let Some(endpoint) = config.endpoint.as_deref() {
        if Url::parse(endpoint).is_err() {
            reasons.push(format!("endpoint is not a valid URL: {endpoint}"));
        }
    }

    let has_user_pass = config.username.is_some() && config.password.is_some();
    let has_token = config.api_token.as_deref().is_some_and(|t| t.contains('='));

    if !has_user_pass && !has_token {
        reasons.push(
            "no usable auth method: set username+password+realm, or api_token as token_id=secret"
                .to_string(),
        );
    }
    if config.username.is_some() && config.password.is_none() {
        reasons.push("username is set but password is missing".to_string());
    }
    if config.password.is_some() && config.username.is_none() {
        reasons.push("password is set but username is missing".to_string());
    }
    if has_user_pass && config.realm.as_deref().is_none_or(str::is_empty) {
        reasons.push("realm is required alongside username/password".to_string());
    }
    if config.api_token.as_deref().is_some_and(|t| !t.contains('=')) {
        reasons.push("api_token must be formatted as token_id=secret".to_string());
    }

    if !reasons.is_empty() {
        return Err(ConfigError::ValidationError { reasons });
    }

    let mut warnings = Vec::new();
    if config.insecure_tls && config.tls_fingerprint.is_none() {
        warnings.push(ConfigWarning::InsecureTlsWithoutPin);
    }
    if has_user_pass && has_token {
        warnings.push(ConfigWarning::BothAuthMethodsConfigured);
    }
    Ok(warnings)
}

impl PbsConfig {
    /// Converts a validated configuration into connection [`Credentials`].
    /// Callers should run [`validate_config`] first; this still re-derives
    /// the same checks so it never panics on a config built by hand.
    ///
    /// API token auth takes precedence over username/password when both are
    /// configured, per [`ConfigWarning::BothAuthMethodsConfigured`].
    pub fn into_credentials(self) -> Result<Credentials, ConfigError> {
        let endpoint_str = self.endpoint.ok_or_else(|| ConfigError::ValidationError {
            reasons: vec!["endpoint is required".to_string()],
        })?;
        let endpoint = Url::parse(&endpoint_str)
            .map_err(|e| ConfigError::InvalidEndpoint { reason: e.to_string() })?;

        let auth = if let Some(token) = self.api_token.as_deref().filter(|t| t.contains('=')) {
            let (token_id, secret) = token.split_once('=').expect("checked above");
            AuthMethod::ApiToken {
                token_id: token_id.to_string(),
                secret: secret.to_string(),
            }
        } else {
            let username = self.username.ok_or_else(|| ConfigError::ValidationError {
                reasons: vec!["username is required without an api_token".to_string()],
            })?;
            let password = self.password.ok_or_else(|| ConfigError::ValidationError {
                reasons: vec!["password is required without an api_token".to_string()],
            })?;
            let realm = self.realm.ok_or_else(|| ConfigError::ValidationError {
                reasons: vec!["realm is required without an api_token".to_string()],
            })?;
            AuthMethod::UserPass { username, password, realm }
        };

        let tls = if let Some(fingerprint) = self.tls_fingerprint {
            TlsPolicy::Pinned(fingerprint)
        } else if self.insecure_tls {
            TlsPolicy::Insecure
        } else {
            TlsPolicy::Verify
        };

        Ok(Credentials::new(endpoint, auth, tls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_pass_config() -> PbsConfig {
        PbsConfig {
            endpoint: Some("https://pbs.example.com:8007".to_string()),
            username: Some("root".to_string()),
            password: Some("hunter2".to_string()),
            realm: Some("pam".to_string()),
            api_token: None,
            insecure_tls: false,
            tls_fingerprint: None,
        }
    }

    #[test]
    fn default_config_fails_validation() {
        let config = PbsConfig::default();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn user_pass_config_validates_with_no_warnings() {
        let config = user_pass_config();
        let warnings = validate_config(&config).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn parse_valid_toml_string() {
        let toml = r#"
            endpoint = "https://pbs.example.com:8007"
            username = "root"
            password = "hunter2"
            realm = "pam"
        "#;
        let config = parse_toml(toml).unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("https://pbs.example.com:8007"));
        assert_eq!(config.realm.as_deref(), Some("pam"));
    }

    #[test]
    fn parse_invalid_toml_gives_parse_error() {
        let err = parse_toml("endpoint = [unterminated").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn validation_catches_incomplete_user_pass() {
        let mut config = user_pass_config();
        config.password = None;
        let err = validate_config(&config).unwrap_err();
        match err {
            ConfigError::ValidationError { reasons } => {
                assert!(reasons.iter().any(|r| r.contains("password")));
            }
            _ => panic!("expected ValidationError"),
        }
    }

    #[test]
    fn validation_catches_malformed_api_token() {
        let mut config = PbsConfig::default();
        config.endpoint = Some("https://pbs.example.com:8007".to_string());
        config.api_token = Some("no-equals-sign".to_string());
        let err = validate_config(&config).unwrap_err();
        match err {
            ConfigError::ValidationError { reasons } => {
                assert!(reasons.iter().any(|r| r.contains("token_id=secret")));
            }
            _ => panic!("expected ValidationError"),
        }
    }

    #[test]
    fn validation_catches_invalid_endpoint_url() {
        let mut config = user_pass_config();
        config.endpoint = Some("not a url".to_string());
        let err = validate_config(&config).unwrap_err();
        match err {
            ConfigError::ValidationError { reasons } => {
                assert!(reasons.iter().any(|r| r.contains("valid URL")));
            }
            _ => panic!("expected ValidationError"),
        }
    }

    #[test]
    fn insecure_tls_without_pin_warns() {
        let mut config = user_pass_config();
        config.insecure_tls = true;
        let warnings = validate_config(&config).unwrap();
        assert_eq!(warnings, vec![ConfigWarning::InsecureTlsWithoutPin]);
    }

    #[test]
    fn insecure_tls_with_pin_does_not_warn() {
        let mut config = user_pass_config();
        config.insecure_tls = true;
        config.tls_fingerprint = Some("aa:bb:cc".to_string());
        let warnings = validate_config(&config).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn both_auth_methods_configured_warns() {
        let mut config = user_pass_config();
        config.api_token = Some("root@pam!ci=secret".to_string());
        let warnings = validate_config(&config).unwrap();
        assert_eq!(warnings, vec![ConfigWarning::BothAuthMethodsConfigured]);
    }

    #[test]
    fn merge_overlay_overrides_base() {
        let base = user_pass_config();
        let mut overlay = PbsConfig::default();
        overlay.password = Some("different".to_string());
        let merged = merge_configs(&base, &overlay);
        assert_eq!(merged.password.as_deref(), Some("different"));
        assert_eq!(merged.username.as_deref(), Some("root"));
    }

    #[test]
    fn merge_insecure_tls_is_sticky_once_set() {
        let mut base = user_pass_config();
        base.insecure_tls = true;
        let overlay = PbsConfig::default();
        let merged = merge_configs(&base, &overlay);
        assert!(merged.insecure_tls);
    }

    #[test]
    fn into_credentials_prefers_api_token_over_user_pass() {
        let mut config = user_pass_config();
        config.api_token = Some("root@pam!ci=s3cr3t".to_string());
        let creds = config.into_credentials().unwrap();
        assert!(creds.is_api_token());
        match creds.auth {
            AuthMethod::ApiToken { token_id, secret } => {
                assert_eq!(token_id, "root@pam!ci");
                assert_eq!(secret, "s3cr3t");
            }
            _ => panic!("expected ApiToken"),
        }
    }

    #[test]
    fn into_credentials_builds_user_pass_when_no_token() {
        let config = user_pass_config();
        let creds = config.into_credentials().unwrap();
        assert!(!creds.is_api_token());
        assert_eq!(creds.endpoint.as_str(), "https://pbs.example.com:8007/");
    }

    #[test]
    fn into_credentials_maps_tls_policy() {
        let mut config = user_pass_config();
        config.tls_fingerprint = Some("aa:bb".to_string());
        let creds = config.into_credentials().unwrap();
        assert_eq!(creds.tls, TlsPolicy::Pinned("aa:bb".to_string()));

        let mut insecure = user_pass_config();
        insecure.insecure_tls = true;
        let creds = insecure.into_credentials().unwrap();
        assert_eq!(creds.tls, TlsPolicy::Insecure);
    }

    #[test]
    fn load_missing_file_gives_file_not_found() {
        let err = load_config(Some(Path::new("/nonexistent/path/pbsctl.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pbsctl.toml");
        std::fs::write(
            &path,
            r#"
                endpoint = "https://pbs.example.com:8007"
                username = "root"
                password = "hunter2"
                realm = "pam"
            "#,
        )
        .unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.username.as_deref(), Some("root"));
    }

    #[test]
    fn load_config_without_path_yields_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, PbsConfig::default());
    }

    #[test]
    fn toml_roundtrip() {
        let config = user_pass_config();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: PbsConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(config, parsed);
    }
}
