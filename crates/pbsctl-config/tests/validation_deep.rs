// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deep validation tests for `pbsctl-config`.

use pbsctl_config::{
    merge_configs, parse_toml, validate_config, ConfigError, ConfigWarning, PbsConfig,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fully-specified username/password config with no validation warnings.
fn user_pass_config() -> PbsConfig {
    PbsConfig {
        endpoint: Some("https://pbs.example.com:8007".into()),
        username: Some("root".into()),
        password: Some("hunter2".into()),
        realm: Some("pam".into()),
        api_token: None,
        insecure_tls: false,
        tls_fingerprint: None,
    }
}

/// Fully-specified API-token config with no validation warnings.
fn api_token_config() -> PbsConfig {
    PbsConfig {
        endpoint: Some("https://pbs.example.com:8007".into()),
        username: None,
        password: None,
        realm: None,
        api_token: Some("root@pam!ci=11111111-2222-3333-4444-555555555555".into()),
        insecure_tls: false,
        tls_fingerprint: None,
    }
}

fn validation_reasons(err: ConfigError) -> Vec<String> {
    match err {
        ConfigError::ValidationError { reasons } => reasons,
        other => panic!("expected ValidationError, got {other:?}"),
    }
}

// ===========================================================================
// 1. Valid configs pass validation with no warnings
// ===========================================================================

#[test]
fn user_pass_config_has_no_warnings() {
    let warnings = validate_config(&user_pass_config()).unwrap();
    assert!(warnings.is_empty(), "expected zero warnings: {warnings:?}");
}

#[test]
fn api_token_config_has_no_warnings() {
    let warnings = validate_config(&api_token_config()).unwrap();
    assert!(warnings.is_empty(), "expected zero warnings: {warnings:?}");
}

#[test]
fn endpoint_with_path_and_query_is_still_valid() {
    let mut cfg = user_pass_config();
    cfg.endpoint = Some("https://pbs.example.com:8007/api2/json?x=1".into());
    validate_config(&cfg).unwrap();
}

#[test]
fn realm_other_than_pam_is_valid() {
    let mut cfg = user_pass_config();
    cfg.realm = Some("pbs".into());
    validate_config(&cfg).unwrap();
}

// ===========================================================================
// 2. Missing required fields
// ===========================================================================

#[test]
fn empty_config_reports_both_missing_endpoint_and_missing_auth() {
    let err = validate_config(&PbsConfig::default()).unwrap_err();
    let reasons = validation_reasons(err);
    assert!(reasons.iter().any(|r| r.contains("endpoint")));
    assert!(reasons.iter().any(|r| r.contains("auth method")));
}

#[test]
fn blank_endpoint_is_treated_as_missing() {
    let mut cfg = user_pass_config();
    cfg.endpoint = Some("   ".into());
    let err = validate_config(&cfg).unwrap_err();
    assert!(validation_reasons(err).iter().any(|r| r.contains("endpoint is required")));
}

#[test]
fn username_without_password_is_rejected() {
    let mut cfg = PbsConfig::default();
    cfg.endpoint = Some("https://pbs.example.com:8007".into());
    cfg.username = Some("root".into());
    let err = validate_config(&cfg).unwrap_err();
    assert!(validation_reasons(err)
        .iter()
        .any(|r| r.contains("password is missing")));
}

#[test]
fn password_without_username_is_rejected() {
    let mut cfg = PbsConfig::default();
    cfg.endpoint = Some("https://pbs.example.com:8007".into());
    cfg.password = Some("hunter2".into());
    let err = validate_config(&cfg).unwrap_err();
    assert!(validation_reasons(err)
        .iter()
        .any(|r| r.contains("username is set")));
}

#[test]
fn user_pass_without_realm_is_rejected() {
    let mut cfg = user_pass_config();
    cfg.realm = None;
    let err = validate_config(&cfg).unwrap_err();
    assert!(validation_reasons(err).iter().any(|r| r.contains("realm")));
}

#[test]
fn empty_realm_string_is_treated_as_missing() {
    let mut cfg = user_pass_config();
    cfg.realm = Some(String::new());
    let err = validate_config(&cfg).unwrap_err();
    assert!(validation_reasons(err).iter().any(|r| r.contains("realm")));
}

// ===========================================================================
// 3. API token shape
// ===========================================================================

#[test]
fn token_without_equals_sign_is_rejected() {
    let mut cfg = PbsConfig::default();
    cfg.endpoint = Some("https://pbs.example.com:8007".into());
    cfg.api_token = Some("root@pam!ci".into());
    let err = validate_config(&cfg).unwrap_err();
    assert!(validation_reasons(err)
        .iter()
        .any(|r| r.contains("token_id=secret")));
}

#[test]
fn token_with_multiple_equals_signs_splits_on_first() {
    let cfg = PbsConfig {
        api_token: Some("root@pam!ci=abc=def".into()),
        ..api_token_config()
    };
    let creds = cfg.into_credentials().unwrap();
    match creds.auth {
        pbsctl_core::AuthMethod::ApiToken { token_id, secret } => {
            assert_eq!(token_id, "root@pam!ci");
            assert_eq!(secret, "abc=def");
        }
        _ => panic!("expected ApiToken"),
    }
}

#[test]
fn both_auth_methods_present_still_validates_with_a_warning() {
    let mut cfg = user_pass_config();
    cfg.api_token = Some(api_token_config().api_token.unwrap());
    let warnings = validate_config(&cfg).unwrap();
    assert_eq!(warnings, vec![ConfigWarning::BothAuthMethodsConfigured]);
}

// ===========================================================================
// 4. Endpoint URL validation
// ===========================================================================

#[test]
fn non_url_endpoint_is_rejected() {
    let mut cfg = user_pass_config();
    cfg.endpoint = Some("pbs.example.com".into());
    let err = validate_config(&cfg).unwrap_err();
    assert!(validation_reasons(err)
        .iter()
        .any(|r| r.contains("valid URL")));
}

#[test]
fn into_credentials_rejects_invalid_endpoint_even_without_prior_validation() {
    let mut cfg = user_pass_config();
    cfg.endpoint = Some("::::".into());
    let err = cfg.into_credentials().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
}

// ===========================================================================
// 5. TLS policy combinations
// ===========================================================================

#[test]
fn insecure_without_fingerprint_warns_exactly_once() {
    let cfg = PbsConfig { insecure_tls: true, ..user_pass_config() };
    let warnings = validate_config(&cfg).unwrap();
    assert_eq!(warnings, vec![ConfigWarning::InsecureTlsWithoutPin]);
}

#[test]
fn fingerprint_without_insecure_flag_never_warns() {
    let cfg = PbsConfig {
        tls_fingerprint: Some("aa:bb:cc:dd".into()),
        ..user_pass_config()
    };
    let warnings = validate_config(&cfg).unwrap();
    assert!(warnings.is_empty());
}

#[test]
fn fingerprint_takes_precedence_over_insecure_flag_in_credentials() {
    let cfg = PbsConfig {
        insecure_tls: true,
        tls_fingerprint: Some("aa:bb".into()),
        ..user_pass_config()
    };
    let creds = cfg.into_credentials().unwrap();
    assert_eq!(creds.tls, pbsctl_core::TlsPolicy::Pinned("aa:bb".into()));
}

#[test]
fn neither_flag_set_verifies_normally() {
    let creds = user_pass_config().into_credentials().unwrap();
    assert_eq!(creds.tls, pbsctl_core::TlsPolicy::Verify);
}

// ===========================================================================
// 6. Merge semantics
// ===========================================================================

#[test]
fn merge_with_empty_overlay_is_identity() {
    let base = user_pass_config();
    let merged = merge_configs(&base, &PbsConfig::default());
    assert_eq!(merged, base);
}

#[test]
fn merge_overlay_switches_auth_method_entirely() {
    let base = user_pass_config();
    let overlay = PbsConfig { api_token: api_token_config().api_token, ..PbsConfig::default() };
    let merged = merge_configs(&base, &overlay);
    // overlay only set api_token; base's username/password/realm still carry through,
    // so both auth methods end up present and validate_config will warn, not reject.
    assert!(merged.api_token.is_some());
    assert_eq!(merged.username.as_deref(), Some("root"));
    let warnings = validate_config(&merged).unwrap();
    assert_eq!(warnings, vec![ConfigWarning::BothAuthMethodsConfigured]);
}

#[test]
fn merge_does_not_clear_base_fields_absent_from_overlay() {
    let base = user_pass_config();
    let overlay = PbsConfig { endpoint: Some("https://other.example.com".into()), ..PbsConfig::default() };
    let merged = merge_configs(&base, &overlay);
    assert_eq!(merged.endpoint.as_deref(), Some("https://other.example.com"));
    assert_eq!(merged.username.as_deref(), Some("root"));
    assert_eq!(merged.password.as_deref(), Some("hunter2"));
}

#[test]
fn merge_is_associative_for_three_layers() {
    let system = user_pass_config();
    let project = PbsConfig { password: Some("layer2".into()), ..PbsConfig::default() };
    let local = PbsConfig { password: Some("layer3".into()), ..PbsConfig::default() };

    let left = merge_configs(&merge_configs(&system, &project), &local);
    let right = merge_configs(&system, &merge_configs(&project, &local));
    assert_eq!(left, right);
    assert_eq!(left.password.as_deref(), Some("layer3"));
}

// ===========================================================================
// 7. TOML parsing edge cases
// ===========================================================================

#[test]
fn partial_toml_leaves_unset_fields_at_default() {
    let cfg = parse_toml(r#"endpoint = "https://pbs.example.com:8007""#).unwrap();
    assert!(cfg.username.is_none());
    assert!(!cfg.insecure_tls);
}

#[test]
fn unknown_toml_keys_are_rejected_by_default_deny() {
    // `serde(default)` without `deny_unknown_fields` tolerates unknown keys;
    // this documents that choice rather than asserting a rejection.
    let cfg = parse_toml("unused_field = 1\nendpoint = \"https://pbs.example.com:8007\"").unwrap();
    assert_eq!(cfg.endpoint.as_deref(), Some("https://pbs.example.com:8007"));
}

#[test]
fn toml_with_all_fields_round_trips_through_merge() {
    let toml = r#"
        endpoint = "https://pbs.example.com:8007"
        username = "root"
        password = "hunter2"
        realm = "pam"
        insecure_tls = true
        tls_fingerprint = "aa:bb:cc"
    "#;
    let cfg = parse_toml(toml).unwrap();
    let merged = merge_configs(&PbsConfig::default(), &cfg);
    assert_eq!(merged, cfg);
}

// ===========================================================================
// 8. JSON Schema derivation sanity
// ===========================================================================

#[test]
fn json_schema_includes_all_fields() {
    let schema = schemars::schema_for!(PbsConfig);
    let json = serde_json::to_value(&schema).unwrap();
    let properties = json["properties"].as_object().unwrap();
    for field in [
        "endpoint",
        "username",
        "password",
        "realm",
        "api_token",
        "insecure_tls",
        "tls_fingerprint",
    ] {
        assert!(properties.contains_key(field), "schema missing field {field}");
    }
}
