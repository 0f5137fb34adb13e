//! Connection credentials and TLS trust policy.

use std::fmt;
use url::Url;

/// Authentication method: either a PAM/PBS-realm username+password pair, or
/// a pre-issued API token. Created once per process and treated as
/// immutable; [`crate::Credentials`] owns this alongside the endpoint and
/// TLS policy.
#[derive(Clone)]
pub enum AuthMethod {
    /// Username + password + authentication realm, exchanged for a ticket
    /// by the session layer.
    UserPass {
        /// Account name, without the `@realm` suffix.
        username: String,
        /// Cleartext password; never logged or echoed.
        password: String,
        /// PAM/PBS realm, e.g. `"pam"` or `"pbs"`.
        realm: String,
    },
    /// A pre-issued API token. Short-circuits session negotiation entirely:
    /// no ticket is acquired and CSRF is not required.
    ApiToken {
        /// Token id, e.g. `"root@pam!mytoken"`.
        token_id: String,
        /// Token secret; never logged or echoed.
        secret: String,
    },
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserPass { username, realm, .. } => f
                .debug_struct("UserPass")
                .field("username", username)
                .field("realm", realm)
                .field("password", &"<redacted>")
                .finish(),
            Self::ApiToken { token_id, .. } => f
                .debug_struct("ApiToken")
                .field("token_id", token_id)
                .field("secret", &"<redacted>")
                .finish(),
        }
    }
}

/// TLS trust policy for the transport's HTTPS client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsPolicy {
    /// Standard CA-chain verification.
    Verify,
    /// Skip all certificate verification. Implied, but not required, by
    /// [`TlsPolicy::Pinned`].
    Insecure,
    /// Trust exactly one certificate, identified by its SHA-256 DER
    /// fingerprint. When set, only the pin governs trust: normal CA
    /// verification is bypassed.
    Pinned(String),
}

/// Connection credentials: endpoint, authentication method, and TLS trust
/// policy. Created once per process, immutable, consumed by the transport.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Base URL of the PBS API, e.g. `https://pbs.example.com:8007`.
    pub endpoint: Url,
    /// How to authenticate requests.
    pub auth: AuthMethod,
    /// TLS trust policy for the connection.
    pub tls: TlsPolicy,
}

impl Credentials {
    /// Construct credentials from their parts.
    pub fn new(endpoint: Url, auth: AuthMethod, tls: TlsPolicy) -> Self {
        Self { endpoint, auth, tls }
    }

    /// True if this credential set uses API-token auth, which short-circuits
    /// ticket/CSRF session negotiation entirely.
    pub fn is_api_token(&self) -> bool {
        matches!(self.auth, AuthMethod::ApiToken { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Url {
        Url::parse("https://pbs.example.com:8007").unwrap()
    }

    #[test]
    fn user_pass_debug_redacts_password() {
        let auth = AuthMethod::UserPass {
            username: "root".into(),
            password: "hunter2".into(),
            realm: "pam".into(),
        };
        let dbg = format!("{auth:?}");
        assert!(dbg.contains("root"));
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn api_token_debug_redacts_secret() {
        let auth = AuthMethod::ApiToken {
            token_id: "root@pam!ci".into(),
            secret: "topsecret".into(),
        };
        let dbg = format!("{auth:?}");
        assert!(dbg.contains("root@pam!ci"));
        assert!(!dbg.contains("topsecret"));
    }

    #[test]
    fn is_api_token_detects_method() {
        let token_creds = Credentials::new(
            endpoint(),
            AuthMethod::ApiToken {
                token_id: "x".into(),
                secret: "y".into(),
            },
            TlsPolicy::Verify,
        );
        assert!(token_creds.is_api_token());

        let pass_creds = Credentials::new(
            endpoint(),
            AuthMethod::UserPass {
                username: "root".into(),
                password: "x".into(),
                realm: "pam".into(),
            },
            TlsPolicy::Verify,
        );
        assert!(!pass_creds.is_api_token());
    }

    #[test]
    fn pinned_fingerprint_is_distinct_from_insecure() {
        assert_ne!(TlsPolicy::Insecure, TlsPolicy::Pinned("aa:bb".into()));
    }
}
