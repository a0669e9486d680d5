//! Per-session AWS credential context
//!
//! Credentials arrive via the dashboard form and live in an encrypted
//! (private) cookie for the lifetime of the browser session. Every cloud-API
//! call receives this context explicitly; nothing is held in process-global
//! state, and `POST /logout` drops the cookie.

use serde::{Deserialize, Serialize};

/// Cookie name for the encrypted credential session
pub const SESSION_COOKIE_NAME: &str = "ec2_dashboard_session";

/// AWS credentials scoped to one browser session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSession {
    /// AWS access key ID
    pub access_key: String,
    /// AWS secret access key
    pub secret_key: String,
    /// AWS region, e.g. `ap-northeast-2`
    pub region: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_serialize_deserialize() {
        let session = CredentialSession {
            access_key: "AKIAEXAMPLE".to_string(),
            secret_key: "secret".to_string(),
            region: "ap-northeast-2".to_string(),
        };

        let json = serde_json::to_string(&session).unwrap();
        let deserialized: CredentialSession = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.access_key, "AKIAEXAMPLE");
        assert_eq!(deserialized.secret_key, "secret");
        assert_eq!(deserialized.region, "ap-northeast-2");
    }

    #[test]
    fn test_session_rejects_missing_fields() {
        let result: Result<CredentialSession, _> =
            serde_json::from_str(r#"{"access_key":"AKIAEXAMPLE"}"#);
        assert!(result.is_err());
    }
}
