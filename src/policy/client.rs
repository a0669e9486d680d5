use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{CheckKind, PolicyError, ResultSchema, Verdict};

/// HTTP client for the OPA data API.
///
/// The base URL is injected at construction time so the client is testable
/// without process-environment mutation.
pub struct PolicyClient {
    client: reqwest::Client,
    base_url: String,
}

impl PolicyClient {
    pub fn new(base_url: &str) -> Result<Self, PolicyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run one check against one instance document.
    ///
    /// POSTs `{"input": <document>}` to `{base_url}/v1/data/{policy_path}`
    /// and reads the verdict according to the check's declared schema.
    pub async fn evaluate(&self, check: CheckKind, input: &Value) -> Result<Verdict, PolicyError> {
        let url = format!("{}/v1/data/{}", self.base_url, check.policy_path());

        debug!(
            url = %url,
            check = %check,
            "Sending policy evaluation request"
        );

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "input": input }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(PolicyError::Status { status, body });
        }

        let document: Value = response.json().await?;
        let verdict = read_verdict(check, &document)?;

        debug!(
            check = %check,
            flagged = verdict.flagged,
            reasons = verdict.reasons.len(),
            "Policy evaluation complete"
        );

        Ok(verdict)
    }
}

/// Interpret the engine's response document per the check's schema
fn read_verdict(check: CheckKind, document: &Value) -> Result<Verdict, PolicyError> {
    match check.schema() {
        ResultSchema::BoolRequired(field) => match document.get(field) {
            Some(Value::Bool(flagged)) => Ok(Verdict::flagged(*flagged)),
            Some(_) => Err(PolicyError::UnexpectedType {
                field,
                expected: "boolean",
            }),
            None => Err(PolicyError::MissingField(field)),
        },
        ResultSchema::BoolOrFalse(field) => match document.get(field) {
            Some(Value::Bool(flagged)) => Ok(Verdict::flagged(*flagged)),
            Some(_) => Err(PolicyError::UnexpectedType {
                field,
                expected: "boolean",
            }),
            None => Ok(Verdict::flagged(false)),
        },
        ResultSchema::ListOrEmpty(field) => match document.get(field) {
            Some(Value::Array(items)) => {
                let mut reasons = Vec::with_capacity(items.len());
                for item in items {
                    match item.as_str() {
                        Some(reason) => reasons.push(reason.to_string()),
                        None => {
                            return Err(PolicyError::UnexpectedType {
                                field,
                                expected: "array of strings",
                            })
                        }
                    }
                }
                Ok(Verdict::violations(reasons))
            }
            Some(_) => Err(PolicyError::UnexpectedType {
                field,
                expected: "array of strings",
            }),
            None => Ok(Verdict::violations(Vec::new())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_engine(policy_path: &str, body: Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/v1/data/{}", policy_path)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_imdsv1_flagged() {
        let server = mock_engine("ec2/match", json!({"result": true})).await;
        let client = PolicyClient::new(&server.uri()).unwrap();

        let verdict = client
            .evaluate(CheckKind::Imdsv1, &json!({"InstanceId": "i-1"}))
            .await
            .unwrap();

        assert!(verdict.flagged);
        assert!(verdict.reasons.is_empty());
    }

    #[tokio::test]
    async fn test_imdsv1_clean() {
        let server = mock_engine("ec2/match", json!({"result": false})).await;
        let client = PolicyClient::new(&server.uri()).unwrap();

        let verdict = client
            .evaluate(CheckKind::Imdsv1, &json!({"InstanceId": "i-1"}))
            .await
            .unwrap();

        assert!(!verdict.flagged);
    }

    #[tokio::test]
    async fn test_imdsv1_missing_result_is_error() {
        let server = mock_engine("ec2/match", json!({})).await;
        let client = PolicyClient::new(&server.uri()).unwrap();

        let err = client
            .evaluate(CheckKind::Imdsv1, &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, PolicyError::MissingField("result")));
    }

    #[tokio::test]
    async fn test_compliance_missing_result_defaults_to_clean() {
        let server = mock_engine("ec2/result", json!({})).await;
        let client = PolicyClient::new(&server.uri()).unwrap();

        let verdict = client
            .evaluate(CheckKind::Compliance, &json!({}))
            .await
            .unwrap();

        assert!(!verdict.flagged);
    }

    #[tokio::test]
    async fn test_compliance_true() {
        let server = mock_engine("ec2/result", json!({"result": true})).await;
        let client = PolicyClient::new(&server.uri()).unwrap();

        let verdict = client
            .evaluate(CheckKind::Compliance, &json!({}))
            .await
            .unwrap();

        assert!(verdict.flagged);
    }

    #[tokio::test]
    async fn test_security_groups_deny_list() {
        let server = mock_engine("ec2/securitygroups", json!({"deny": ["rule-A", "rule-B"]})).await;
        let client = PolicyClient::new(&server.uri()).unwrap();

        let verdict = client
            .evaluate(CheckKind::SecurityGroups, &json!({}))
            .await
            .unwrap();

        assert!(verdict.flagged);
        assert_eq!(verdict.reasons, vec!["rule-A", "rule-B"]);
    }

    #[tokio::test]
    async fn test_security_groups_empty_deny_is_clean() {
        let server = mock_engine("ec2/securitygroups", json!({"deny": []})).await;
        let client = PolicyClient::new(&server.uri()).unwrap();

        let verdict = client
            .evaluate(CheckKind::SecurityGroups, &json!({}))
            .await
            .unwrap();

        assert!(!verdict.flagged);
        assert!(verdict.reasons.is_empty());
    }

    #[tokio::test]
    async fn test_security_groups_missing_deny_is_clean() {
        let server = mock_engine("ec2/securitygroups", json!({})).await;
        let client = PolicyClient::new(&server.uri()).unwrap();

        let verdict = client
            .evaluate(CheckKind::SecurityGroups, &json!({}))
            .await
            .unwrap();

        assert!(!verdict.flagged);
    }

    #[tokio::test]
    async fn test_input_envelope_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/data/ec2/match"))
            .and(body_json(json!({"input": {"InstanceId": "i-42"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": false})))
            .expect(1)
            .mount(&server)
            .await;

        let client = PolicyClient::new(&server.uri()).unwrap();
        let verdict = client
            .evaluate(CheckKind::Imdsv1, &json!({"InstanceId": "i-42"}))
            .await
            .unwrap();

        assert!(!verdict.flagged);
    }

    #[tokio::test]
    async fn test_non_success_status_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/data/ec2/match"))
            .respond_with(ResponseTemplate::new(500).set_body_string("opa exploded"))
            .mount(&server)
            .await;

        let client = PolicyClient::new(&server.uri()).unwrap();
        let err = client
            .evaluate(CheckKind::Imdsv1, &json!({}))
            .await
            .unwrap_err();

        match err {
            PolicyError::Status { status, body } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "opa exploded");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[test]
    fn test_read_verdict_rejects_non_boolean_result() {
        let err = read_verdict(CheckKind::Imdsv1, &json!({"result": "yes"})).unwrap_err();
        assert!(matches!(
            err,
            PolicyError::UnexpectedType {
                field: "result",
                expected: "boolean"
            }
        ));
    }

    #[test]
    fn test_read_verdict_rejects_non_string_deny_entries() {
        let err =
            read_verdict(CheckKind::SecurityGroups, &json!({"deny": [1, 2]})).unwrap_err();
        assert!(matches!(
            err,
            PolicyError::UnexpectedType { field: "deny", .. }
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = PolicyClient::new("http://opa:8181/").unwrap();
        assert_eq!(client.base_url(), "http://opa:8181");
    }
}
