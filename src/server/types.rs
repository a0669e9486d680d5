//! Request and response types for API endpoints

use aws_sdk_ec2::types::Instance;
use serde::{Deserialize, Serialize};

use crate::ec2::Ec2Client;
use crate::policy::CheckKind;

/// Credential form submitted from the dashboard
#[derive(Debug, Deserialize)]
pub struct CredentialForm {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

/// Response wrapper for list endpoints
#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Boolean outcome of the metadata-mutation endpoint
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Health response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Version info response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub commit: String,
    pub build_date: String,
}

/// One policy verdict merged into an instance row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub check: CheckKind,
    pub flagged: bool,
    pub reasons: Vec<String>,
}

/// View model for one instance row in the dashboard table
#[derive(Debug, Serialize)]
pub struct InstanceRow {
    pub id: String,
    pub name: String,
    pub state: String,
    #[serde(rename = "type")]
    pub instance_type: String,
    pub public_ip: Option<String>,
    pub checks: Vec<CheckResult>,
}

/// Map the metadata-mutation result onto the response body. Failures
/// degrade to `success: false`; no error detail leaves the handler.
pub fn mutation_outcome(result: &anyhow::Result<()>) -> SuccessResponse {
    SuccessResponse {
        success: result.is_ok(),
    }
}

/// Merge collected instance fields with policy verdicts into a row
pub fn build_row(instance: &Instance, checks: Vec<CheckResult>) -> InstanceRow {
    InstanceRow {
        id: instance.instance_id().unwrap_or_default().to_string(),
        name: Ec2Client::name_tag(instance.tags()),
        state: instance
            .state()
            .and_then(|s| s.name())
            .map(|n| n.as_str().to_string())
            .unwrap_or_default(),
        instance_type: instance
            .instance_type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
        public_ip: instance.public_ip_address().map(str::to_string),
        checks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::types::{InstanceState, InstanceStateName, Tag};

    fn instance(id: &str, name: Option<&str>, public_ip: Option<&str>) -> Instance {
        let mut builder = Instance::builder()
            .instance_id(id)
            .instance_type(aws_sdk_ec2::types::InstanceType::T3Micro)
            .state(
                InstanceState::builder()
                    .name(InstanceStateName::Running)
                    .build(),
            );
        if let Some(name) = name {
            builder = builder.tags(Tag::builder().key("Name").value(name).build());
        }
        if let Some(ip) = public_ip {
            builder = builder.public_ip_address(ip);
        }
        builder.build()
    }

    fn verdict(check: CheckKind, flagged: bool, reasons: Vec<&str>) -> CheckResult {
        CheckResult {
            check,
            flagged,
            reasons: reasons.into_iter().map(str::to_string).collect(),
        }
    }

    #[test]
    fn test_row_fields() {
        let row = build_row(
            &instance("i-1", Some("web-1"), Some("203.0.113.7")),
            vec![verdict(CheckKind::Imdsv1, true, vec![])],
        );

        assert_eq!(row.id, "i-1");
        assert_eq!(row.name, "web-1");
        assert_eq!(row.state, "running");
        assert_eq!(row.instance_type, "t3.micro");
        assert_eq!(row.public_ip.as_deref(), Some("203.0.113.7"));
        assert!(row.checks[0].flagged);
    }

    #[test]
    fn test_row_without_name_tag_has_empty_name() {
        let row = build_row(&instance("i-2", None, None), vec![]);
        assert_eq!(row.name, "");
        assert_eq!(row.public_ip, None);
    }

    #[test]
    fn test_rows_match_mocked_verdicts() {
        // Two instances, one flagged and one clean, mirror the verdicts
        // the policy engine handed back
        let flagged_row = build_row(
            &instance("i-flagged", Some("legacy"), None),
            vec![verdict(
                CheckKind::SecurityGroups,
                true,
                vec!["rule-A", "rule-B"],
            )],
        );
        let clean_row = build_row(
            &instance("i-clean", Some("hardened"), None),
            vec![verdict(CheckKind::SecurityGroups, false, vec![])],
        );

        assert!(flagged_row.checks[0].flagged);
        assert_eq!(flagged_row.checks[0].reasons, vec!["rule-A", "rule-B"]);
        assert!(!clean_row.checks[0].flagged);
        assert!(clean_row.checks[0].reasons.is_empty());
    }

    #[test]
    fn test_mutation_outcome_maps_failure_to_success_false() {
        let failed: anyhow::Result<()> = Err(anyhow::anyhow!("UnauthorizedOperation"));
        let body = serde_json::to_value(mutation_outcome(&failed)).unwrap();
        assert_eq!(body, serde_json::json!({ "success": false }));
    }

    #[test]
    fn test_mutation_outcome_maps_ok_to_success_true() {
        let body = serde_json::to_value(mutation_outcome(&Ok(()))).unwrap();
        assert_eq!(body, serde_json::json!({ "success": true }));
    }

    #[test]
    fn test_row_serializes_type_field() {
        let row = build_row(&instance("i-1", None, None), vec![]);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["type"], "t3.micro");
        assert_eq!(json["id"], "i-1");
    }
}
