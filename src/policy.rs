//! Policy evaluation against an external OPA server
//!
//! One client covers all checks; each check declares its policy path and how
//! the engine's response document is read. The per-check defaults differ on
//! purpose: `imdsv1` treats a missing `result` as an error, `compliance`
//! reads it as false, and `security-groups` reads a missing `deny` list as
//! empty.

pub mod client;

pub use client::PolicyClient;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A policy check that can run against one instance document
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckKind {
    /// Flags instances still allowing IMDSv1 token-less metadata access
    Imdsv1,
    /// General instance compliance verdict
    Compliance,
    /// Security-group rule violations with per-rule reasons
    SecurityGroups,
}

impl CheckKind {
    /// OPA data path under `/v1/data/`
    pub fn policy_path(&self) -> &'static str {
        match self {
            CheckKind::Imdsv1 => "ec2/match",
            CheckKind::Compliance => "ec2/result",
            CheckKind::SecurityGroups => "ec2/securitygroups",
        }
    }

    /// How this check reads the engine's response document
    pub fn schema(&self) -> ResultSchema {
        match self {
            CheckKind::Imdsv1 => ResultSchema::BoolRequired("result"),
            CheckKind::Compliance => ResultSchema::BoolOrFalse("result"),
            CheckKind::SecurityGroups => ResultSchema::ListOrEmpty("deny"),
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckKind::Imdsv1 => write!(f, "imdsv1"),
            CheckKind::Compliance => write!(f, "compliance"),
            CheckKind::SecurityGroups => write!(f, "security-groups"),
        }
    }
}

/// Declared shape of a policy response field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSchema {
    /// Boolean field; an absent field is an evaluation error
    BoolRequired(&'static str),
    /// Boolean field; an absent field reads as false
    BoolOrFalse(&'static str),
    /// String-list field; an absent field reads as an empty list
    ListOrEmpty(&'static str),
}

/// Outcome of one policy check for one instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// Whether the instance violates the policy
    pub flagged: bool,
    /// Violation reasons (empty for boolean checks)
    pub reasons: Vec<String>,
}

impl Verdict {
    pub fn flagged(flagged: bool) -> Self {
        Self {
            flagged,
            reasons: Vec::new(),
        }
    }

    pub fn violations(reasons: Vec<String>) -> Self {
        Self {
            flagged: !reasons.is_empty(),
            reasons,
        }
    }
}

/// Errors from the policy evaluation path. These propagate to the request
/// handler unchanged; there is no retry or graceful degradation here.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("failed to reach policy engine: {0}")]
    Request(#[from] reqwest::Error),

    #[error("policy engine returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("policy response missing required field '{0}'")]
    MissingField(&'static str),

    #[error("policy response field '{field}' is not a {expected}")]
    UnexpectedType {
        field: &'static str,
        expected: &'static str,
    },
}
