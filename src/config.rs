use clap::{Parser, Subcommand};

use crate::policy::CheckKind;

// ============================================
// Environment variable name constants
// Shared between config parsing and log output
// ============================================
pub mod env {
    pub const OPA_URL: &str = "OPA_URL";
    pub const SERVER_PORT: &str = "SERVER_PORT";
    pub const HEALTH_PORT: &str = "HEALTH_PORT";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const CHECKS: &str = "CHECKS";
    pub const SESSION_SECRET: &str = "SESSION_SECRET";
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show version information
    Version,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ec2-policy-dashboard",
    version,
    about = "EC2 instance dashboard flagging policy violations via OPA",
    long_about = "A web dashboard that lists EC2 instances for per-session AWS credentials and flags instances violating metadata/security-group policies by delegating policy decisions to an external Open Policy Agent server."
)]
pub struct Config {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Base URL of the OPA policy engine (e.g. http://opa:8181)
    #[arg(long, env = env::OPA_URL)]
    pub opa_url: Option<String>,

    /// Dashboard server port
    #[arg(long, env = env::SERVER_PORT, default_value = "3000")]
    pub server_port: u16,

    /// Health check server port
    #[arg(long, env = env::HEALTH_PORT, default_value = "8080")]
    pub health_port: u16,

    /// Log format: json or pretty
    #[arg(long, env = env::LOG_FORMAT, default_value = "json")]
    pub log_format: String,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, env = env::LOG_LEVEL, default_value = "info")]
    pub log_level: String,

    /// Policy checks to run per instance, comma-separated
    #[arg(long, env = env::CHECKS, value_enum, value_delimiter = ',', default_value = "imdsv1")]
    pub checks: Vec<CheckKind>,

    /// Base64-encoded key for the encrypted session cookie
    /// (a random per-process key is generated when unset)
    #[arg(long, env = env::SESSION_SECRET)]
    pub session_secret: Option<String>,
}

impl Config {
    pub fn from_args() -> Self {
        Config::parse()
    }

    /// Validate configuration before the servers start
    pub fn validate(&self) -> Result<(), String> {
        if self.opa_url.as_ref().is_none_or(|s| s.is_empty()) {
            return Err(format!("{} is required", env::OPA_URL));
        }
        if self.checks.is_empty() {
            return Err("at least one policy check must be enabled".to_string());
        }
        Ok(())
    }

    /// Get the policy engine base URL
    pub fn get_opa_url(&self) -> &str {
        self.opa_url.as_deref().unwrap_or("")
    }
}
