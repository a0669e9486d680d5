//! EC2 data collection
//!
//! `client` wraps the AWS SDK behind the per-session credential context;
//! `document` lowers SDK instance structs into JSON documents shaped like
//! the DescribeInstances wire format, with datetimes rendered as ISO-8601
//! strings.

pub mod client;
pub mod document;

pub use client::Ec2Client;
pub use document::{instance_document, DocValue};
