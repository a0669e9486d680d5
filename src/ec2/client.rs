use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_ec2::config::Credentials;
use aws_sdk_ec2::types::{HttpTokensState, Instance, InstanceMetadataEndpointState, Tag};
use aws_sdk_ec2::Client;
use tracing::{debug, info};

use crate::session::CredentialSession;

const TAG_NAME: &str = "Name";

/// EC2 client bound to one session's credential context. Built per request;
/// nothing AWS-related survives the request that created it.
pub struct Ec2Client {
    client: Client,
    region: String,
}

impl Ec2Client {
    pub async fn from_credentials(session: &CredentialSession) -> Self {
        debug!(region = %session.region, "Initializing AWS SDK configuration from session credentials");

        let credentials = Credentials::new(
            session.access_key.clone(),
            session.secret_key.clone(),
            None,
            None,
            "dashboard-session",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(session.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        Self {
            client: Client::new(&config),
            region: session.region.clone(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Enumerate all instances visible to the session credentials
    pub async fn list_instances(&self) -> Result<Vec<Instance>> {
        let mut instances = Vec::new();
        let mut pages = self.client.describe_instances().into_paginator().send();

        while let Some(page) = pages.next().await {
            let page = page.context("Failed to describe instances")?;
            for reservation in page.reservations() {
                instances.extend(reservation.instances().iter().cloned());
            }
        }

        debug!(
            instance_count = instances.len(),
            region = %self.region,
            "Enumerated instances"
        );

        Ok(instances)
    }

    /// Fetch the describe-instance data for a single instance
    pub async fn describe_instance(&self, instance_id: &str) -> Result<Instance> {
        let response = self
            .client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .context(format!("Failed to describe instance {}", instance_id))?;

        let instance = response
            .reservations()
            .iter()
            .flat_map(|reservation| reservation.instances())
            .next()
            .cloned()
            .with_context(|| format!("Instance {} not found", instance_id))?;

        Ok(instance)
    }

    /// Require IMDSv2 session tokens and keep the metadata endpoint enabled
    pub async fn enable_imdsv2(&self, instance_id: &str) -> Result<()> {
        info!(
            instance_id = %instance_id,
            region = %self.region,
            api_action = "ModifyInstanceMetadataOptions",
            "Enforcing IMDSv2 on instance"
        );

        self.client
            .modify_instance_metadata_options()
            .instance_id(instance_id)
            .http_tokens(HttpTokensState::Required)
            .http_endpoint(InstanceMetadataEndpointState::Enabled)
            .send()
            .await
            .context(format!(
                "Failed to modify metadata options for instance {}",
                instance_id
            ))?;

        Ok(())
    }

    /// Resolve the display name from the `Name` tag; instances without one
    /// get an empty name
    pub fn name_tag(tags: &[Tag]) -> String {
        tags.iter()
            .find(|tag| tag.key() == Some(TAG_NAME))
            .and_then(|tag| tag.value())
            .unwrap_or("")
            .to_string()
    }
}
