use aws_sdk_ec2::types::Instance;
use aws_smithy_types::date_time::Format;
use aws_smithy_types::DateTime;
use serde_json::{Map, Number, Value};

/// An ordered document tree in which datetime leaves stay typed until the
/// tree is lowered to JSON. Mirrors the shape of an AWS API response:
/// mappings, sequences and scalars, no cycles.
#[derive(Debug, Clone, PartialEq)]
pub enum DocValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    DateTime(DateTime),
    Array(Vec<DocValue>),
    Object(Vec<(String, DocValue)>),
}

impl DocValue {
    /// Lower the tree to JSON. Every datetime leaf becomes its ISO-8601
    /// string representation; all other values pass through unchanged.
    /// Key order and sequence order are preserved.
    pub fn into_json(self) -> Value {
        match self {
            DocValue::Null => Value::Null,
            DocValue::Bool(b) => Value::Bool(b),
            DocValue::Number(n) => Value::Number(n),
            DocValue::String(s) => Value::String(s),
            DocValue::DateTime(dt) => Value::String(format_datetime(&dt)),
            DocValue::Array(items) => {
                Value::Array(items.into_iter().map(DocValue::into_json).collect())
            }
            DocValue::Object(fields) => {
                let mut map = Map::with_capacity(fields.len());
                for (key, value) in fields {
                    map.insert(key, value.into_json());
                }
                Value::Object(map)
            }
        }
    }
}

/// RFC 3339 rendering of an SDK timestamp. Formatting fails only for
/// years outside 0001-9999, which EC2 timestamps never are; the fallback
/// emits raw epoch seconds rather than dropping the field.
pub fn format_datetime(dt: &DateTime) -> String {
    dt.fmt(Format::DateTime)
        .unwrap_or_else(|_| dt.secs().to_string())
}

/// Ordered field collector for building wire-shaped objects.
/// Absent SDK fields are omitted, matching the AWS JSON documents.
#[derive(Default)]
struct Fields(Vec<(String, DocValue)>);

impl Fields {
    fn set(&mut self, key: &str, value: DocValue) {
        self.0.push((key.to_string(), value));
    }

    fn set_str(&mut self, key: &str, value: Option<&str>) {
        if let Some(v) = value {
            self.set(key, DocValue::String(v.to_string()));
        }
    }

    fn set_i32(&mut self, key: &str, value: Option<i32>) {
        if let Some(v) = value {
            self.set(key, DocValue::Number(Number::from(v)));
        }
    }

    fn set_bool(&mut self, key: &str, value: Option<bool>) {
        if let Some(v) = value {
            self.set(key, DocValue::Bool(v));
        }
    }

    fn set_datetime(&mut self, key: &str, value: Option<&DateTime>) {
        if let Some(v) = value {
            self.set(key, DocValue::DateTime(v.clone()));
        }
    }

    fn into_doc(self) -> DocValue {
        DocValue::Object(self.0)
    }
}

/// Build the describe-instance document for one instance, with PascalCase
/// keys matching the DescribeInstances wire format
pub fn instance_document(instance: &Instance) -> DocValue {
    let mut doc = Fields::default();

    doc.set_str("InstanceId", instance.instance_id());
    doc.set_str("ImageId", instance.image_id());

    if let Some(state) = instance.state() {
        let mut fields = Fields::default();
        fields.set_i32("Code", state.code());
        fields.set_str("Name", state.name().map(|n| n.as_str()));
        doc.set("State", fields.into_doc());
    }

    doc.set_str("PrivateDnsName", instance.private_dns_name());
    doc.set_str("PublicDnsName", instance.public_dns_name());
    doc.set_str("InstanceType", instance.instance_type().map(|t| t.as_str()));
    doc.set_datetime("LaunchTime", instance.launch_time());

    if let Some(placement) = instance.placement() {
        let mut fields = Fields::default();
        fields.set_str("AvailabilityZone", placement.availability_zone());
        fields.set_str("GroupName", placement.group_name());
        fields.set_str("Tenancy", placement.tenancy().map(|t| t.as_str()));
        doc.set("Placement", fields.into_doc());
    }

    if let Some(monitoring) = instance.monitoring() {
        let mut fields = Fields::default();
        fields.set_str("State", monitoring.state().map(|s| s.as_str()));
        doc.set("Monitoring", fields.into_doc());
    }

    doc.set_str("SubnetId", instance.subnet_id());
    doc.set_str("VpcId", instance.vpc_id());
    doc.set_str("PrivateIpAddress", instance.private_ip_address());
    doc.set_str("PublicIpAddress", instance.public_ip_address());
    doc.set_str("Architecture", instance.architecture().map(|a| a.as_str()));
    doc.set_str(
        "RootDeviceType",
        instance.root_device_type().map(|t| t.as_str()),
    );
    doc.set_str("RootDeviceName", instance.root_device_name());

    let mappings: Vec<DocValue> = instance
        .block_device_mappings()
        .iter()
        .map(|mapping| {
            let mut fields = Fields::default();
            fields.set_str("DeviceName", mapping.device_name());
            if let Some(ebs) = mapping.ebs() {
                let mut ebs_fields = Fields::default();
                ebs_fields.set_datetime("AttachTime", ebs.attach_time());
                ebs_fields.set_bool("DeleteOnTermination", ebs.delete_on_termination());
                ebs_fields.set_str("Status", ebs.status().map(|s| s.as_str()));
                ebs_fields.set_str("VolumeId", ebs.volume_id());
                fields.set("Ebs", ebs_fields.into_doc());
            }
            fields.into_doc()
        })
        .collect();
    if !mappings.is_empty() {
        doc.set("BlockDeviceMappings", DocValue::Array(mappings));
    }

    let groups: Vec<DocValue> = instance
        .security_groups()
        .iter()
        .map(|group| {
            let mut fields = Fields::default();
            fields.set_str("GroupName", group.group_name());
            fields.set_str("GroupId", group.group_id());
            fields.into_doc()
        })
        .collect();
    if !groups.is_empty() {
        doc.set("SecurityGroups", DocValue::Array(groups));
    }

    let tags: Vec<DocValue> = instance
        .tags()
        .iter()
        .map(|tag| {
            let mut fields = Fields::default();
            fields.set_str("Key", tag.key());
            fields.set_str("Value", tag.value());
            fields.into_doc()
        })
        .collect();
    if !tags.is_empty() {
        doc.set("Tags", DocValue::Array(tags));
    }

    if let Some(options) = instance.metadata_options() {
        let mut fields = Fields::default();
        fields.set_str("State", options.state().map(|s| s.as_str()));
        fields.set_str("HttpTokens", options.http_tokens().map(|t| t.as_str()));
        fields.set_i32(
            "HttpPutResponseHopLimit",
            options.http_put_response_hop_limit(),
        );
        fields.set_str("HttpEndpoint", options.http_endpoint().map(|e| e.as_str()));
        doc.set("MetadataOptions", fields.into_doc());
    }

    doc.into_doc()
}
