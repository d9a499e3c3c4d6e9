use crate::metadata::keys::persistence as key;
use crate::metadata::{Instance, Records, Vpc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A record as written to the document store. Rows read back may carry
/// fields of any type; only string values of known keys are used.
pub type Document = BTreeMap<String, Value>;

pub trait Persist: Sized {
    fn to_document(&self) -> Document;
    fn from_document(doc: &Document) -> Self;
}

fn field(doc: &Document, key: &str) -> String {
    doc.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn document<const N: usize>(fields: [(&str, &str); N]) -> Document {
    fields.into_iter().map(|(k, v)| (k.to_string(), Value::from(v))).collect()
}

impl Persist for Vpc {
    fn to_document(&self) -> Document {
        document([(key::VPC_ID, self.vpc_id.as_str()), (key::VPC_NAME, self.vpc_name.as_str())])
    }

    fn from_document(doc: &Document) -> Self {
        Self { vpc_id: field(doc, key::VPC_ID), vpc_name: field(doc, key::VPC_NAME) }
    }
}

impl Persist for Instance {
    fn to_document(&self) -> Document {
        document([
            (key::INSTANCE_ID, self.instance_id.as_str()),
            (key::INSTANCE_NAME, self.instance_name.as_str()),
            (key::PRIVATE_IP, self.private_ip.as_str()),
            (key::PUBLIC_IP, self.public_ip.as_str()),
            (key::INSTANCE_STATE, self.instance_state.as_str()),
            (key::VPC_ID, self.vpc_id.as_str()),
        ])
    }

    fn from_document(doc: &Document) -> Self {
        Self {
            instance_id: field(doc, key::INSTANCE_ID),
            instance_name: field(doc, key::INSTANCE_NAME),
            private_ip: field(doc, key::PRIVATE_IP),
            public_ip: field(doc, key::PUBLIC_IP),
            instance_state: field(doc, key::INSTANCE_STATE),
            vpc_id: field(doc, key::VPC_ID),
        }
    }
}

/// [`Records`] in the persistence key format.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PersistedRecords {
    pub vpcs: Vec<Document>,
    pub instances: Vec<Document>,
}

impl From<&Records> for PersistedRecords {
    fn from(records: &Records) -> Self {
        Self {
            vpcs: records.vpcs.iter().map(Persist::to_document).collect(),
            instances: records.instances.iter().map(Persist::to_document).collect(),
        }
    }
}

impl From<&PersistedRecords> for Records {
    fn from(persisted: &PersistedRecords) -> Self {
        Self {
            vpcs: persisted.vpcs.iter().map(Vpc::from_document).collect(),
            instances: persisted.instances.iter().map(Instance::from_document).collect(),
        }
    }
}
