use serde::{Deserialize, Deserializer, Serialize};

/// Field keys, one table per target format.
///
/// Both tables carry the same strings today. They are declared separately so
/// either format can be renamed on its own.
pub mod keys {
    pub mod external {
        pub const VPC_ID: &str = "bk_vpc_id";
        pub const VPC_NAME: &str = "bk_vpc_name";
        pub const INSTANCE_ID: &str = "bk_instance_id";
        pub const INSTANCE_NAME: &str = "bk_instance_name";
        pub const PRIVATE_IP: &str = "bk_host_innerip";
        pub const PUBLIC_IP: &str = "bk_host_outerip";
        pub const INSTANCE_STATE: &str = "bk_instance_state";
    }

    pub mod persistence {
        pub const VPC_ID: &str = "bk_vpc_id";
        pub const VPC_NAME: &str = "bk_vpc_name";
        pub const INSTANCE_ID: &str = "bk_instance_id";
        pub const INSTANCE_NAME: &str = "bk_instance_name";
        pub const PRIVATE_IP: &str = "bk_host_innerip";
        pub const PUBLIC_IP: &str = "bk_host_outerip";
        pub const INSTANCE_STATE: &str = "bk_instance_state";
    }
}

/// `null` reads as an empty string, like a missing key.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A provider virtual network.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Vpc {
    #[serde(rename = "bk_vpc_id", deserialize_with = "null_as_empty")]
    pub vpc_id: String,
    #[serde(rename = "bk_vpc_name", deserialize_with = "null_as_empty")]
    pub vpc_name: String,
}

/// A provider compute instance. `vpc_id` refers to [`Vpc::vpc_id`].
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Instance {
    #[serde(rename = "bk_instance_id", deserialize_with = "null_as_empty")]
    pub instance_id: String,
    #[serde(rename = "bk_instance_name", deserialize_with = "null_as_empty")]
    pub instance_name: String,
    #[serde(rename = "bk_host_innerip", deserialize_with = "null_as_empty")]
    pub private_ip: String,
    #[serde(rename = "bk_host_outerip", deserialize_with = "null_as_empty")]
    pub public_ip: String,
    #[serde(rename = "bk_instance_state", deserialize_with = "null_as_empty")]
    pub instance_state: String,
    #[serde(rename = "bk_vpc_id", deserialize_with = "null_as_empty")]
    pub vpc_id: String,
}

impl Instance {
    pub fn belongs_to(&self, vpc: &Vpc) -> bool {
        self.vpc_id == vpc.vpc_id
    }
}

/// Content of a records file.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Records {
    pub vpcs: Vec<Vpc>,
    pub instances: Vec<Instance>,
}

impl Records {
    pub fn vpc_of(&self, instance: &Instance) -> Option<&Vpc> {
        self.vpcs.iter().find(|v| instance.belongs_to(v))
    }
}
