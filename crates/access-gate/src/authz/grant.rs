//! Scoped access grant and its wire form.

use crate::authz::policy::PolicyDocument;
use serde::{Deserialize, Serialize};

/// The single virtual root every user sees.
pub const VIRTUAL_ROOT: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HomeDirectoryType {
    #[serde(rename = "LOGICAL")]
    Logical,
}

/// One virtual-to-physical path mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HomeDirectoryEntry {
    pub entry: String,
    pub target: String,
}

/// Access granted to one directory user. Built fresh per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    /// Principal the storage service assumes for the session.
    pub role: String,
    pub policy: PolicyDocument,
    pub home_directory_type: HomeDirectoryType,
    pub home_directory_details: Vec<HomeDirectoryEntry>,
}

/// Response document returned to the storage service's identity provider
/// hook. `Policy` and `HomeDirectoryDetails` are JSON-encoded strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransferAuthResponse {
    pub role: String,
    pub policy: String,
    pub home_directory_type: HomeDirectoryType,
    pub home_directory_details: String,
}

impl AccessGrant {
    /// Grant `role` access to `partition` of `bucket`, mounted at `/`.
    pub fn for_partition(role: &str, bucket: &str, partition: &str) -> Self {
        Self {
            role: role.to_string(),
            policy: PolicyDocument::for_partition(bucket, partition),
            home_directory_type: HomeDirectoryType::Logical,
            home_directory_details: vec![HomeDirectoryEntry {
                entry: VIRTUAL_ROOT.to_string(),
                target: format!("/{bucket}/{partition}"),
            }],
        }
    }

    /// Physical location mounted at the virtual root.
    pub fn physical_target(&self) -> Option<&str> {
        self.home_directory_details
            .iter()
            .find(|e| e.entry == VIRTUAL_ROOT)
            .map(|e| e.target.as_str())
    }

    /// # Errors
    ///
    /// Returns an error if the nested documents fail to serialize.
    pub fn to_response(&self) -> Result<TransferAuthResponse, serde_json::Error> {
        Ok(TransferAuthResponse {
            role: self.role.clone(),
            policy: serde_json::to_string(&self.policy)?,
            home_directory_type: self.home_directory_type,
            home_directory_details: serde_json::to_string(&self.home_directory_details)?,
        })
    }
}
