//! Least-privilege permission document for one user partition.

use serde::{Deserialize, Serialize};

/// Policy language version the storage service expects.
pub const POLICY_VERSION: &str = "2012-10-17";

pub const LIST_STATEMENT_ID: &str = "AllowListingOfUserFolder";
pub const OBJECT_STATEMENT_ID: &str = "HomeDirObjectAccess";

const ARN_PREFIX: &str = "arn:aws:s3:::";

const LIST_ACTIONS: &[&str] = &["s3:ListBucket"];
const OBJECT_ACTIONS: &[&str] = &[
    "s3:GetObject",
    "s3:PutObject",
    "s3:DeleteObject",
    "s3:PutObjectAcl",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub sid: String,
    pub effect: String,
    pub action: Vec<String>,
    pub resource: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "StringLike")]
    pub string_like: PrefixMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixMatch {
    #[serde(rename = "s3:prefix")]
    pub prefix: Vec<String>,
}

impl PolicyDocument {
    /// Build the two-statement document confining access to `partition`
    /// inside `bucket`: listing restricted by prefix, and object access
    /// beneath the partition only.
    pub fn for_partition(bucket: &str, partition: &str) -> Self {
        let list = Statement {
            sid: LIST_STATEMENT_ID.to_string(),
            effect: "Allow".to_string(),
            action: to_strings(LIST_ACTIONS),
            resource: format!("{ARN_PREFIX}{bucket}"),
            condition: Some(Condition {
                string_like: PrefixMatch {
                    prefix: vec![format!("{partition}/*"), partition.to_string()],
                },
            }),
        };

        let objects = Statement {
            sid: OBJECT_STATEMENT_ID.to_string(),
            effect: "Allow".to_string(),
            action: to_strings(OBJECT_ACTIONS),
            resource: format!("{ARN_PREFIX}{bucket}/{partition}/*"),
            condition: None,
        };

        Self {
            version: POLICY_VERSION.to_string(),
            statement: vec![list, objects],
        }
    }

    /// Every in-bucket path the document references: listing prefixes and
    /// object resource paths. Bucket-level resources carry no path.
    pub fn scoped_paths(&self) -> Vec<&str> {
        let mut paths = Vec::new();
        for statement in &self.statement {
            if let Some(condition) = &statement.condition {
                paths.extend(condition.string_like.prefix.iter().map(String::as_str));
            }
            let object_path = statement
                .resource
                .strip_prefix(ARN_PREFIX)
                .and_then(|rest| rest.split_once('/'))
                .map(|(_, path)| path);
            paths.extend(object_path);
        }
        paths
    }

    pub fn statement(&self, sid: &str) -> Option<&Statement> {
        self.statement.iter().find(|s| s.sid == sid)
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}
