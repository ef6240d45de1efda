//! `updateauth` action payload construction.
//!
//! Everything here is pure: a request goes in, a serializable payload comes
//! out. Only a single-key authority (threshold 1, weight 1) is ever built.

use core::convert::Infallible;
use core::fmt;
use core::str::FromStr;

use serde::{Serialize, Serializer};

pub const OWNER: &str = "owner";
pub const ACTIVE: &str = "active";

/// Permission level being rotated.
///
/// Values other than `owner` and `active` are kept verbatim and handed to
/// the external client, which is the one that decides whether they exist.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Permission {
    Owner,
    #[default]
    Active,
    Other(String),
}

impl Permission {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Owner => OWNER,
            Self::Active => ACTIVE,
            Self::Other(name) => name.as_str(),
        }
    }

    pub const fn is_owner(&self) -> bool {
        matches!(self, Self::Owner)
    }

    /// Parent of the permission in the account's authority tree.
    pub const fn parent(&self) -> &'static str {
        if self.is_owner() {
            ""
        } else {
            OWNER
        }
    }

    /// Permission the client signs the `updateauth` action with.
    pub const fn authorization(&self) -> &'static str {
        if self.is_owner() {
            OWNER
        } else {
            ACTIVE
        }
    }
}

impl FromStr for Permission {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            OWNER => Self::Owner,
            ACTIVE => Self::Active,
            other => Self::Other(other.to_owned()),
        })
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateAuthRequest {
    pub account: String,
    pub permission: Permission,
    pub new_public_key: String,
}

impl UpdateAuthRequest {
    pub fn new(
        account: impl Into<String>,
        new_public_key: impl Into<String>,
        permission: Permission,
    ) -> Self {
        Self {
            account: account.into(),
            permission,
            new_public_key: new_public_key.into(),
        }
    }

    /// `account@permission` pair passed to the client as the signer.
    pub fn authorization(&self) -> String {
        format!("{}@{}", self.account, self.permission.authorization())
    }

    pub fn payload(&self) -> AuthorityPayload {
        build_payload(&self.account, &self.new_public_key, &self.permission)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthorityPayload {
    pub account: String,
    pub permission: Permission,
    pub parent: String,
    pub auth: Authority,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Authority {
    pub threshold: u32,
    pub keys: Vec<KeyWeight>,
    pub accounts: Vec<PermissionLevelWeight>,
    pub waits: Vec<WaitWeight>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeyWeight {
    pub key: String,
    pub weight: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PermissionLevel {
    pub actor: String,
    pub permission: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PermissionLevelWeight {
    pub permission: PermissionLevel,
    pub weight: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WaitWeight {
    pub wait_sec: u32,
    pub weight: u16,
}

impl Authority {
    pub fn single_key(key: impl Into<String>) -> Self {
        Self {
            threshold: 1,
            keys: vec![KeyWeight {
                key: key.into(),
                weight: 1,
            }],
            accounts: Vec::new(),
            waits: Vec::new(),
        }
    }
}

pub fn build_payload(
    account: &str,
    new_public_key: &str,
    permission: &Permission,
) -> AuthorityPayload {
    AuthorityPayload {
        account: account.to_owned(),
        permission: permission.clone(),
        parent: permission.parent().to_owned(),
        auth: Authority::single_key(new_public_key),
    }
}
