//! Account domain entity and related types.

use serde::{Deserialize, Deserializer, Serialize};

/// Account domain entity.
///
/// Mirrors the full projection returned by the accounts repository: byte
/// columns arrive as lowercase hex text, boolean flags as small integers,
/// and dependency arrays as JSON arrays aggregated from satellite tables.
/// Confirmed columns carry the applied chain state; their `u_` twins carry
/// the tentative state pending confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub second_public_key: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub u_username: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub is_delegate: bool,
    #[serde(default, deserialize_with = "flag")]
    pub u_is_delegate: bool,
    #[serde(default, deserialize_with = "flag")]
    pub second_signature: bool,
    #[serde(default, deserialize_with = "flag")]
    pub u_second_signature: bool,
    #[serde(default, deserialize_with = "flag")]
    pub name_exist: bool,
    #[serde(default, deserialize_with = "flag")]
    pub u_name_exist: bool,
    #[serde(default)]
    pub balance: i64,
    #[serde(default)]
    pub u_balance: i64,
    #[serde(default)]
    pub vote: i64,
    #[serde(default)]
    pub rank: Option<i64>,
    #[serde(default)]
    pub multi_min: i16,
    #[serde(default)]
    pub u_multi_min: i16,
    #[serde(default)]
    pub multi_lifetime: i16,
    #[serde(default)]
    pub u_multi_lifetime: i16,
    #[serde(default)]
    pub fees: i64,
    #[serde(default)]
    pub rewards: i64,
    #[serde(default)]
    pub produced_blocks: i64,
    #[serde(default)]
    pub missed_blocks: i64,
    /// Set until the account receives its first state-changing mutation
    #[serde(default = "default_virgin", deserialize_with = "flag")]
    pub virgin: bool,
    #[serde(default)]
    pub block_id: Option<String>,
    /// Addresses of delegates this account votes for
    #[serde(default)]
    pub delegates: Option<Vec<String>>,
    #[serde(default)]
    pub u_delegates: Option<Vec<String>>,
    /// Public keys of the account's multisignature group members
    #[serde(default)]
    pub multisignatures: Option<Vec<String>>,
    #[serde(default)]
    pub u_multisignatures: Option<Vec<String>>,
}

fn default_virgin() -> bool {
    true
}

/// Accept smallint-encoded flags (0/1) as well as native booleans.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Bool(b) => Ok(b),
        serde_json::Value::Number(n) => Ok(n.as_i64().unwrap_or(0) != 0),
        serde_json::Value::Null => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected boolean or integer flag, got {}",
            other
        ))),
    }
}

impl Account {
    /// Create an empty account keyed by address
    pub fn new(address: String) -> Self {
        Self {
            address,
            public_key: None,
            second_public_key: None,
            username: None,
            u_username: None,
            is_delegate: false,
            u_is_delegate: false,
            second_signature: false,
            u_second_signature: false,
            name_exist: false,
            u_name_exist: false,
            balance: 0,
            u_balance: 0,
            vote: 0,
            rank: None,
            multi_min: 0,
            u_multi_min: 0,
            multi_lifetime: 0,
            u_multi_lifetime: 0,
            fees: 0,
            rewards: 0,
            produced_blocks: 0,
            missed_blocks: 0,
            virgin: true,
            block_id: None,
            delegates: None,
            u_delegates: None,
            multisignatures: None,
            u_multisignatures: None,
        }
    }

    /// Check if the account has never received a state-changing mutation
    pub fn is_virgin(&self) -> bool {
        self.virgin
    }

    /// Check if the account is a registered delegate
    pub fn is_registered_delegate(&self) -> bool {
        self.is_delegate
    }

    /// Check if the account requires a second signature
    pub fn has_second_signature(&self) -> bool {
        self.second_signature
    }

    /// Check if the account belongs to a multisignature group
    pub fn is_multisig(&self) -> bool {
        self.multi_min > 0
    }

    /// Confirmed and unconfirmed balances agree
    pub fn is_balance_settled(&self) -> bool {
        self.balance == self.u_balance
    }
}
