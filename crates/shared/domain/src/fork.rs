//! Fork audit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Why a chain fork was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForkCause {
    /// Received block at the current height with a different previous block
    DivergentPreviousBlock,
    /// Chain rolled back while recovering from a longer competing chain
    ChainRewind,
    /// Two blocks forged by the same delegate in one slot
    DoubleForge,
}

impl ForkCause {
    /// Stable numeric code stored in the audit row
    pub fn code(&self) -> i16 {
        match self {
            ForkCause::DivergentPreviousBlock => 1,
            ForkCause::ChainRewind => 2,
            ForkCause::DoubleForge => 3,
        }
    }
}

impl TryFrom<i16> for ForkCause {
    type Error = DomainError;

    fn try_from(code: i16) -> DomainResult<Self> {
        match code {
            1 => Ok(ForkCause::DivergentPreviousBlock),
            2 => Ok(ForkCause::ChainRewind),
            3 => Ok(ForkCause::DoubleForge),
            other => Err(DomainError::invalid_argument(format!(
                "unknown fork cause code: {}",
                other
            ))),
        }
    }
}

/// Immutable append-only audit entry describing a detected chain fork.
///
/// Created once on detection; never updated or deleted through this
/// interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fork {
    /// Hex-encoded public key of the delegate that forged the block
    pub delegate_public_key: String,
    pub block_id: String,
    pub block_height: i64,
    pub previous_block_id: Option<String>,
    /// Chain epoch timestamp of the offending block
    pub block_timestamp: i64,
    pub cause: ForkCause,
    /// Wall clock time the fork was recorded
    pub recorded_at: Option<DateTime<Utc>>,
}

impl Fork {
    /// Create a fork record for insertion (recorded_at is stamped on write)
    pub fn new(
        delegate_public_key: String,
        block_id: String,
        block_height: i64,
        previous_block_id: Option<String>,
        block_timestamp: i64,
        cause: ForkCause,
    ) -> Self {
        Self {
            delegate_public_key,
            block_id,
            block_height,
            previous_block_id,
            block_timestamp,
            cause,
            recorded_at: None,
        }
    }
}
