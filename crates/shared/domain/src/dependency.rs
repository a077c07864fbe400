//! Dependency kinds linking accounts to satellite records.

use std::fmt;

use crate::error::{DomainError, DomainResult};

/// The fixed whitelist of account dependency relations.
///
/// Each kind corresponds to one satellite table holding composite-keyed
/// (owner address, dependent id) pairs. Confirmed and unconfirmed variants
/// are distinct relations and never reconciled implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// Confirmed delegate votes
    DelegateVotes,
    /// Unconfirmed delegate votes
    UnconfirmedDelegateVotes,
    /// Confirmed multisignature group members
    MultisigMembers,
    /// Unconfirmed multisignature group members
    UnconfirmedMultisigMembers,
}

impl DependencyKind {
    /// All whitelisted kinds
    pub const ALL: [DependencyKind; 4] = [
        DependencyKind::DelegateVotes,
        DependencyKind::UnconfirmedDelegateVotes,
        DependencyKind::MultisigMembers,
        DependencyKind::UnconfirmedMultisigMembers,
    ];

    /// The logical field name exposed by the accounts projection
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::DelegateVotes => "delegates",
            DependencyKind::UnconfirmedDelegateVotes => "u_delegates",
            DependencyKind::MultisigMembers => "multisignatures",
            DependencyKind::UnconfirmedMultisigMembers => "u_multisignatures",
        }
    }

    /// Parse a kind from its field-name form.
    ///
    /// Unrecognized kinds are rejected here, before any statement exists.
    pub fn parse(kind: &str) -> DomainResult<Self> {
        match kind {
            "delegates" => Ok(DependencyKind::DelegateVotes),
            "u_delegates" => Ok(DependencyKind::UnconfirmedDelegateVotes),
            "multisignatures" => Ok(DependencyKind::MultisigMembers),
            "u_multisignatures" => Ok(DependencyKind::UnconfirmedMultisigMembers),
            other => Err(DomainError::invalid_argument(format!(
                "unknown dependency kind: {}",
                other
            ))),
        }
    }
}

impl std::str::FromStr for DependencyKind {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        DependencyKind::parse(s)
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_every_kind() {
        for kind in DependencyKind::ALL {
            assert_eq!(DependencyKind::parse(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        let err = DependencyKind::parse("followers").unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(msg) if msg.contains("followers")));
    }
}
