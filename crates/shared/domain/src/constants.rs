//! Domain-level constants.
//!
//! These constants define ledger-wide business rules and validation
//! requirements.

// =============================================================================
// Addresses
// =============================================================================

/// Maximum length of an account address (numeric string plus suffix)
pub const MAX_ADDRESS_LENGTH: usize = 22;

/// Check if an address is structurally acceptable as a record key
pub fn is_valid_address(address: &str) -> bool {
    !address.is_empty() && address.len() <= MAX_ADDRESS_LENGTH
}

// =============================================================================
// Delegates
// =============================================================================

/// Number of forging slots per round
pub const ACTIVE_DELEGATES: usize = 101;

/// Maximum number of delegate votes a single account may cast
pub const MAX_VOTES_PER_ACCOUNT: usize = 101;

/// Maximum delegate username length
pub const MAX_USERNAME_LENGTH: usize = 20;

/// Check if a delegate username satisfies length rules
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty() && username.len() <= MAX_USERNAME_LENGTH
}

// =============================================================================
// Multisignature groups
// =============================================================================

/// Maximum number of members in a multisignature group
pub const MAX_MULTISIG_MEMBERS: usize = 15;

/// Maximum multisignature registration lifetime in hours
pub const MAX_MULTISIG_LIFETIME_HOURS: i16 = 72;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_length_rules() {
        assert!(is_valid_address("12668885769632475474L"));
        assert!(!is_valid_address(""));
        assert!(!is_valid_address(&"9".repeat(MAX_ADDRESS_LENGTH + 1)));
    }

    #[test]
    fn test_username_length_rules() {
        assert!(is_valid_username("genesis_1"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username(&"a".repeat(MAX_USERNAME_LENGTH + 1)));
    }
}
