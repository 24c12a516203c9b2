//! Error types for the WishLedger engine.
//!
//! All errors use the `WL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Currency policy errors
//! - 2xx: Projection errors
//! - 3xx: Reconciliation errors
//! - 4xx: Log / transport errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{LocalId, Tier, UserId};

/// Central error enum for all WishLedger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // =================================================================
    // Currency Policy Errors (1xx)
    // =================================================================
    /// The delta would drive a tier's count below zero.
    #[error("WL_ERR_100: Insufficient {tier} balance: need {need}, have {have}")]
    InsufficientBalance { tier: Tier, need: u64, have: u64 },

    /// The delta would push a tier's count above its configured maximum.
    #[error("WL_ERR_101: {tier} balance would reach {resulting}, max is {max}")]
    OverMax { tier: Tier, max: u64, resulting: i128 },

    /// The operation requires a non-zero effect but the delta is zero.
    #[error("WL_ERR_102: Zero delta for an operation that requires an effect")]
    ZeroDelta,

    /// Conversion target is not the adjacent higher tier.
    #[error("WL_ERR_103: Invalid tier jump: {from} -> {to}")]
    InvalidTierJump { from: Tier, to: Tier },

    /// Conversion amount is not a positive multiple of the conversion ratio.
    #[error("WL_ERR_104: Conversion count {count} is not a positive multiple of {ratio}")]
    NonMultipleConversion { count: u64, ratio: u64 },

    // =================================================================
    // Projection Errors (2xx)
    // =================================================================
    /// No projection has been loaded for this user yet.
    #[error("WL_ERR_200: Projection not loaded for user {0}")]
    ProjectionNotLoaded(UserId),

    /// No pending entry matches the given local id.
    #[error("WL_ERR_201: Pending entry not found: {0}")]
    PendingNotFound(LocalId),

    // =================================================================
    // Reconciliation Errors (3xx)
    // =================================================================
    /// A sequence gap was detected and the resync that should repair it failed.
    #[error("WL_ERR_300: Resync failed: {reason}")]
    ResyncFailed { reason: String },

    // =================================================================
    // Log / Transport Errors (4xx)
    // =================================================================
    /// The Transaction Log could not be reached or refused the request.
    #[error("WL_ERR_400: Transaction log unavailable: {reason}")]
    LogUnavailable { reason: String },

    /// The push event channel closed while pending entries were undecided.
    #[error("WL_ERR_401: Event transport closed with undecided pending entries")]
    TransportClosed,

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("WL_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("WL_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// I/O error (disk, network).
    #[error("WL_ERR_902: I/O error: {0}")]
    Io(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LedgerError>;

// Conversion from std::io::Error
impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = LedgerError::ProjectionNotLoaded(UserId::new());
        let msg = format!("{err}");
        assert!(msg.starts_with("WL_ERR_200"), "Got: {msg}");
    }

    #[test]
    fn insufficient_balance_display() {
        let err = LedgerError::InsufficientBalance {
            tier: Tier::Green,
            need: 10,
            have: 3,
        };
        let msg = format!("{err}");
        assert!(msg.contains("WL_ERR_100"));
        assert!(msg.contains("green"));
        assert!(msg.contains("10"));
        assert!(msg.contains('3'));
    }

    #[test]
    fn invalid_tier_jump_display() {
        let err = LedgerError::InvalidTierJump {
            from: Tier::Green,
            to: Tier::Red,
        };
        let msg = format!("{err}");
        assert!(msg.contains("WL_ERR_103"));
        assert!(msg.contains("green"));
        assert!(msg.contains("red"));
    }

    #[test]
    fn all_errors_have_wl_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(LedgerError::ZeroDelta),
            Box::new(LedgerError::NonMultipleConversion { count: 7, ratio: 10 }),
            Box::new(LedgerError::PendingNotFound(LocalId::new())),
            Box::new(LedgerError::TransportClosed),
            Box::new(LedgerError::Internal("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("WL_ERR_"),
                "Error missing WL_ERR_ prefix: {msg}"
            );
        }
    }
}
