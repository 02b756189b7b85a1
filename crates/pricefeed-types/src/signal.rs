//! Signals, votes and aggregate signal power.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Result, TypesError};

/// Maximum byte length of a signal id (one ABI `bytes32` word).
pub const MAX_SIGNAL_ID_LENGTH: usize = 32;

/// One voter's power allocation to one signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    /// Signal id, e.g. `CS:BTC-USD`.
    pub id: String,
    /// Allocated power.
    pub power: i64,
}

impl Signal {
    /// Create a new signal.
    pub fn new(id: impl Into<String>, power: i64) -> Self {
        Self {
            id: id.into(),
            power,
        }
    }
}

/// The full set of signals a voter currently backs. Exactly one per voter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Voter address.
    pub voter: String,
    /// Signals with unique ids.
    pub signals: Vec<Signal>,
}

impl Vote {
    /// Create a vote.
    pub fn new(voter: impl Into<String>, signals: Vec<Signal>) -> Self {
        Self {
            voter: voter.into(),
            signals,
        }
    }

    /// Sum of all signal powers in this vote.
    pub fn total_power(&self) -> i128 {
        self.signals.iter().map(|s| s.power as i128).sum()
    }
}

/// Sum of every voter's power on one signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalTotalPower {
    /// Signal id.
    pub id: String,
    /// Aggregate power, never negative.
    pub power: i64,
}

impl SignalTotalPower {
    /// Create a signal total power entry.
    pub fn new(id: impl Into<String>, power: i64) -> Self {
        Self {
            id: id.into(),
            power,
        }
    }
}

/// Check that a signal id is non-empty and fits in 32 bytes.
///
/// # Errors
///
/// - [`TypesError::InvalidSignalId`] if the id is empty or only whitespace
/// - [`TypesError::SignalIdTooLong`] if the id exceeds [`MAX_SIGNAL_ID_LENGTH`] bytes
pub fn validate_signal_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(TypesError::InvalidSignalId(id.to_string()));
    }
    if id.len() > MAX_SIGNAL_ID_LENGTH {
        return Err(TypesError::SignalIdTooLong {
            id: id.to_string(),
            len: id.len(),
            max: MAX_SIGNAL_ID_LENGTH,
        });
    }
    Ok(())
}

/// Validate a vote's signal list: count, id format, uniqueness and
/// positive power.
///
/// # Errors
///
/// - [`TypesError::TooManySignals`] if more than `max_signals` entries
/// - [`TypesError::DuplicateSignalId`] on a repeated id
/// - [`TypesError::NonPositivePower`] on power <= 0
/// - any error from [`validate_signal_id`]
pub fn validate_signals(signals: &[Signal], max_signals: u64) -> Result<()> {
    if signals.len() as u64 > max_signals {
        return Err(TypesError::TooManySignals {
            count: signals.len(),
            max: max_signals,
        });
    }

    let mut seen = BTreeSet::new();
    for signal in signals {
        validate_signal_id(&signal.id)?;
        if !seen.insert(signal.id.as_str()) {
            return Err(TypesError::DuplicateSignalId(signal.id.clone()));
        }
        if signal.power <= 0 {
            return Err(TypesError::NonPositivePower {
                signal_id: signal.id.clone(),
                power: signal.power,
            });
        }
    }
    Ok(())
}

/// Left-pad a signal id with zero bytes into a 32-byte word.
///
/// The id is right-aligned, matching how relay consumers decode `bytes32`
/// ids. Ids longer than 32 bytes are rejected, never truncated.
///
/// # Errors
///
/// [`TypesError::SignalIdTooLong`] if the id exceeds 32 bytes.
pub fn signal_id_to_bytes32(id: &str) -> Result<[u8; 32]> {
    let bytes = id.as_bytes();
    if bytes.len() > MAX_SIGNAL_ID_LENGTH {
        return Err(TypesError::SignalIdTooLong {
            id: id.to_string(),
            len: bytes.len(),
            max: MAX_SIGNAL_ID_LENGTH,
        });
    }
    let mut word = [0u8; 32];
    word[MAX_SIGNAL_ID_LENGTH - bytes.len()..].copy_from_slice(bytes);
    Ok(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_signal_id() {
        validate_signal_id("CS:BTC-USD").expect("valid id");
        validate_signal_id(&"a".repeat(32)).expect("32 bytes is allowed");
        assert!(matches!(
            validate_signal_id(""),
            Err(TypesError::InvalidSignalId(_))
        ));
        assert!(matches!(
            validate_signal_id(&"a".repeat(33)),
            Err(TypesError::SignalIdTooLong { len: 33, .. })
        ));
    }

    #[test]
    fn test_validate_signals_rejects_duplicates() {
        let signals = vec![Signal::new("CS:BTC-USD", 1), Signal::new("CS:BTC-USD", 2)];
        let err = validate_signals(&signals, 10).expect_err("duplicate");
        assert!(matches!(err, TypesError::DuplicateSignalId(id) if id == "CS:BTC-USD"));
    }

    #[test]
    fn test_validate_signals_rejects_non_positive_power() {
        let signals = vec![Signal::new("CS:BTC-USD", 0)];
        let err = validate_signals(&signals, 10).expect_err("zero power");
        assert!(matches!(err, TypesError::NonPositivePower { power: 0, .. }));
    }

    #[test]
    fn test_validate_signals_rejects_too_many() {
        let signals = vec![Signal::new("A", 1), Signal::new("B", 1)];
        let err = validate_signals(&signals, 1).expect_err("too many");
        assert!(matches!(err, TypesError::TooManySignals { count: 2, max: 1 }));
    }

    #[test]
    fn test_signal_id_to_bytes32_right_aligned() {
        let word = signal_id_to_bytes32("testSignal").expect("fits");
        assert_eq!(&word[..22], &[0u8; 22]);
        assert_eq!(&word[22..], b"testSignal");
    }

    #[test]
    fn test_signal_id_to_bytes32_too_long() {
        let err = signal_id_to_bytes32("this-is-too-long-signal-id-that-cannot-be-converted")
            .expect_err("too long");
        assert!(matches!(err, TypesError::SignalIdTooLong { .. }));
    }

    #[test]
    fn test_vote_total_power() {
        let vote = Vote::new("alice", vec![Signal::new("A", i64::MAX), Signal::new("B", 1)]);
        assert_eq!(vote.total_power(), i64::MAX as i128 + 1);
    }
}
