// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// Types shared by more than one estimator live here; single-use types stay with their module.

use thiserror::Error;

/// Precondition failures raised by the estimators.
///
/// None of these are recoverable by retrying: each one means the caller handed the
/// estimator an input it cannot reason about, and no partial result is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("The selection size k must be at least 1 (got {0}).")]
    InvalidSelectionSize(usize),
    #[error("A group of {n} items cannot supply a random subset of size {k}; n must be at least k.")]
    GroupTooSmall { n: usize, k: usize },
    #[error("Paired vectors must have equal length (found {left} and {right}).")]
    LengthMismatch { left: usize, right: usize },
    #[error("The input must contain at least one item.")]
    EmptyInput,
    #[error("The brute-force estimator enumerates pairs and only supports k = 2 (got k = {0}).")]
    BruteRequiresPairs(usize),
    #[error("At least {required} trials are required (got {found}).")]
    TooFewTrials { found: usize, required: usize },
}

/// Which algorithm evaluates the hockey-stick distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PmfVariant {
    /// Backward recursion from the top rank. Bounded in [0, 1] at every step.
    #[default]
    Recursive,
    /// Ratio of floating-point binomial coefficients. Overflows once C(n, k) leaves the
    /// f64 range, so it is only a reference oracle for small groups.
    DirectBinomial,
}

/// Checks `n >= k >= 1`.
pub(crate) fn check_selection(n: usize, k: usize) -> Result<(), SelectionError> {
    if k == 0 {
        return Err(SelectionError::InvalidSelectionSize(k));
    }
    if n < k {
        return Err(SelectionError::GroupTooSmall { n, k });
    }
    Ok(())
}

/// Checks that two paired vectors line up and are non-empty, returning their shared length.
pub(crate) fn check_paired(left: usize, right: usize) -> Result<usize, SelectionError> {
    if left != right {
        return Err(SelectionError::LengthMismatch { left, right });
    }
    if left == 0 {
        return Err(SelectionError::EmptyInput);
    }
    Ok(left)
}

pub(crate) fn check_trials(trials: usize) -> Result<(), SelectionError> {
    // Sample variance with ddof = 1 needs at least two draws.
    const MINIMUM_TRIALS: usize = 2;
    if trials < MINIMUM_TRIALS {
        return Err(SelectionError::TooFewTrials {
            found: trials,
            required: MINIMUM_TRIALS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_requires_positive_k_not_exceeding_n() {
        assert_eq!(check_selection(5, 0), Err(SelectionError::InvalidSelectionSize(0)));
        assert_eq!(
            check_selection(2, 3),
            Err(SelectionError::GroupTooSmall { n: 2, k: 3 })
        );
        assert!(check_selection(3, 3).is_ok());
    }

    #[test]
    fn paired_lengths_must_match_and_be_non_empty() {
        assert_eq!(
            check_paired(3, 4),
            Err(SelectionError::LengthMismatch { left: 3, right: 4 })
        );
        assert_eq!(check_paired(0, 0), Err(SelectionError::EmptyInput));
        assert_eq!(check_paired(4, 4), Ok(4));
    }

    #[test]
    fn a_single_trial_is_rejected() {
        assert_eq!(
            check_trials(1),
            Err(SelectionError::TooFewTrials {
                found: 1,
                required: 2
            })
        );
        assert!(check_trials(2).is_ok());
    }

    #[test]
    fn error_messages_name_the_offending_sizes() {
        let message = SelectionError::GroupTooSmall { n: 1, k: 2 }.to_string();
        assert!(message.contains("1 items"), "unexpected message: {message}");
        assert!(message.contains("size 2"), "unexpected message: {message}");
    }
}
