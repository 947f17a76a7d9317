/// Sentinel fingerprint meaning "no prior backup exists".
pub const NO_PRIOR_FINGERPRINT: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Backup,
    Skip,
}

/// Compare the prior and current code fingerprints. Only equal non-empty
/// fingerprints skip; everything else, including a missing prior, backs up.
pub fn decide(prior_fingerprint: &str, current_fingerprint: &str) -> Decision {
    if !current_fingerprint.is_empty() && prior_fingerprint == current_fingerprint {
        Decision::Skip
    } else {
        Decision::Backup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_non_empty_fingerprints_skip() {
        assert_eq!(decide("abc123", "abc123"), Decision::Skip);
    }

    #[test]
    fn missing_prior_backs_up() {
        assert_eq!(decide(NO_PRIOR_FINGERPRINT, "abc123"), Decision::Backup);
    }

    #[test]
    fn changed_fingerprint_backs_up() {
        assert_eq!(decide("abc123", "def456"), Decision::Backup);
    }

    #[test]
    fn empty_current_fingerprint_never_skips() {
        assert_eq!(decide(NO_PRIOR_FINGERPRINT, ""), Decision::Backup);
        assert_eq!(decide("abc123", ""), Decision::Backup);
    }
}
