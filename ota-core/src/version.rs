//! Version ordering for update decisions.

use std::cmp::Ordering;

/// Result of comparing the running version against a manifest version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCmp {
    /// Remote is strictly newer than the running version.
    Upgrade,
    /// Remote equals the running version.
    NoChange,
    /// Remote is older than the running version; never auto-installed.
    Downgrade,
}

/// Compare the running firmware version against a manifest version.
///
/// Dot-separated segments are compared numerically when both sides parse as
/// unsigned integers; a segment pair that does not is compared as raw bytes.
/// Missing trailing segments count as zero, so "1.0" equals "1.0.0".
///
/// Pre-release suffixes are not understood ("1.0.0-rc1" compares as a plain
/// byte string against "1.0.0-rc2"); manifest versions are expected to be
/// plain dotted numerics.
pub fn compare(current: &str, remote: &str) -> VersionCmp {
    let mut current_segments = current.split('.');
    let mut remote_segments = remote.split('.');

    loop {
        let (c, r) = (current_segments.next(), remote_segments.next());
        if c.is_none() && r.is_none() {
            return VersionCmp::NoChange;
        }
        let c = c.unwrap_or("0");
        let r = r.unwrap_or("0");

        let ordering = match (c.parse::<u64>(), r.parse::<u64>()) {
            (Ok(c_num), Ok(r_num)) => r_num.cmp(&c_num),
            _ => r.as_bytes().cmp(c.as_bytes()),
        };

        match ordering {
            Ordering::Greater => return VersionCmp::Upgrade,
            Ordering::Less => return VersionCmp::Downgrade,
            Ordering::Equal => {}
        }
    }
}
