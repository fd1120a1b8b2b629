//! `sys.version_info` comparisons used by the `if sys.version_info <op> (M, N):` guard (§4.2).

use std::cmp::Ordering;

/// A `(major, minor)` Python language version, e.g. `Version(3, 10)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct PythonVersion {
    pub major: u8,
    pub minor: u8,
}

impl PythonVersion {
    #[must_use]
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// The oldest version family the engine still has special-cased behaviour
    /// for (§4.1's bytes-indexing and big-integer literal rules differ
    /// between Py2 and Py3).
    #[must_use]
    pub const fn is_py2(self) -> bool {
        self.major == 2
    }
}

/// Comparison operators recognised in a `sys.version_info` guard.
///
/// Anything else (e.g. `!=`, or a right-hand side that isn't a 2-tuple of
/// literal integers) is "unrecognised" and the walker falls back to walking
/// every branch per §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCmpOp {
    Lt,
    LtE,
    Gt,
    GtE,
    Eq,
}

impl VersionCmpOp {
    #[must_use]
    pub fn evaluate(self, lhs: PythonVersion, rhs: PythonVersion) -> bool {
        match lhs.cmp(&rhs) {
            Ordering::Less => matches!(self, Self::Lt | Self::LtE),
            Ordering::Equal => matches!(self, Self::LtE | Self::GtE | Self::Eq),
            Ordering::Greater => matches!(self, Self::Gt | Self::GtE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_matches_scenario_3() {
        let py37 = PythonVersion::new(3, 7);
        let py27 = PythonVersion::new(2, 7);
        let threshold = PythonVersion::new(3, 0);

        assert!(VersionCmpOp::GtE.evaluate(py37, threshold));
        assert!(!VersionCmpOp::GtE.evaluate(py27, threshold));
    }
}
