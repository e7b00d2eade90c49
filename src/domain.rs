use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::KiraError;

/// Assembly name used when a manifest row carries only an accession.
pub const DEFAULT_ASSEMBLY: &str = "unknown";

fn accession_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z]{3}_[0-9]{9}(\.[0-9]+)?$").unwrap())
}

/// An assembly accession such as `GCF_000001405` or `GCA_000001405.29`.
///
/// Validation guarantees at least 13 ASCII characters, so the archive shard
/// segments can always be sliced out of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenomeAccession(String);

impl GenomeAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix and the three digit triplets of the numeric body, in archive
    /// directory order.
    pub fn shard_segments(&self) -> [&str; 4] {
        let value = self.0.as_str();
        [&value[0..3], &value[4..7], &value[7..10], &value[10..13]]
    }
}

impl fmt::Display for GenomeAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GenomeAccession {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        if !accession_pattern().is_match(normalized) {
            return Err(KiraError::InvalidGenomeAccession(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}
