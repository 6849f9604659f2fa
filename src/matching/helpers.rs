//! String similarity scoring on a 0-100 integer scale.

use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, levenshtein};

/// Similarity metric used for the name comparison step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scorer {
    /// Normalized Indel ratio: `100 * (1 - indel / (len_a + len_b))`.
    #[default]
    Ratio,
    /// `100 * (1 - levenshtein / max_len)`.
    Levenshtein,
    /// `100 * jaro_winkler`.
    JaroWinkler,
}

impl Scorer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ratio => "ratio",
            Self::Levenshtein => "levenshtein",
            Self::JaroWinkler => "jaro-winkler",
        }
    }

    /// Raw percentage in `0.0..=100.0`.
    pub fn similarity_pct(&self, a: &str, b: &str) -> f64 {
        match self {
            Self::Ratio => sim_indel_pct(a, b),
            Self::Levenshtein => sim_levenshtein_pct(a, b),
            Self::JaroWinkler => jaro_winkler(a, b) * 100.0,
        }
    }

    /// Integer score used by the accept/reject decision. An empty string on either
    /// side scores 0, so a missing name can never clear a threshold. The raw
    /// percentage is rounded first: 74.6 counts as 75.
    pub fn score(&self, a: &str, b: &str) -> u8 {
        if a.is_empty() || b.is_empty() {
            return 0;
        }
        let pct = self.similarity_pct(a, b).clamp(0.0, 100.0);
        pct.round() as u8
    }
}

impl std::fmt::Display for Scorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Scorer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ratio" | "indel" => Ok(Self::Ratio),
            "levenshtein" | "lev" => Ok(Self::Levenshtein),
            "jaro-winkler" | "jaro_winkler" | "jw" => Ok(Self::JaroWinkler),
            other => Err(format!("unknown scorer: {}", other)),
        }
    }
}

/// Compute Levenshtein similarity as a percentage (0.0-100.0).
pub(crate) fn sim_levenshtein_pct(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 100.0;
    }
    let dist = levenshtein(a, b);
    (1.0 - (dist as f64 / max_len as f64)) * 100.0
}

/// Normalized Indel similarity as a percentage (0.0-100.0). Indel distance only
/// counts insertions and deletions, so it equals `len_a + len_b - 2 * lcs`.
pub(crate) fn sim_indel_pct(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    let dist = total - 2 * lcs_len(&a, &b);
    (1.0 - (dist as f64 / total as f64)) * 100.0
}

/// Longest common subsequence length, two-row DP.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
