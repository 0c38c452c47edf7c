//! Alias expansion budget.
//!
//! Aliases let a tiny document describe an exponentially large value ("billion laughs").
//! The decoder counts every node it visits and every node it visits through an alias; once
//! both counts pass their minimums, the share of aliased visits must stay below a ceiling
//! that tightens as the document grows.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Thresholds of the aliasing heuristic.
///
/// Example: a tighter budget passed through [`crate::Options`].
///
/// ```rust
/// use yaml_decode::{AliasBudget, Shape};
///
/// let options = yaml_decode::options! {
///     alias_budget: AliasBudget {
///         min_decodes: 10,
///         min_aliases: 5,
///         ratio_range_low: 0,
///         ratio_range_high: 1,
///     },
/// };
///
/// let yaml = "a: &a [1, 2]\nb: [*a, *a, *a, *a, *a, *a, *a, *a]\n";
/// let err = yaml_decode::decode_with_options(yaml.as_bytes(), &Shape::Dynamic, &options)
///     .unwrap_err();
/// assert_eq!(err.to_string(), "document contains excessive aliasing");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasBudget {
    /// Number of visited nodes below which the heuristic is not evaluated.
    ///
    /// Default: 1,000
    pub min_decodes: usize,
    /// Number of aliased visits below which the heuristic is not evaluated.
    ///
    /// Default: 100
    pub min_aliases: usize,
    /// Up to this many visited nodes, 99% of them may come through aliases.
    ///
    /// Default: 400,000
    pub ratio_range_low: usize,
    /// From this many visited nodes on, only 10% of them may come through aliases.
    /// Between the two bounds the ceiling falls linearly.
    ///
    /// Default: 4,000,000
    pub ratio_range_high: usize,
}

impl Default for AliasBudget {
    fn default() -> Self {
        Self {
            min_decodes: 1_000,
            min_aliases: 100,
            ratio_range_low: 400_000,     // larger documents are uncommon
            ratio_range_high: 4_000_000,  // almost nothing is legitimately this big
        }
    }
}

impl AliasBudget {
    /// Highest allowed share of aliased visits once `decode_count` nodes were visited.
    pub fn allowed_alias_ratio(&self, decode_count: usize) -> f64 {
        if decode_count <= self.ratio_range_low {
            0.99
        } else if decode_count >= self.ratio_range_high {
            0.10
        } else {
            let range = (self.ratio_range_high - self.ratio_range_low) as f64;
            0.99 - 0.89 * ((decode_count - self.ratio_range_low) as f64 / range)
        }
    }
}

/// Counts visits during one decode call.
#[derive(Debug)]
pub(crate) struct AliasMeter {
    budget: AliasBudget,
    decode_count: usize,
    alias_count: usize,
    alias_depth: usize,
}

/// The budget tripped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BudgetBreach {
    /// Nodes visited when the breach occurred.
    pub decodes: usize,
    /// Visits made through aliases when the breach occurred.
    pub aliases: usize,
}

impl fmt::Display for BudgetBreach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("document contains excessive aliasing")
    }
}

impl AliasMeter {
    pub(crate) fn new(budget: AliasBudget) -> Self {
        Self {
            budget,
            decode_count: 0,
            alias_count: 0,
            alias_depth: 0,
        }
    }

    /// Record one node visit.
    pub(crate) fn observe(&mut self) -> Result<(), BudgetBreach> {
        self.decode_count += 1;
        if self.alias_depth > 0 {
            self.alias_count += 1;
        }
        if self.alias_count > self.budget.min_aliases
            && self.decode_count > self.budget.min_decodes
            && (self.alias_count as f64 / self.decode_count as f64)
                > self.budget.allowed_alias_ratio(self.decode_count)
        {
            debug_print!(
                "alias budget breached: {} of {} visits aliased",
                self.alias_count,
                self.decode_count
            );
            return Err(BudgetBreach {
                decodes: self.decode_count,
                aliases: self.alias_count,
            });
        }
        Ok(())
    }

    pub(crate) fn enter_alias(&mut self) {
        self.alias_depth += 1;
    }

    pub(crate) fn leave_alias(&mut self) {
        self.alias_depth = self.alias_depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_bounds_and_interpolation() {
        let budget = AliasBudget::default();
        assert_eq!(budget.allowed_alias_ratio(0), 0.99);
        assert_eq!(budget.allowed_alias_ratio(400_000), 0.99);
        assert_eq!(budget.allowed_alias_ratio(4_000_000), 0.10);
        assert_eq!(budget.allowed_alias_ratio(40_000_000), 0.10);
        let mid = budget.allowed_alias_ratio(2_200_000);
        assert!((mid - 0.545).abs() < 1e-9, "{mid}");
    }

    #[test]
    fn plain_visits_never_trip() {
        let mut meter = AliasMeter::new(AliasBudget::default());
        for _ in 0..100_000 {
            meter.observe().unwrap();
        }
    }

    #[test]
    fn aliased_visits_trip_once_past_minimums() {
        let mut meter = AliasMeter::new(AliasBudget::default());
        meter.observe().unwrap();
        meter.enter_alias();
        let breach = (0..2_000)
            .find_map(|_| meter.observe().err())
            .expect("budget must trip");
        assert_eq!(breach.decodes, 1_001);
        assert_eq!(breach.aliases, 1_000);
        assert_eq!(breach.to_string(), "document contains excessive aliasing");
    }

    #[test]
    fn minimum_alias_count_is_respected() {
        let mut meter = AliasMeter::new(AliasBudget::default());
        meter.enter_alias();
        for _ in 0..100 {
            meter.observe().unwrap();
        }
        meter.leave_alias();
        for _ in 0..5_000 {
            meter.observe().unwrap();
        }
    }
}
