//! Token ledger
//!
//! Turns the external, ever-growing usage counter into per-step deltas.
//!
//! The counter belongs to the model client and never goes back to zero.
//! After a restore the next step must be measured from the counter value
//! at the moment of the restore, not from the last recorded step, so a
//! reset stores that value as a one-shot baseline.

#[cfg(test)]
mod proptests;

use serde::{Serialize, Serializer};

/// A triple of token counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenCounts {
    pub total: u64,
    pub prompt: u64,
    pub completion: u64,
}

impl TokenCounts {
    pub fn new(total: u64, prompt: u64, completion: u64) -> Self {
        Self {
            total,
            prompt,
            completion,
        }
    }

    /// Component-wise difference floored at zero
    pub fn saturating_sub(self, earlier: TokenCounts) -> TokenCounts {
        TokenCounts {
            total: self.total.saturating_sub(earlier.total),
            prompt: self.prompt.saturating_sub(earlier.prompt),
            completion: self.completion.saturating_sub(earlier.completion),
        }
    }

    pub fn saturating_add(self, other: TokenCounts) -> TokenCounts {
        TokenCounts {
            total: self.total.saturating_add(other.total),
            prompt: self.prompt.saturating_add(other.prompt),
            completion: self.completion.saturating_add(other.completion),
        }
    }
}

/// Ledger row identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Numbered(u64),
    Reset,
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Step::Numbered(n) => serializer.serialize_u64(*n),
            Step::Reset => serializer.serialize_str("RESET"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub step: Step,
    pub cumulative: TokenCounts,
    pub delta: TokenCounts,
}

/// Column-oriented view of the ledger for charting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageSeries {
    pub steps: Vec<Step>,
    pub cumulative_total: Vec<u64>,
    pub cumulative_prompt: Vec<u64>,
    pub cumulative_completion: Vec<u64>,
    pub delta_total: Vec<u64>,
    pub delta_prompt: Vec<u64>,
    pub delta_completion: Vec<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct TokenLedger {
    entries: Vec<LedgerEntry>,
    /// Counter value captured at the last reset, consumed by the next record
    baseline: Option<TokenCounts>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn pending_baseline(&self) -> Option<TokenCounts> {
        self.baseline
    }

    /// Record the counter after a completed interaction
    pub fn record(&mut self, cumulative: TokenCounts) -> LedgerEntry {
        let previous = self
            .baseline
            .take()
            .unwrap_or_else(|| self.last_cumulative());
        let delta = cumulative.saturating_sub(previous);
        let step = Step::Numbered(self.last_step() + 1);

        tracing::debug!(
            ?step,
            previous_total = previous.total,
            current_total = cumulative.total,
            delta_total = delta.total,
            "Recorded token usage"
        );

        let entry = LedgerEntry {
            step,
            cumulative,
            delta,
        };
        self.entries.push(entry);
        entry
    }

    /// Record a discontinuity. The counter is not zeroed upstream, so its
    /// current value becomes the baseline for the next `record`.
    pub fn record_reset(&mut self, cumulative: TokenCounts) {
        self.entries.push(LedgerEntry {
            step: Step::Reset,
            cumulative: TokenCounts::default(),
            delta: TokenCounts::default(),
        });
        self.baseline = Some(cumulative);
        tracing::debug!(baseline_total = cumulative.total, "Token ledger re-based");
    }

    /// Cumulative counts of the most recent numbered step
    pub fn last_cumulative(&self) -> TokenCounts {
        self.numbered()
            .next_back()
            .map(|e| e.cumulative)
            .unwrap_or_default()
    }

    /// Sum of all deltas: what this session actually consumed
    pub fn consumed(&self) -> TokenCounts {
        self.entries
            .iter()
            .fold(TokenCounts::default(), |acc, e| acc.saturating_add(e.delta))
    }

    pub fn series(&self) -> UsageSeries {
        let mut series = UsageSeries::default();
        for entry in &self.entries {
            series.steps.push(entry.step);
            series.cumulative_total.push(entry.cumulative.total);
            series.cumulative_prompt.push(entry.cumulative.prompt);
            series.cumulative_completion.push(entry.cumulative.completion);
            series.delta_total.push(entry.delta.total);
            series.delta_prompt.push(entry.delta.prompt);
            series.delta_completion.push(entry.delta.completion);
        }
        series
    }

    fn last_step(&self) -> u64 {
        self.numbered()
            .next_back()
            .and_then(|e| match e.step {
                Step::Numbered(n) => Some(n),
                Step::Reset => None,
            })
            .unwrap_or(0)
    }

    fn numbered(&self) -> impl DoubleEndedIterator<Item = &LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.step, Step::Numbered(_)))
    }
}
