//! Process-lifetime session counters.

use super::report::{OrderStatus, RunOutcome, RunReport};

/// Cumulative counters for the life of the process. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Contracts successfully submitted.
    pub total_orders_placed: u64,
    /// Runs that reached the end of the pipeline.
    pub total_runs: u64,
    /// Runs stopped early by a leaderboard failure.
    pub aborted_runs: u64,
    pub order_submissions: u64,
    pub failed_submissions: u64,
    /// Contracts that would have been submitted in dry-run mode.
    pub simulated_orders: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one run's report into the totals.
    pub fn record_run(&mut self, report: &RunReport) {
        for order in &report.orders {
            match order.status {
                OrderStatus::Placed => {
                    self.order_submissions += 1;
                    self.total_orders_placed += u64::from(order.count);
                }
                OrderStatus::Failed => {
                    self.order_submissions += 1;
                    self.failed_submissions += 1;
                }
                OrderStatus::Simulated => {
                    self.simulated_orders += u64::from(order.count);
                }
                OrderStatus::Observed => {}
            }
        }

        match report.outcome {
            RunOutcome::Completed => self.total_runs += 1,
            RunOutcome::Aborted { .. } => self.aborted_runs += 1,
        }
    }
}

impl std::fmt::Display for SessionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Session Statistics ===")?;
        writeln!(f, "Runs Completed:   {}", self.total_runs)?;
        writeln!(f, "Runs Aborted:     {}", self.aborted_runs)?;
        writeln!(f, "Orders Placed:    {}", self.total_orders_placed)?;
        writeln!(
            f,
            "Submissions:      {} (Failed: {})",
            self.order_submissions, self.failed_submissions
        )?;
        writeln!(f, "Simulated Orders: {}", self.simulated_orders)?;
        Ok(())
    }
}
