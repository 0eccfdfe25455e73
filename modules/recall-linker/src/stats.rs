/// Stats from one driver run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub threads_seen: u32,
    pub threads_skipped: u32,
    pub threads_processed: u32,
    pub threads_failed: u32,
    /// Results (ground truth) or negatives written.
    pub items_written: u32,
    pub confident: u32,
    pub interrupted: bool,
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let heading = if self.interrupted { "Interrupted" } else { "Complete" };
        writeln!(f, "\n=== Run {heading} ===")?;
        writeln!(f, "Threads seen:      {}", self.threads_seen)?;
        writeln!(f, "Threads skipped:   {} (already done)", self.threads_skipped)?;
        writeln!(f, "Threads processed: {}", self.threads_processed)?;
        writeln!(f, "Threads failed:    {}", self.threads_failed)?;
        writeln!(f, "Items written:     {}", self.items_written)?;
        let total = self.items_written.max(1);
        writeln!(
            f,
            "Confident:         {} ({:.0}%)",
            self.confident,
            self.confident as f64 / total as f64 * 100.0
        )?;
        Ok(())
    }
}
