// Negative-candidate miner: resolve every mention in the whole reply forest and
// keep every candidate found, confident or not, as `<out>/<thread_id>.json`.
//
// An interrupt abandons the current thread. A second interrupt within the
// grace window ends the run; otherwise mining continues with the next thread.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use recall_common::{NegativeSet, Thread};
use tracing::{debug, error, info, warn};

use crate::interrupt::Interrupts;
use crate::output::{thread_output_path, write_json_atomic};
use crate::resolver::MentionResolver;
use crate::stats::RunStats;

pub struct NegativeMiner<'a> {
    resolver: &'a dyn MentionResolver,
    out_dir: PathBuf,
    grace: Duration,
}

impl<'a> NegativeMiner<'a> {
    pub fn new(resolver: &'a dyn MentionResolver, out_dir: &Path, grace: Duration) -> Result<Self> {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;
        Ok(Self {
            resolver,
            out_dir: out_dir.to_path_buf(),
            grace,
        })
    }

    pub async fn run(&self, threads: &[Thread], interrupts: &mut Interrupts) -> Result<RunStats> {
        let mut stats = RunStats::default();
        for thread in threads {
            stats.threads_seen += 1;
            let path = thread_output_path(&self.out_dir, &thread.id);
            if path.exists() {
                debug!(thread_id = %thread.id, "negatives: already done");
                stats.threads_skipped += 1;
                continue;
            }

            let mined = tokio::select! {
                biased;
                _ = interrupts.next() => None,
                mined = self.find_negatives(thread) => Some(mined),
            };
            let Some(mined) = mined else {
                warn!(
                    thread_id = %thread.id,
                    grace_secs = self.grace.as_secs(),
                    "Keyboard interrupt! Press again to quit"
                );
                if interrupts.confirmed_within(self.grace).await {
                    warn!("Keyboard interrupt x2... Quitting");
                    stats.interrupted = true;
                    return Ok(stats);
                }
                continue;
            };

            let (negatives, confident) = match mined {
                Ok(mined) => mined,
                Err(e) => {
                    error!(thread_id = %thread.id, error = %e, "Some error occurred, skipping thread");
                    stats.threads_failed += 1;
                    continue;
                }
            };
            if let Err(e) = write_json_atomic(&path, &negatives) {
                error!(thread_id = %thread.id, error = %e, "Failed to write negatives, skipping thread");
                stats.threads_failed += 1;
                continue;
            }

            info!(thread_id = %thread.id, "Found {} for {}", negatives.negatives.len(), thread.id);
            stats.threads_processed += 1;
            stats.items_written += negatives.negatives.len() as u32;
            stats.confident += confident;
        }
        Ok(stats)
    }

    /// Every candidate behind any link in the thread, plus how many of them
    /// resolved confidently.
    pub async fn find_negatives(&self, thread: &Thread) -> recall_archive::Result<(NegativeSet, u32)> {
        let mut negatives = Vec::new();
        let mut confident = 0;
        for mention in thread.forest_mentions() {
            if mention.is_original_poster {
                continue;
            }
            for result in self.resolver.resolve(&mention).await? {
                if result.is_confident() {
                    confident += 1;
                }
                if let Some(candidate) = result.into_candidate() {
                    negatives.push(candidate);
                }
            }
        }
        Ok((NegativeSet { negatives }, confident))
    }
}
