// Ground-truth driver: per thread, resolve every mention on the solved path
// and persist the results as `<out>/<thread_id>.json`.
//
// Threads whose output already exists are skipped, so a rerun redoes no work.
// A failing thread is logged and skipped; an interrupt stops the run at once.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use recall_common::{ResolvedMention, Thread};
use tracing::{debug, error, info, warn};

use crate::interrupt::Interrupts;
use crate::output::{thread_output_path, write_json_atomic};
use crate::resolver::MentionResolver;
use crate::stats::RunStats;

pub struct GroundTruthDriver<'a> {
    resolver: &'a dyn MentionResolver,
    out_dir: PathBuf,
}

impl<'a> GroundTruthDriver<'a> {
    pub fn new(resolver: &'a dyn MentionResolver, out_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;
        Ok(Self {
            resolver,
            out_dir: out_dir.to_path_buf(),
        })
    }

    pub async fn run(&self, threads: &[Thread], interrupts: &mut Interrupts) -> Result<RunStats> {
        let mut stats = RunStats::default();
        for thread in threads {
            stats.threads_seen += 1;
            let path = thread_output_path(&self.out_dir, &thread.id);
            if path.exists() {
                debug!(thread_id = %thread.id, "ground truth: already done");
                stats.threads_skipped += 1;
                continue;
            }

            let extracted = tokio::select! {
                biased;
                _ = interrupts.next() => {
                    warn!(thread_id = %thread.id, "Keyboard interrupt! Stopping ground-truth run");
                    stats.interrupted = true;
                    return Ok(stats);
                }
                extracted = self.extract(thread) => extracted,
            };

            let rows = match extracted {
                Ok(rows) => rows,
                Err(e) => {
                    error!(thread_id = %thread.id, error = %e, "Some error occurred, skipping thread");
                    stats.threads_failed += 1;
                    continue;
                }
            };
            if let Err(e) = write_json_atomic(&path, &rows) {
                error!(thread_id = %thread.id, error = %e, "Failed to write results, skipping thread");
                stats.threads_failed += 1;
                continue;
            }

            info!(thread_id = %thread.id, "Found {} for {}", rows.len(), thread.id);
            stats.threads_processed += 1;
            stats.items_written += rows.len() as u32;
            stats.confident += rows.iter().filter(|r| r.result.is_confident()).count() as u32;
        }
        Ok(stats)
    }

    /// Results for every non-originator mention on the solved path.
    pub async fn extract(&self, thread: &Thread) -> recall_archive::Result<Vec<ResolvedMention>> {
        let mut rows = Vec::new();
        for mention in thread.solved_path_mentions() {
            if mention.is_original_poster {
                continue;
            }
            for result in self.resolver.resolve(&mention).await? {
                rows.push(ResolvedMention {
                    result,
                    utterance: mention.clone(),
                });
            }
        }
        Ok(rows)
    }
}
