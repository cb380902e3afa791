use std::ops::ControlFlow;

use anyhow::Result;
use async_trait::async_trait;

/// Emit a progress line every this many targets.
const PROGRESS_EVERY: usize = 50;

/// Per-target work done by one worker: fetch one target and record its
/// outcome. `Err` is reserved for conditions that should stop the whole
/// run (the output file went away); `Break` abandons the rest of the
/// chunk after a record for the current target has been written.
#[async_trait]
pub trait TargetProcessor: Send {
    async fn process(&mut self, target: &str) -> Result<ControlFlow<()>>;
}

#[derive(Debug)]
pub struct WorkerReport {
    pub alias: String,
    pub processed: usize,
    pub abandoned: usize,
}

/// Run one credential's chunk, strictly in order, one recorded outcome
/// per processed target.
pub async fn run_chunk<P: TargetProcessor>(
    alias: &str,
    chunk: &[String],
    processor: &mut P,
) -> Result<WorkerReport> {
    let total = chunk.len();
    for (idx, target) in chunk.iter().enumerate() {
        if idx % PROGRESS_EVERY == 0 {
            tracing::info!(alias, idx, total, "progress");
        }
        if let ControlFlow::Break(()) = processor.process(target).await? {
            let processed = idx + 1;
            tracing::warn!(
                alias,
                abandoned = total - processed,
                "credential unusable, abandoning rest of chunk"
            );
            return Ok(WorkerReport {
                alias: alias.to_owned(),
                processed,
                abandoned: total - processed,
            });
        }
    }
    Ok(WorkerReport {
        alias: alias.to_owned(),
        processed: total,
        abandoned: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        seen: Vec<String>,
        break_on: Option<String>,
    }

    #[async_trait]
    impl TargetProcessor for Recorder {
        async fn process(&mut self, target: &str) -> Result<ControlFlow<()>> {
            self.seen.push(target.to_string());
            if self.break_on.as_deref() == Some(target) {
                return Ok(ControlFlow::Break(()));
            }
            Ok(ControlFlow::Continue(()))
        }
    }

    fn chunk(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn processes_targets_in_chunk_order() {
        let chunk = chunk(&["a", "b", "c"]);
        let mut recorder = Recorder { seen: Vec::new(), break_on: None };
        let report = run_chunk("acct", &chunk, &mut recorder).await.unwrap();
        assert_eq!(recorder.seen, chunk);
        assert_eq!(report.processed, 3);
        assert_eq!(report.abandoned, 0);
    }

    #[tokio::test]
    async fn break_abandons_the_rest() {
        let chunk = chunk(&["a", "b", "c", "d"]);
        let mut recorder = Recorder {
            seen: Vec::new(),
            break_on: Some("b".to_string()),
        };
        let report = run_chunk("acct", &chunk, &mut recorder).await.unwrap();
        assert_eq!(recorder.seen, vec!["a", "b"]);
        assert_eq!(report.processed, 2);
        assert_eq!(report.abandoned, 2);
    }
}
