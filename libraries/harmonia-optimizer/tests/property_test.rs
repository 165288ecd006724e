//! Property-based tests for chunk planning and bounded execution

use harmonia_optimizer::{plan_windows, run_bounded, ChunkingOptions, Indexed};
use proptest::prelude::*;
use std::cell::Cell;
use std::time::Duration;

const EPS: f64 = 1e-9;

struct Job {
    index: usize,
    delay_ms: u64,
}

impl Indexed for Job {
    fn index(&self) -> usize {
        self.index
    }
}

fn chunking() -> impl Strategy<Value = (f64, f64, f64)> {
    // 0 < overlap < size <= duration
    (1.0f64..60.0)
        .prop_flat_map(|size| (Just(size), 0.01f64..0.99, size..size * 40.0))
        .prop_map(|(size, ratio, duration)| (duration, size, size * ratio))
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    /// Property: windows cover [0, duration] without gaps and end exactly at duration
    #[test]
    fn windows_cover_source((duration, size, overlap) in chunking()) {
        let options = ChunkingOptions { chunk_size_secs: size, overlap_secs: overlap, max_concurrent: 1 };
        let windows = plan_windows(duration, &options).unwrap();

        prop_assert!(!windows.is_empty());
        prop_assert_eq!(windows[0].start_secs, 0.0);
        prop_assert_eq!(windows.last().unwrap().end_secs, duration);

        for (i, w) in windows.iter().enumerate() {
            prop_assert_eq!(w.index, i);
            prop_assert!(w.start_secs >= 0.0);
            prop_assert!(w.end_secs <= duration);
            prop_assert!(w.start_secs < w.end_secs);
        }

        for pair in windows.windows(2) {
            // No gap, and interior overlap is exactly `overlap`
            prop_assert!(pair[1].start_secs <= pair[0].end_secs + EPS);
            prop_assert!((pair[0].end_secs - pair[1].start_secs - overlap).abs() < 1e-6);
        }
    }

    /// Property: never more than `cap` tasks in flight; results in index order
    #[test]
    fn executor_respects_cap_and_order(
        delays in prop::collection::vec(0u64..50, 1..30),
        cap in 1usize..6
    ) {
        let cap = cap.min(delays.len());
        let jobs: Vec<Job> = delays
            .iter()
            .enumerate()
            .map(|(index, delay_ms)| Job { index, delay_ms: *delay_ms })
            .collect();

        let in_flight = Cell::new(0usize);
        let peak = Cell::new(0usize);

        let report = paused_runtime().block_on(run_bounded(
            jobs,
            cap,
            |job: Job| {
                let in_flight = &in_flight;
                let peak = &peak;
                async move {
                    in_flight.set(in_flight.get() + 1);
                    peak.set(peak.get().max(in_flight.get()));
                    tokio::time::sleep(Duration::from_millis(job.delay_ms)).await;
                    in_flight.set(in_flight.get() - 1);
                    Ok::<_, String>(job.index)
                }
            },
            |_| {},
        )).unwrap();

        prop_assert!(peak.get() <= cap);
        let expected: Vec<usize> = (0..delays.len()).collect();
        prop_assert_eq!(report.into_results().unwrap(), expected);
    }
}
