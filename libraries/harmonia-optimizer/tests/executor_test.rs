//! Integration tests for chunk planning, chunk sizing and bounded execution

use harmonia_core::{AudioBuffer, AudioFormat, AudioSource, OptimizerSettings, SampleRate};
use harmonia_optimizer::{
    plan_chunks, process_in_chunks, run_bounded, AudioChunk, BoundedExecutor, ByteChunk,
    ChunkProcessingError, ChunkingOptions, OptimizerError, PerformanceMetrics, ResourceMonitor,
};
use std::cell::{Cell, RefCell};
use std::sync::Once;
use std::time::Duration;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

fn source(secs: usize, rate: u32) -> AudioSource {
    let frames = secs * rate as usize;
    let samples = (0..frames)
        .flat_map(|i| {
            let v = (i as f32 / frames as f32) - 0.5;
            [v, -v]
        })
        .collect();
    AudioSource::new(
        AudioBuffer::new(samples, AudioFormat::stereo_f32(SampleRate::new(rate))),
        2,
    )
}

fn options(size: f64, overlap: f64, max_concurrent: usize) -> ChunkingOptions {
    ChunkingOptions {
        chunk_size_secs: size,
        overlap_secs: overlap,
        max_concurrent,
    }
}

#[tokio::test(start_paused = true)]
async fn chunks_processed_out_of_order_reassemble_in_order() {
    init_tracing();
    let chunks = plan_chunks(&source(95, 200), &options(30.0, 2.0, 3)).unwrap();
    assert_eq!(chunks.len(), 4);

    let total = chunks.len();
    let report = run_bounded(
        chunks,
        3,
        |chunk: AudioChunk| async move {
            // Later chunks finish first
            let delay = (total - chunk.index) as u64 * 100;
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok::<_, String>((chunk.index, chunk.start_secs, chunk.end_secs))
        },
        |_| {},
    )
    .await
    .unwrap();

    let results = report.into_results().unwrap();
    assert_eq!(
        results,
        vec![
            (0, 0.0, 30.0),
            (1, 28.0, 60.0),
            (2, 58.0, 90.0),
            (3, 88.0, 95.0)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn in_flight_never_exceeds_cap() {
    let in_flight = Cell::new(0usize);
    let peak = Cell::new(0usize);
    let chunks = plan_chunks(&source(60, 100), &options(5.0, 1.0, 2)).unwrap();

    BoundedExecutor::new(2)
        .run(
            chunks,
            |chunk: AudioChunk| {
                let in_flight = &in_flight;
                let peak = &peak;
                async move {
                    in_flight.set(in_flight.get() + 1);
                    peak.set(peak.get().max(in_flight.get()));
                    tokio::time::sleep(Duration::from_millis(10 + (chunk.index as u64 % 3) * 7)).await;
                    in_flight.set(in_flight.get() - 1);
                    Ok::<_, String>(())
                }
            },
            |_| {},
        )
        .await
        .unwrap();

    assert_eq!(peak.get(), 2);
    assert_eq!(in_flight.get(), 0);
}

#[tokio::test(start_paused = true)]
async fn tasks_admitted_in_input_order() {
    let started = RefCell::new(Vec::new());
    let chunks = plan_chunks(&source(40, 50), &options(5.0, 0.0, 1)).unwrap();
    let expected: Vec<usize> = (0..chunks.len()).collect();

    run_bounded(
        chunks,
        1,
        |chunk: AudioChunk| {
            let started = &started;
            async move {
                started.borrow_mut().push(chunk.index);
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok::<_, String>(())
            }
        },
        |_| {},
    )
    .await
    .unwrap();

    assert_eq!(started.into_inner(), expected);
}

#[tokio::test]
async fn progress_reaches_exactly_one_hundred() {
    let chunks = plan_chunks(&source(70, 100), &options(10.0, 1.0, 3)).unwrap();
    let mut progress = Vec::new();

    run_bounded(
        chunks,
        3,
        |_chunk: AudioChunk| async { Ok::<_, String>(()) },
        |p| progress.push(p),
    )
    .await
    .unwrap();

    assert_eq!(progress.len(), 7);
    assert!(progress.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(*progress.last().unwrap(), 100.0);
}

#[tokio::test(start_paused = true)]
async fn failure_is_isolated_to_its_slot() {
    let completed = Cell::new(0usize);
    let chunks = plan_chunks(&source(50, 100), &options(10.0, 1.0, 2)).unwrap();

    let report = run_bounded(
        chunks,
        2,
        |chunk: AudioChunk| {
            let completed = &completed;
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                completed.set(completed.get() + 1);
                if chunk.index == 2 {
                    Err(format!("filter blew up at {}s", chunk.start_secs))
                } else {
                    Ok(chunk.samples().len())
                }
            }
        },
        |_| {},
    )
    .await
    .unwrap();

    // Every task ran; nothing was cancelled or retried
    assert_eq!(completed.get(), 5);
    assert!(!report.is_success());
    assert_eq!(
        report.failures(),
        vec![&ChunkProcessingError {
            index: 2,
            message: "filter blew up at 19s".to_string(),
        }]
    );
    assert!(report.outcomes()[1].is_ok());
    assert!(report.outcomes()[3].is_ok());

    let failures = report.into_results().unwrap_err();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].index, 2);
}

#[test]
fn monitor_recommendation_sizes_the_plan() {
    let monitor = ResourceMonitor::with_system_probe(OptimizerSettings::default());
    // 40 MB over 100 s: the default 10 MB recommendation is 25 s of audio
    let metrics = monitor.analyze_size(40 * 1024 * 1024);
    assert_eq!(metrics.recommended_chunk_size_mb, 10.0);

    let source = source(100, 20);
    let options = options(30.0, 2.0, 3).for_metrics(&metrics, source.duration_secs());
    assert!((options.chunk_size_secs - 25.0).abs() < 1e-9);

    let chunks = plan_chunks(&source, &options).unwrap();
    assert_eq!(chunks.len(), 4);
    assert_eq!(chunks[3].end_secs, 100.0);
}

#[tokio::test(start_paused = true)]
async fn payload_processed_in_recommended_pieces() {
    let data: Vec<u8> = (0..(5 * 1024 * 1024 / 2)).map(|i| (i % 253) as u8).collect();
    let metrics = PerformanceMetrics {
        file_size_mb: 2.5,
        recommended_chunk_size_mb: 1.0,
        ..PerformanceMetrics::default()
    };
    let mut progress = Vec::new();

    let report = process_in_chunks(
        &data,
        &metrics,
        2,
        |piece: ByteChunk| async move {
            // First piece finishes last
            let delay = if piece.index == 0 { 50 } else { 10 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok::<_, String>((piece.offset, piece.data))
        },
        |p| progress.push(p),
    )
    .await
    .unwrap();

    let pieces = report.into_results().unwrap();
    assert_eq!(
        pieces.iter().map(|(offset, _)| *offset).collect::<Vec<_>>(),
        vec![0, 1024 * 1024, 2 * 1024 * 1024]
    );
    let joined: Vec<u8> = pieces.into_iter().flat_map(|(_, bytes)| bytes).collect();
    assert_eq!(joined, data);

    assert_eq!(progress.len(), 3);
    assert!((progress[0] - 100.0 / 3.0).abs() < 1e-9);
    assert_eq!(progress[2], 100.0);
}

#[tokio::test]
async fn unusable_recommendation_is_rejected() {
    let metrics = PerformanceMetrics::default();
    let result = process_in_chunks(
        &[0u8; 16],
        &metrics,
        2,
        |_piece: ByteChunk| async { Ok::<_, String>(()) },
        |_| {},
    )
    .await;
    assert!(matches!(result, Err(OptimizerError::InvalidChunking(_))));
}
