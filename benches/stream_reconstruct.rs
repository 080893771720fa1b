//! Benchmarks for stream reconstruction throughput
//!
//! Measures scaling, event resolution and timestamping per emitted sample
//! with a sink that does nothing.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use f1stream::stream::{BatchItem, Reconstructor, SampleRun, merge_runs};
use f1stream::test_utils::sample_record_range;
use f1stream::{Montage, SampleSink};
use std::hint::black_box;

struct NullSink;

impl SampleSink for NullSink {
    fn push_sample(&mut self, sample: &[f32], timestamp: f64) -> f1stream::Result<()> {
        black_box((sample, timestamp));
        Ok(())
    }
}

fn run_for(montage: &Montage, rows: u32) -> SampleRun {
    let batch = vec![sample_record_range(0, rows, montage.channel_count())];
    match merge_runs(&batch).pop() {
        Some(BatchItem::Samples(run)) => run,
        _ => panic!("benchmark input must decode"),
    }
}

fn bench_reconstruct(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_reconstruct");

    for id in [0u32, 1] {
        let montage = Montage::by_id(id).expect("montage table");
        let run = run_for(montage, 500);
        group.throughput(Throughput::Elements(500));

        group.bench_function(BenchmarkId::new("one_second", montage.channel_count()), |b| {
            let mut reconstructor =
                Reconstructor::new(montage.channel_count(), montage.sampling_rate);
            let mut sink = NullSink;
            b.iter(|| reconstructor.process_run(black_box(&run), &mut sink))
        });

        group.bench_function(BenchmarkId::new("with_event", montage.channel_count()), |b| {
            let mut reconstructor =
                Reconstructor::new(montage.channel_count(), montage.sampling_rate);
            let mut sink = NullSink;
            b.iter(|| {
                let _ = reconstructor.on_event(br#"{"kind": 3, "lower": 250}"#);
                reconstructor.process_run(black_box(&run), &mut sink)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reconstruct);
criterion_main!(benches);
