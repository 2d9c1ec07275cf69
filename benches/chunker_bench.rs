//! Chunking and container build throughput.
//!
//! Run with:
//!     cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::{rngs::StdRng, RngCore, SeedableRng};

use cdcfs::chunker::{ChunkBounds, FastCdc};
use cdcfs::{Writer, WriterOptions};

fn random_data(size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size];
    StdRng::seed_from_u64(42).fill_bytes(&mut data);
    data
}

fn bench_chunker(c: &mut Criterion) {
    let mut group = c.benchmark_group("fastcdc");
    let bounds = ChunkBounds::new(32 * 1024, 64 * 1024, 256 * 1024).unwrap();

    for size in [1024 * 1024, 16 * 1024 * 1024] {
        let data = random_data(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("random_{}mb", size / (1024 * 1024)), |b| {
            b.iter(|| black_box(FastCdc::new(black_box(&data), bounds).count()));
        });

        // No cut point ever matches, every chunk runs to the maximum.
        let zeros = vec![0u8; size];
        group.bench_function(format!("zeros_{}mb", size / (1024 * 1024)), |b| {
            b.iter(|| black_box(FastCdc::new(black_box(&zeros), bounds).count()));
        });
    }

    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    let data = random_data(8 * 1024 * 1024);
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.sample_size(10);

    for (name, no_zstd) in [("stored", true), ("zstd_3", false)] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let options = WriterOptions::default().with_no_zstd(no_zstd).with_compression_level(3);
                let mut writer = Writer::new(options).unwrap();
                writer.add_file(&data, "bench.bin").unwrap();
                let mut out = Vec::with_capacity(data.len() + 4096);
                black_box(writer.build(&mut out).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_chunker, bench_build);
criterion_main!(benches);
