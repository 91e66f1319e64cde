use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

const BATCH: usize = 1000;

/// Pool allocate/free throughput.
fn pool_alloc_free(size: usize) {
    for _ in 0..BATCH {
        let ptr = mempool::allocate(size).expect("pool allocation failed");
        unsafe { mempool::deallocate(ptr, size) };
    }
}

/// libc alloc/free throughput.
fn libc_malloc_free(size: usize) {
    for _ in 0..BATCH {
        unsafe {
            let ptr = libc::malloc(size);
            assert!(!ptr.is_null());
            libc::free(ptr);
        }
    }
}

fn benchmark_alloc_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_free");
    for size in [8usize, 64, 512, 4096] {
        group.throughput(Throughput::Elements(BATCH as u64));
        group.bench_with_input(BenchmarkId::new("mempool", size), &size, |b, &size| {
            b.iter(|| pool_alloc_free(size))
        });
        group.bench_with_input(BenchmarkId::new("libc", size), &size, |b, &size| {
            b.iter(|| libc_malloc_free(size))
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_alloc_throughput);
criterion_main!(benches);
