// benches/mpmc_sync.rs

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use strand::mpmc;

use std::thread;

const ITEMS_PER_PRODUCER: usize = 25_000;

fn run_pipeline(producers: usize, consumers: usize, capacity: usize) -> usize {
  let (tx, rx) = mpmc::channel::<usize>(capacity);

  let consumer_handles: Vec<_> = (0..consumers)
    .map(|_| {
      let rx = rx.clone();
      thread::spawn(move || {
        let mut count = 0usize;
        while rx.recv().is_ok() {
          count += 1;
        }
        count
      })
    })
    .collect();
  drop(rx);

  let producer_handles: Vec<_> = (0..producers)
    .map(|_| {
      let tx = tx.clone();
      thread::spawn(move || {
        for i in 0..ITEMS_PER_PRODUCER {
          tx.send(i).unwrap();
        }
      })
    })
    .collect();

  for handle in producer_handles {
    handle.join().unwrap();
  }
  tx.close();
  consumer_handles.into_iter().map(|h| h.join().unwrap()).sum()
}

fn bench_mpmc_contention(c: &mut Criterion) {
  let mut group = c.benchmark_group("mpmc_sync");

  for &(producers, consumers) in &[(2usize, 2usize), (4, 4)] {
    let total = producers * ITEMS_PER_PRODUCER;
    group.throughput(Throughput::Elements(total as u64));
    group.bench_function(format!("{}p_{}c_cap_256", producers, consumers), |b| {
      b.iter(|| black_box(run_pipeline(producers, consumers, 256)));
    });
  }
  group.finish();
}

criterion_group!(benches, bench_mpmc_contention);
criterion_main!(benches);
