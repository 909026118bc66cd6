use std::sync::Arc;

use chrono::Utc;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{DomainEventDispatcher, EventBus, PortfolioEvent, PortfolioId, StoreWriter};
use event_store::InMemoryEventStore;

fn building_event() -> PortfolioEvent {
    PortfolioEvent::building_created(
        "Tower",
        (1..=8).map(|n| format!("{n} Main St")).collect(),
    )
}

fn bench_envelope_encode(c: &mut Criterion) {
    let id = PortfolioId::generate();
    let event = building_event();

    c.bench_function("domain/envelope_encode", |b| {
        b.iter(|| event.to_envelope(id, Utc::now()).unwrap());
    });
}

fn bench_envelope_decode(c: &mut Criterion) {
    let envelope = building_event()
        .to_envelope(PortfolioId::generate(), Utc::now())
        .unwrap();

    c.bench_function("domain/envelope_decode", |b| {
        b.iter(|| PortfolioEvent::from_envelope(&envelope).unwrap());
    });
}

fn bench_dispatch_to_store(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let bus = EventBus::new().with_handler(Arc::new(StoreWriter::new(store)));
    let id = PortfolioId::generate();

    c.bench_function("domain/dispatch_to_store", |b| {
        b.iter(|| {
            rt.block_on(async {
                let envelope = PortfolioEvent::asset_created("Tower")
                    .to_envelope(id, Utc::now())
                    .unwrap();
                bus.dispatch(envelope).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_envelope_encode,
    bench_envelope_decode,
    bench_dispatch_to_store
);
criterion_main!(benches);
