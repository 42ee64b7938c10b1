use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fake::{Fake, Faker};
use rand::Rng;
use std::time::Duration;
use tokio::runtime::Runtime;
use vigia_core::{
    Currency, Database, OperationType, PendingProperty, PendingStatus, Portal, Property,
    PropertyKind, PropertyStatus, SavedSearch,
};

// Helper function to create a database with one search to hang rows on
async fn setup_db() -> (Database, i64) {
    let db = Database::open_in_memory().await.unwrap();
    let now = Utc::now();
    let mut search = SavedSearch {
        id: None,
        name: "benchmark".to_string(),
        description: None,
        portals: vec![Portal::Argenprop],
        property_kind: None,
        operation_type: OperationType::Venta,
        city: Some("Capital Federal".to_string()),
        neighborhoods: None,
        province: None,
        min_price: None,
        max_price: None,
        currency: Currency::Usd,
        min_area: None,
        max_area: None,
        min_bedrooms: None,
        max_bedrooms: None,
        min_bathrooms: None,
        auto_scrape: false,
        is_active: true,
        last_executed_at: None,
        total_executions: 0,
        total_properties_found: 0,
        created_at: now,
        updated_at: now,
    };
    db.insert_saved_search(&mut search).await.unwrap();
    (db, search.id.unwrap())
}

// Helper function to generate fake properties
fn fake_properties(count: usize) -> Vec<Property> {
    (0..count)
        .map(|i| {
            let now = Utc::now();
            Property {
                id: None,
                source: Portal::Argenprop,
                source_id: Some(format!("bench-{i}")),
                source_url: Some(format!("https://example.com/bench/{i}")),
                kind: PropertyKind::Departamento,
                operation_type: OperationType::Venta,
                title: Faker.fake(),
                description: Some(Faker.fake()),
                price: rand::thread_rng().gen_range(50_000.0..1_000_000.0),
                currency: Currency::Usd,
                price_per_sqm: None,
                address: Some(Faker.fake()),
                neighborhood: Some(Faker.fake()),
                city: "Capital Federal".to_string(),
                province: "Buenos Aires".to_string(),
                latitude: None,
                longitude: None,
                covered_area: Some(rand::thread_rng().gen_range(30.0..500.0)),
                total_area: None,
                bedrooms: Some(rand::thread_rng().gen_range(1..6)),
                bathrooms: Some(rand::thread_rng().gen_range(1..4)),
                parking_spaces: None,
                amenities: Vec::new(),
                agency: None,
                status: PropertyStatus::Active,
                scraped_at: None,
                created_at: now,
                updated_at: now,
            }
        })
        .collect()
}

// Helper function to generate fake queue rows
fn fake_pending(search_id: i64, count: usize) -> Vec<PendingProperty> {
    (0..count)
        .map(|i| {
            let now = Utc::now();
            PendingProperty {
                id: None,
                saved_search_id: search_id,
                source: Portal::Argenprop,
                source_id: Some(format!("bench-{i}")),
                source_url: format!("https://example.com/bench/{i}"),
                title: Some(Faker.fake()),
                price: Some(rand::thread_rng().gen_range(50_000.0..1_000_000.0)),
                currency: Some(Currency::Usd),
                thumbnail_url: None,
                location_preview: None,
                status: PendingStatus::Pending,
                error_message: None,
                property_id: None,
                discovered_at: now,
                scraped_at: None,
                updated_at: now,
            }
        })
        .collect()
}

fn bench_catalog_operations(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("catalog");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    // Benchmark property upserts
    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("upsert", size), size, |b, &size| {
            let properties = fake_properties(size);
            b.to_async(&rt).iter(|| async {
                let (db, _) = setup_db().await;
                for mut property in properties.clone() {
                    black_box(db.upsert_property(&mut property).await.unwrap());
                }
            });
        });
    }

    // Benchmark catalog listing
    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("list", size), size, |b, &size| {
            b.to_async(&rt).iter(|| async {
                let (db, _) = setup_db().await;
                for mut property in fake_properties(size) {
                    db.insert_property(&mut property).await.unwrap();
                }
                black_box(db.list_properties(None, None).await.unwrap());
            });
        });
    }

    group.finish();
}

fn bench_queue_operations(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("queue");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    // Benchmark queue intake
    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("enqueue", size), size, |b, &size| {
            b.to_async(&rt).iter(|| async {
                let (db, search_id) = setup_db().await;
                for mut row in fake_pending(search_id, size) {
                    black_box(db.insert_pending(&mut row).await.unwrap());
                }
            });
        });
    }

    // Benchmark the pending-to-scraped transition
    for size in [10, 100].iter() {
        group.bench_with_input(BenchmarkId::new("resolve", size), size, |b, &size| {
            b.to_async(&rt).iter(|| async {
                let (db, search_id) = setup_db().await;
                let mut ids = Vec::with_capacity(size);
                for mut row in fake_pending(search_id, size) {
                    db.insert_pending(&mut row).await.unwrap();
                    ids.push(row.id.unwrap());
                }
                let mut properties = fake_properties(size);
                for (row_id, property) in ids.iter().zip(properties.iter_mut()) {
                    db.insert_property(property).await.unwrap();
                    black_box(
                        db.mark_scraped(*row_id, property.id.unwrap(), Utc::now())
                            .await
                            .unwrap(),
                    );
                }
            });
        });
    }

    group.finish();
}

fn bench_concurrent_operations(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("concurrent");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    // Benchmark concurrent stat reads over a loaded queue
    for size in [10, 100].iter() {
        group.bench_with_input(BenchmarkId::new("stats", size), size, |b, &size| {
            b.to_async(&rt).iter(|| async {
                let (db, search_id) = setup_db().await;
                for mut row in fake_pending(search_id, 100) {
                    db.insert_pending(&mut row).await.unwrap();
                }
                let futures: Vec<_> = (0..size).map(|_| db.pending_stats()).collect();
                black_box(futures::future::join_all(futures).await);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_catalog_operations,
    bench_queue_operations,
    bench_concurrent_operations
);

criterion_main!(benches);
