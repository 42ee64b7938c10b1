use chrono::Utc;
use tempfile::tempdir;
use vigia_core::{
    Currency, Database, Monitor, OperationType, PendingFilter, PendingProperty, PendingStatus,
    Portal, PortalRegistry, Property, PropertyImage, PropertyKind, PropertyStatus,
    SavedSearchPatch, SavedSearchSpec,
};

fn sample_search(name: &str) -> SavedSearchSpec {
    SavedSearchSpec {
        name: name.to_string(),
        description: Some("Dos ambientes en Palermo".to_string()),
        portals: vec![Portal::Argenprop, Portal::Zonaprop],
        property_kind: Some(PropertyKind::Departamento),
        operation_type: OperationType::Venta,
        city: Some("Capital Federal".to_string()),
        neighborhoods: Some(vec!["Palermo".to_string()]),
        province: None,
        min_price: Some(80_000.0),
        max_price: Some(220_000.0),
        currency: Currency::Usd,
        min_area: None,
        max_area: None,
        min_bedrooms: Some(1),
        max_bedrooms: None,
        min_bathrooms: None,
        auto_scrape: false,
    }
}

fn sample_property(source_id: &str, price: f64) -> Property {
    let now = Utc::now();
    Property {
        id: None,
        source: Portal::Argenprop,
        source_id: Some(source_id.to_string()),
        source_url: Some(format!("https://example.com/argenprop/{source_id}")),
        kind: PropertyKind::Departamento,
        operation_type: OperationType::Venta,
        title: "Departamento 2 ambientes".to_string(),
        description: None,
        price,
        currency: Currency::Usd,
        price_per_sqm: None,
        address: None,
        neighborhood: Some("Palermo".to_string()),
        city: "Capital Federal".to_string(),
        province: "Buenos Aires".to_string(),
        latitude: None,
        longitude: None,
        covered_area: None,
        total_area: Some(50.0),
        bedrooms: Some(1),
        bathrooms: Some(1),
        parking_spaces: None,
        amenities: Vec::new(),
        agency: None,
        status: PropertyStatus::Active,
        scraped_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn queued_row(search_id: i64, source_id: &str) -> PendingProperty {
    let now = Utc::now();
    PendingProperty {
        id: None,
        saved_search_id: search_id,
        source: Portal::Argenprop,
        source_id: Some(source_id.to_string()),
        source_url: format!("https://example.com/argenprop/{source_id}"),
        title: Some("Departamento 2 ambientes".to_string()),
        price: Some(120_000.0),
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
}

#[tokio::test]
async fn test_catalog_survives_reopen() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("vigia.db");

    // Write a property with images and a price move through one handle
    let monitor = Monitor::new(Database::new(&db_path).await.unwrap(), PortalRegistry::new());
    let mut property = sample_property("rep-1", 150_000.0);
    monitor.db().insert_property(&mut property).await.unwrap();
    let property_id = property.id.unwrap();

    let mut image = PropertyImage {
        id: None,
        property_id,
        url: "https://img.example.com/rep-1.jpg".to_string(),
        is_primary: true,
        position: 0,
        created_at: Utc::now(),
    };
    monitor.db().insert_property_image(&mut image).await.unwrap();

    let observation = monitor
        .observe(property_id, 135_000.0, Currency::Usd, None)
        .await
        .unwrap();
    assert!(observation.price_changed());
    drop(monitor);

    // Open the same file again and verify everything is still there
    let reopened = Monitor::new(Database::new(&db_path).await.unwrap(), PortalRegistry::new());
    let loaded = reopened.get_property(property_id).await.unwrap();
    assert_eq!(loaded.price, 135_000.0);
    assert_eq!(loaded.source_id.as_deref(), Some("rep-1"));

    let images = reopened.get_property_images(property_id).await.unwrap();
    assert_eq!(images.len(), 1);
    assert!(images[0].is_primary);

    let history = reopened.get_price_history(property_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].price, 135_000.0);
    assert_eq!(history[0].previous_price, Some(150_000.0));
}

#[tokio::test]
async fn test_queue_state_survives_reopen() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("vigia.db");

    let monitor = Monitor::new(Database::new(&db_path).await.unwrap(), PortalRegistry::new());
    let search = monitor.create_saved_search(sample_search("palermo")).await.unwrap();
    let search_id = search.id.unwrap();

    // Queue two discoveries and park one of them
    let mut first = queued_row(search_id, "q-1");
    monitor.db().insert_pending(&mut first).await.unwrap();
    let mut second = queued_row(search_id, "q-2");
    monitor.db().insert_pending(&mut second).await.unwrap();
    monitor.skip_pending(second.id.unwrap()).await.unwrap();
    drop(monitor);

    let reopened = Monitor::new(Database::new(&db_path).await.unwrap(), PortalRegistry::new());
    let stats = reopened.pending_stats().await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.skipped, 1);

    let page = reopened
        .list_pending(&PendingFilter {
            search_id: Some(search_id),
            status: Some(PendingStatus::Pending),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].source_id.as_deref(), Some("q-1"));
}

#[tokio::test]
async fn test_search_edits_survive_reopen() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("vigia.db");

    let monitor = Monitor::new(Database::new(&db_path).await.unwrap(), PortalRegistry::new());
    let search = monitor.create_saved_search(sample_search("palermo")).await.unwrap();
    let search_id = search.id.unwrap();

    // Raise the budget, drop the city filter, then pause the search
    let patch = SavedSearchPatch {
        max_price: Some(Some(260_000.0)),
        city: Some(None),
        ..Default::default()
    };
    monitor.update_saved_search(search_id, patch).await.unwrap();
    monitor.set_search_active(search_id, false).await.unwrap();
    drop(monitor);

    let reopened = Monitor::new(Database::new(&db_path).await.unwrap(), PortalRegistry::new());
    let loaded = reopened.get_saved_search(search_id).await.unwrap();
    assert_eq!(loaded.max_price, Some(260_000.0));
    assert_eq!(loaded.city, None);
    assert_eq!(loaded.min_price, Some(80_000.0));
    assert!(!loaded.is_active);
    assert_eq!(loaded.portals, vec![Portal::Argenprop, Portal::Zonaprop]);

    // Only the paused search exists, so the active listing is empty
    let active = reopened.list_saved_searches(true).await.unwrap();
    assert!(active.is_empty());
}

fn main() {
    println!("Running integration tests...");
}
