mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use vigia_core::{MonitorConfig, PendingFilter, PendingStatus, Portal, PortalError, VigiaError};

#[tokio::test]
async fn test_execute_walks_pages_and_queues_candidates() {
    let stub = Arc::new(
        StubPortal::new(Portal::Argenprop)
            .with_page(
                1,
                Ok(page_of(
                    vec![
                        candidate(Portal::Argenprop, "1001"),
                        candidate(Portal::Argenprop, "1002"),
                    ],
                    true,
                )),
            )
            .with_page(
                2,
                Ok(page_of(vec![candidate(Portal::Argenprop, "1003")], false)),
            ),
    );
    let monitor = monitor_with(vec![stub]).await;
    let search_id = create_search(&monitor, "deptos", vec![Portal::Argenprop]).await;

    let summary = monitor.execute_search(search_id, None).await.unwrap();

    assert_eq!(summary.total_found, 3);
    assert_eq!(summary.new_properties, 3);
    assert_eq!(summary.duplicates, 0);
    assert_eq!(summary.scraped, 0);
    assert_eq!(summary.pending, 3);
    assert!(summary.errors.is_empty());

    let search = monitor.get_saved_search(search_id).await.unwrap();
    assert_eq!(search.total_executions, 1);
    assert_eq!(search.total_properties_found, 3);
    assert!(search.last_executed_at.is_some());

    let page = monitor.list_pending(&PendingFilter::default()).await.unwrap();
    assert_eq!(page.total, 3);
    assert!(page
        .items
        .iter()
        .all(|row| row.status == PendingStatus::Pending && row.saved_search_id == search_id));
}

#[tokio::test]
async fn test_second_run_classifies_duplicates() {
    let stub = Arc::new(StubPortal::new(Portal::Argenprop).with_page(
        1,
        Ok(page_of(
            vec![
                candidate(Portal::Argenprop, "1001"),
                candidate(Portal::Argenprop, "1002"),
            ],
            false,
        )),
    ));
    let monitor = monitor_with(vec![stub]).await;
    let search_id = create_search(&monitor, "deptos", vec![Portal::Argenprop]).await;

    monitor.execute_search(search_id, None).await.unwrap();
    let second = monitor.execute_search(search_id, None).await.unwrap();

    assert_eq!(second.total_found, 2);
    assert_eq!(second.new_properties, 0);
    assert_eq!(second.duplicates, 2);

    let page = monitor.list_pending(&PendingFilter::default()).await.unwrap();
    assert_eq!(page.total, 2);

    // Counters only accumulate what was new.
    let search = monitor.get_saved_search(search_id).await.unwrap();
    assert_eq!(search.total_executions, 2);
    assert_eq!(search.total_properties_found, 2);
}

#[tokio::test]
async fn test_dedup_matches_source_id_across_url_changes() {
    let stub = Arc::new(StubPortal::new(Portal::Argenprop).with_page(
        1,
        Ok(page_of(
            vec![
                candidate(Portal::Argenprop, "1001"),
                candidate_at(
                    Portal::Argenprop,
                    "https://example.com/argenprop/palermo-2amb?utm_source=mail",
                ),
            ],
            false,
        )),
    ));
    let monitor = monitor_with(vec![Arc::clone(&stub)]).await;
    let search_id = create_search(&monitor, "deptos", vec![Portal::Argenprop]).await;

    let first = monitor.execute_search(search_id, None).await.unwrap();
    assert_eq!(first.new_properties, 2);

    // Same listing id under a new slug, and the same un-idd URL with
    // different tracking noise.
    let mut moved = candidate(Portal::Argenprop, "1001");
    moved.source_url = "https://example.com/argenprop/otra-calle-1001".to_string();
    stub.set_page(
        1,
        Ok(page_of(
            vec![
                moved,
                candidate_at(
                    Portal::Argenprop,
                    "https://example.com/argenprop/palermo-2amb#fotos",
                ),
            ],
            false,
        )),
    );

    let second = monitor.execute_search(search_id, None).await.unwrap();
    assert_eq!(second.new_properties, 0);
    assert_eq!(second.duplicates, 2);

    let page = monitor.list_pending(&PendingFilter::default()).await.unwrap();
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn test_known_property_dedup_is_global_queue_dedup_is_scoped() {
    let url = candidate_url(Portal::Argenprop, "9001");
    let stub = Arc::new(
        StubPortal::new(Portal::Argenprop)
            .with_page(1, Ok(page_of(vec![candidate(Portal::Argenprop, "9001")], false)))
            .with_detail(&url, Ok(detail_with_price(120_000.0))),
    );
    let monitor = monitor_with(vec![stub]).await;
    let first_search = create_search(&monitor, "palermo", vec![Portal::Argenprop]).await;
    let second_search = create_search(&monitor, "belgrano", vec![Portal::Argenprop]).await;

    // Each search queues its own copy of the listing.
    assert_eq!(monitor.execute_search(first_search, None).await.unwrap().new_properties, 1);
    assert_eq!(monitor.execute_search(second_search, None).await.unwrap().new_properties, 1);

    let filter = PendingFilter {
        search_id: Some(first_search),
        ..Default::default()
    };
    let row_id = monitor.list_pending(&filter).await.unwrap().items[0].id.unwrap();
    monitor.scrape_single(row_id).await.unwrap();

    // Once promoted, the listing is known catalog-wide.
    let again_first = monitor.execute_search(first_search, None).await.unwrap();
    assert_eq!(again_first.new_properties, 0);
    assert_eq!(again_first.duplicates, 1);

    let again_second = monitor.execute_search(second_search, None).await.unwrap();
    assert_eq!(again_second.new_properties, 0);
    assert_eq!(again_second.duplicates, 1);
}

#[tokio::test]
async fn test_portal_error_keeps_other_portals_results() {
    let broken = Arc::new(StubPortal::new(Portal::Argenprop).with_page(
        1,
        Err(PortalError::transient(Portal::Argenprop, "connect timeout")),
    ));
    let healthy = Arc::new(StubPortal::new(Portal::Zonaprop).with_page(
        1,
        Ok(page_of(
            vec![
                candidate(Portal::Zonaprop, "41000001"),
                candidate(Portal::Zonaprop, "41000002"),
            ],
            false,
        )),
    ));
    let monitor = monitor_with(vec![broken, healthy]).await;
    let search_id = create_search(
        &monitor,
        "ambos",
        vec![Portal::Argenprop, Portal::Zonaprop],
    )
    .await;

    let summary = monitor.execute_search(search_id, None).await.unwrap();

    assert_eq!(summary.total_found, 2);
    assert_eq!(summary.new_properties, 2);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].portal, Portal::Argenprop);
    assert!(summary.errors[0].message.contains("connect timeout"));
}

#[tokio::test]
async fn test_later_page_failure_keeps_collected() {
    let stub = Arc::new(
        StubPortal::new(Portal::Argenprop)
            .with_page(
                1,
                Ok(page_of(
                    vec![
                        candidate(Portal::Argenprop, "1001"),
                        candidate(Portal::Argenprop, "1002"),
                    ],
                    true,
                )),
            )
            .with_page(2, Err(PortalError::transient(Portal::Argenprop, "HTTP 503"))),
    );
    let monitor = monitor_with(vec![stub]).await;
    let search_id = create_search(&monitor, "deptos", vec![Portal::Argenprop]).await;

    let summary = monitor.execute_search(search_id, None).await.unwrap();

    assert_eq!(summary.total_found, 2);
    assert_eq!(summary.new_properties, 2);
    assert_eq!(summary.errors.len(), 1);
}

#[tokio::test]
async fn test_pagination_stops_at_empty_page() {
    let stub = Arc::new(
        StubPortal::new(Portal::Argenprop)
            .with_page(
                1,
                Ok(page_of(vec![candidate(Portal::Argenprop, "1001")], true)),
            )
            // A page that claims more but delivers nothing ends the walk.
            .with_page(2, Ok(page_of(vec![], true))),
    );
    let monitor = monitor_with(vec![stub]).await;
    let search_id = create_search(&monitor, "deptos", vec![Portal::Argenprop]).await;

    let summary = monitor.execute_search(search_id, None).await.unwrap();

    assert_eq!(summary.total_found, 1);
    assert!(summary.errors.is_empty());
}

#[tokio::test]
async fn test_pagination_respects_page_cap() {
    let mut stub = StubPortal::new(Portal::Argenprop);
    for page in 1..=5 {
        stub = stub.with_page(
            page,
            Ok(page_of(
                vec![candidate(Portal::Argenprop, &format!("10{page:02}"))],
                true,
            )),
        );
    }
    let config = MonitorConfig {
        max_pages_per_portal: 2,
        ..fast_config()
    };
    let monitor = monitor_with_config(vec![Arc::new(stub)], config).await;
    let search_id = create_search(&monitor, "deptos", vec![Portal::Argenprop]).await;

    let summary = monitor.execute_search(search_id, None).await.unwrap();

    assert_eq!(summary.total_found, 2);
    assert!(summary.errors.is_empty());
}

#[tokio::test]
async fn test_max_properties_caps_examination() {
    let stub = Arc::new(
        StubPortal::new(Portal::Argenprop)
            .with_page(
                1,
                Ok(page_of(
                    vec![
                        candidate(Portal::Argenprop, "1001"),
                        candidate(Portal::Argenprop, "1002"),
                        candidate(Portal::Argenprop, "1003"),
                    ],
                    true,
                )),
            )
            // Walking past the cap would surface as a recorded error.
            .with_page(2, Err(PortalError::transient(Portal::Argenprop, "HTTP 503"))),
    );
    let monitor = monitor_with(vec![stub]).await;
    let search_id = create_search(&monitor, "deptos", vec![Portal::Argenprop]).await;

    let summary = monitor.execute_search(search_id, Some(2)).await.unwrap();

    assert_eq!(summary.total_found, 2);
    assert_eq!(summary.new_properties, 2);
    assert!(summary.errors.is_empty());

    let page = monitor.list_pending(&PendingFilter::default()).await.unwrap();
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn test_max_properties_spans_portals() {
    let argenprop = Arc::new(StubPortal::new(Portal::Argenprop).with_page(
        1,
        Ok(page_of(
            vec![
                candidate(Portal::Argenprop, "1001"),
                candidate(Portal::Argenprop, "1002"),
            ],
            false,
        )),
    ));
    let zonaprop = Arc::new(StubPortal::new(Portal::Zonaprop).with_page(
        1,
        Ok(page_of(
            vec![
                candidate(Portal::Zonaprop, "41000001"),
                candidate(Portal::Zonaprop, "41000002"),
            ],
            false,
        )),
    ));
    let monitor = monitor_with(vec![argenprop, zonaprop]).await;
    let search_id = create_search(
        &monitor,
        "ambos",
        vec![Portal::Argenprop, Portal::Zonaprop],
    )
    .await;

    let summary = monitor.execute_search(search_id, Some(3)).await.unwrap();

    assert_eq!(summary.total_found, 3);
    assert_eq!(summary.new_properties, 3);
}

#[tokio::test]
async fn test_urlless_candidate_is_reported_not_queued() {
    let stub = Arc::new(StubPortal::new(Portal::Argenprop).with_page(
        1,
        Ok(page_of(
            vec![
                candidate(Portal::Argenprop, "1001"),
                candidate_at(Portal::Argenprop, ""),
            ],
            false,
        )),
    ));
    let monitor = monitor_with(vec![stub]).await;
    let search_id = create_search(&monitor, "deptos", vec![Portal::Argenprop]).await;

    let summary = monitor.execute_search(search_id, None).await.unwrap();

    assert_eq!(summary.total_found, 2);
    assert_eq!(summary.new_properties, 1);
    assert_eq!(summary.duplicates, 0);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].message.contains("no url"));

    let page = monitor.list_pending(&PendingFilter::default()).await.unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_search_page_timeout_counts_as_portal_error() {
    let stub = Arc::new(
        StubPortal::new(Portal::Argenprop)
            .with_page(
                1,
                Ok(page_of(vec![candidate(Portal::Argenprop, "1001")], false)),
            )
            .with_search_delay(Duration::from_millis(250)),
    );
    let config = MonitorConfig {
        search_timeout: Duration::from_millis(50),
        ..fast_config()
    };
    let monitor = monitor_with_config(vec![stub], config).await;
    let search_id = create_search(&monitor, "deptos", vec![Portal::Argenprop]).await;

    let summary = monitor.execute_search(search_id, None).await.unwrap();

    assert_eq!(summary.total_found, 0);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].message.contains("timed out"));
}

#[tokio::test]
async fn test_direct_run_ignores_active_flag_execute_all_honors_it() {
    let stub = Arc::new(StubPortal::new(Portal::Argenprop).with_page(
        1,
        Ok(page_of(vec![candidate(Portal::Argenprop, "1001")], false)),
    ));
    let monitor = monitor_with(vec![stub]).await;
    let search_id = create_search(&monitor, "pausada", vec![Portal::Argenprop]).await;
    monitor.set_search_active(search_id, false).await.unwrap();

    assert!(monitor.execute_all(None).await.unwrap().is_empty());

    let summary = monitor.execute_search(search_id, None).await.unwrap();
    assert_eq!(summary.new_properties, 1);
}

#[tokio::test]
async fn test_execute_all_covers_every_active_search() {
    let stub = Arc::new(StubPortal::new(Portal::Argenprop).with_page(
        1,
        Ok(page_of(vec![candidate(Portal::Argenprop, "1001")], false)),
    ));
    let monitor = monitor_with(vec![stub]).await;
    let first = create_search(&monitor, "uno", vec![Portal::Argenprop]).await;
    let second = create_search(&monitor, "dos", vec![Portal::Argenprop]).await;
    let paused = create_search(&monitor, "tres", vec![Portal::Argenprop]).await;
    monitor.set_search_active(paused, false).await.unwrap();

    let summaries = monitor.execute_all(None).await.unwrap();

    let ids: Vec<i64> = summaries.iter().map(|s| s.search_id).collect();
    assert_eq!(ids, vec![first, second]);
}

#[tokio::test]
async fn test_missing_adapter_is_reported() {
    let monitor = monitor_with(vec![]).await;
    let search_id = create_search(&monitor, "remax", vec![Portal::Remax]).await;

    let summary = monitor.execute_search(search_id, None).await.unwrap();

    assert_eq!(summary.total_found, 0);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].message.contains("no adapter registered"));
}

#[tokio::test]
async fn test_execute_missing_search_is_not_found() {
    let monitor = monitor_with(vec![]).await;
    assert!(matches!(
        monitor.execute_search(404, None).await,
        Err(VigiaError::NotFound("saved search", 404))
    ));
}

#[tokio::test]
async fn test_auto_scrape_promotes_and_tallies() {
    let first_url = candidate_url(Portal::Argenprop, "1001");
    let second_url = candidate_url(Portal::Argenprop, "1002");
    let stub = Arc::new(
        StubPortal::new(Portal::Argenprop)
            .with_page(
                1,
                Ok(page_of(
                    vec![
                        candidate(Portal::Argenprop, "1001"),
                        candidate(Portal::Argenprop, "1002"),
                    ],
                    false,
                )),
            )
            .with_detail(&first_url, Ok(detail_with_price(120_000.0)))
            .with_detail(&second_url, Ok(detail_with_price(95_000.0))),
    );
    let monitor = monitor_with(vec![stub]).await;
    let mut spec = search_spec("con auto", vec![Portal::Argenprop]);
    spec.auto_scrape = true;
    let search_id = monitor.create_saved_search(spec).await.unwrap().id.unwrap();

    let summary = monitor.execute_search(search_id, None).await.unwrap();

    assert_eq!(summary.new_properties, 2);
    assert_eq!(summary.scraped, 2);
    assert_eq!(summary.pending, 0);

    assert_eq!(monitor.list_properties(None, None).await.unwrap().total, 2);
    let page = monitor.list_pending(&PendingFilter::default()).await.unwrap();
    assert!(page
        .items
        .iter()
        .all(|row| row.status == PendingStatus::Scraped && row.property_id.is_some()));
}

#[tokio::test]
async fn test_auto_scrape_counts_failures() {
    let good_url = candidate_url(Portal::Argenprop, "1001");
    let bad_url = candidate_url(Portal::Argenprop, "1002");
    let stub = Arc::new(
        StubPortal::new(Portal::Argenprop)
            .with_page(
                1,
                Ok(page_of(
                    vec![
                        candidate(Portal::Argenprop, "1001"),
                        candidate(Portal::Argenprop, "1002"),
                    ],
                    false,
                )),
            )
            .with_detail(&good_url, Ok(detail_with_price(120_000.0)))
            .with_detail(
                &bad_url,
                Err(PortalError::transient(Portal::Argenprop, "HTTP 503")),
            ),
    );
    let monitor = monitor_with(vec![stub]).await;
    let mut spec = search_spec("con auto", vec![Portal::Argenprop]);
    spec.auto_scrape = true;
    let search_id = monitor.create_saved_search(spec).await.unwrap().id.unwrap();

    let summary = monitor.execute_search(search_id, None).await.unwrap();

    assert_eq!(summary.scraped, 1);
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.errors.len(), 1);

    let filter = PendingFilter {
        status: Some(PendingStatus::Error),
        ..Default::default()
    };
    let errored = monitor.list_pending(&filter).await.unwrap();
    assert_eq!(errored.total, 1);
    assert_eq!(errored.items[0].source_url, bad_url);
}

#[tokio::test]
async fn test_auto_scrape_cap_limits_batch() {
    let mut stub = StubPortal::new(Portal::Argenprop).with_page(
        1,
        Ok(page_of(
            vec![
                candidate(Portal::Argenprop, "1001"),
                candidate(Portal::Argenprop, "1002"),
                candidate(Portal::Argenprop, "1003"),
            ],
            false,
        )),
    );
    for id in ["1001", "1002", "1003"] {
        stub = stub.with_detail(&candidate_url(Portal::Argenprop, id), Ok(detail_with_price(100_000.0)));
    }
    let config = MonitorConfig {
        auto_scrape_cap: Some(1),
        ..fast_config()
    };
    let monitor = monitor_with_config(vec![Arc::new(stub)], config).await;
    let mut spec = search_spec("con tope", vec![Portal::Argenprop]);
    spec.auto_scrape = true;
    let search_id = monitor.create_saved_search(spec).await.unwrap().id.unwrap();

    let summary = monitor.execute_search(search_id, None).await.unwrap();

    assert_eq!(summary.new_properties, 3);
    assert_eq!(summary.scraped, 1);
    assert_eq!(summary.pending, 2);

    let filter = PendingFilter {
        status: Some(PendingStatus::Pending),
        ..Default::default()
    };
    assert_eq!(monitor.list_pending(&filter).await.unwrap().total, 2);
}
