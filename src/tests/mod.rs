use std::sync::Arc;

use tokio::sync::oneshot;

use crate::client::fake::{page, product, user, FakeSource};
use crate::client::{ClientError, CollectionSource, RemoteQuery};
use crate::context::{AppContext, Options};
use crate::filter::{FilterField, SearchMode};
use crate::model::{CollectionKind, PageResult, PageSize, Record};
use crate::pagination::PageSlot;
use crate::store::FetchOutcome;
use crate::view::Navigation;

fn users(ids: std::ops::Range<u64>) -> Vec<Record> {
    ids.map(|id| {
        let gender = if id % 2 == 0 { "female" } else { "male" };
        user(id, &format!("User{id}"), "Smith", 20 + id as u32, gender)
    })
    .collect()
}

fn users_page(ids: std::ops::Range<u64>, total: u64) -> PageResult {
    page(users(ids), total)
}

fn context_with(fake: &Arc<FakeSource>, options: Options) -> AppContext {
    let source: Arc<dyn CollectionSource> = fake.clone();
    AppContext::with_source(options, source).unwrap()
}

fn ids(rows: &[Record]) -> Vec<u64> {
    rows.iter().map(Record::id).collect()
}

#[tokio::test]
async fn browsing_users_end_to_end() {
    let fake = Arc::new(FakeSource::new());
    fake.push_page(CollectionKind::Users, Ok(users_page(1..6, 100)));
    fake.push_page(CollectionKind::Users, Ok(users_page(46..51, 100)));
    let ctx = context_with(&fake, Options::default());
    let mut view = ctx.view(CollectionKind::Users);

    assert!(view.mount().await.is_applied());
    assert_eq!(view.paginator().total_pages(), 20);
    assert_eq!(ids(view.rows()), vec![1, 2, 3, 4, 5]);

    assert!(matches!(
        view.go_to_page(10).await,
        Navigation::Fetched(FetchOutcome::Applied)
    ));
    assert_eq!(fake.last_page_call().map(|(_, r)| r.skip()), Some(45));
    assert_eq!(
        view.window(),
        vec![
            PageSlot::Page(1),
            PageSlot::Ellipsis,
            PageSlot::Page(8),
            PageSlot::Page(9),
            PageSlot::Page(10),
            PageSlot::Page(11),
            PageSlot::Page(12),
            PageSlot::Ellipsis,
            PageSlot::Page(20),
        ]
    );
    assert_eq!(view.paginator().item_range(), Some((46, 50)));

    assert_eq!(view.go_to_page(21).await, Navigation::Ignored);
    assert_eq!(view.paginator().current_page(), 10);
    assert_eq!(fake.page_call_count(), 2);
}

#[tokio::test]
async fn search_and_remote_filter_compose() {
    let fake = Arc::new(FakeSource::new());
    fake.push_page(CollectionKind::Users, Ok(users_page(1..6, 30)));
    fake.push_query(Ok(vec![
        user(3, "User3", "Smith", 23, "female"),
        user(13, "User13", "Smith", 33, "female"),
        user(23, "Ada", "Byron", 36, "female"),
    ]));
    let ctx = context_with(&fake, Options::default());
    let mut view = ctx.view(CollectionKind::Users);
    view.mount().await;

    view.search("USER3").await;
    assert_eq!(ids(view.rows()), vec![3]);

    view.set_filter(FilterField::Gender, "female").await.unwrap();
    assert!(matches!(
        fake.last_query(),
        Some((CollectionKind::Users, RemoteQuery::Field { ref key, ref value }))
            if key == "gender" && value == "female"
    ));
    // The search term survives a structured filter and narrows the API answer.
    assert_eq!(ids(view.rows()), vec![3]);

    view.search("").await;
    assert_eq!(ids(view.rows()), vec![3, 13, 23]);

    view.clear_filters().await;
    assert_eq!(ids(view.rows()), vec![1, 2, 3, 4, 5]);
    assert!(!view.filters().has_structured_filters());
}

#[tokio::test]
async fn numeric_search_is_exact() {
    let fake = Arc::new(FakeSource::new());
    fake.push_page(
        CollectionKind::Products,
        Ok(page(
            vec![
                product(1, "Mascara", "Essence", "beauty", 5, 4.9),
                product(2, "Powder", "Velvet", "beauty", 50, 3.5),
            ],
            2,
        )),
    );
    let ctx = context_with(&fake, Options::default());
    let mut view = ctx.view(CollectionKind::Products);
    view.mount().await;

    view.search("5").await;
    assert_eq!(ids(view.rows()), vec![1]);
    view.search("3.5").await;
    assert_eq!(ids(view.rows()), vec![2]);
}

#[tokio::test]
async fn category_filter_can_hide_pagination() {
    let fake = Arc::new(FakeSource::new());
    fake.push_page(
        CollectionKind::Products,
        Ok(page(vec![product(1, "Mascara", "Essence", "beauty", 10, 4.5)], 194)),
    );
    fake.push_query(Ok(vec![
        product(31, "Lamp", "Lumen", "home-decoration", 4, 4.0),
        product(32, "Vase", "Lumen", "home-decoration", 9, 3.9),
    ]));
    let options = Options {
        suppress_pagination_when_filtered: true,
        ..Options::default()
    };
    let ctx = context_with(&fake, options);
    let mut view = ctx.view(CollectionKind::Products);
    view.mount().await;
    assert!(view.show_pagination());
    view.search("mascara").await;
    assert!(view.show_pagination());
    view.search("").await;

    view.set_filter(FilterField::Category, "home-decoration")
        .await
        .unwrap();
    assert_eq!(
        fake.last_query(),
        Some((
            CollectionKind::Products,
            RemoteQuery::Category("home-decoration".to_string())
        ))
    );
    assert_eq!(ids(view.rows()), vec![31, 32]);
    assert!(!view.show_pagination());

    view.set_filter(FilterField::Brand, "lum").await.unwrap();
    // Exclusive filters: the brand filter replaced the category one.
    assert_eq!(view.filters().filter(FilterField::Category), None);
    assert!(view.rows().is_empty());
}

#[tokio::test]
async fn failed_fetch_keeps_last_good_page() {
    let fake = Arc::new(FakeSource::new());
    fake.push_page(CollectionKind::Users, Ok(users_page(1..6, 23)));
    fake.push_page(
        CollectionKind::Users,
        Err(ClientError::Status {
            status: 503,
            body: "unavailable".to_string(),
        }),
    );
    let ctx = context_with(&fake, Options::default());
    let mut view = ctx.view(CollectionKind::Users);
    view.mount().await;

    let nav = view.next_page().await;
    assert!(matches!(
        nav,
        Navigation::Fetched(FetchOutcome::Failed(ClientError::Status { status: 503, .. }))
    ));
    assert_eq!(view.paginator().current_page(), 1);
    assert_eq!(view.paginator().total_items(), 23);
    assert_eq!(ids(view.rows()), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn stale_page_never_overwrites_newer_one() {
    let fake = Arc::new(FakeSource::new());
    let (release_slow, slow_gate) = oneshot::channel();
    fake.push_page_gated(CollectionKind::Users, Ok(users_page(6..11, 23)), Some(slow_gate));
    fake.push_page(CollectionKind::Users, Ok(users_page(11..16, 23)));
    let options = Options {
        cancel_superseded_fetches: false,
        ..Options::default()
    };
    let ctx = context_with(&fake, options);
    let store = ctx.store();

    let slow_store = Arc::clone(&store);
    let slow = tokio::spawn(async move {
        slow_store
            .fetch_collection(CollectionKind::Users, 2, PageSize::Five)
            .await
    });
    while fake.page_call_count() < 1 {
        tokio::task::yield_now().await;
    }
    let fast = store
        .fetch_collection(CollectionKind::Users, 3, PageSize::Five)
        .await;
    assert_eq!(fast, FetchOutcome::Applied);

    let _ = release_slow.send(());
    assert_eq!(slow.await.unwrap(), FetchOutcome::Superseded);

    let snapshot = store.snapshot(CollectionKind::Users).await;
    assert_eq!(ids(&snapshot.records), vec![11, 12, 13, 14, 15]);
    assert_eq!(snapshot.request.map(|r| r.page), Some(3));
}

#[tokio::test]
async fn page_size_is_shared_between_views() {
    let fake = Arc::new(FakeSource::new());
    fake.push_page(CollectionKind::Users, Ok(users_page(1..6, 100)));
    fake.push_page(CollectionKind::Users, Ok(users_page(11..16, 100)));
    fake.push_page(CollectionKind::Users, Ok(users_page(1..21, 100)));
    fake.push_page(
        CollectionKind::Products,
        Ok(page(
            (1..21)
                .map(|id| product(id, "Item", "Brand", "misc", 1, 4.0))
                .collect(),
            194,
        )),
    );
    let ctx = context_with(&fake, Options::default());
    let mut events = ctx.store().subscribe();

    let mut users_view = ctx.view(CollectionKind::Users);
    users_view.mount().await;
    users_view.go_to_page(3).await;
    users_view.change_page_size(PageSize::Twenty).await;
    assert_eq!(users_view.paginator().current_page(), 1);
    assert_eq!(users_view.rows().len(), 20);

    let mut products_view = ctx.view(CollectionKind::Products);
    products_view.mount().await;
    assert_eq!(products_view.paginator().page_size(), PageSize::Twenty);
    assert_eq!(
        fake.last_page_call().map(|(kind, r)| (kind, r.limit())),
        Some((CollectionKind::Products, 20))
    );
    assert_eq!(products_view.paginator().total_pages(), 10);

    let mut saw_size_change = false;
    while let Ok(event) = events.try_recv() {
        if event == crate::store::StoreEvent::PageSizeChanged(PageSize::Twenty) {
            saw_size_change = true;
        }
    }
    assert!(saw_size_change);
}

#[tokio::test]
async fn remote_search_mode_uses_search_endpoint() {
    let fake = Arc::new(FakeSource::new());
    fake.push_page(CollectionKind::Products, Ok(page(Vec::new(), 0)));
    fake.push_query(Ok(vec![product(9, "Phone", "Apple", "smartphones", 12, 4.4)]));
    let options = Options {
        search_mode: SearchMode::Remote,
        ..Options::default()
    };
    let ctx = context_with(&fake, options);
    let mut view = ctx.view(CollectionKind::Products);
    view.mount().await;
    assert!(view.rows().is_empty());
    assert_eq!(view.paginator().total_pages(), 1);

    view.search("phone").await;
    assert_eq!(
        fake.last_query(),
        Some((CollectionKind::Products, RemoteQuery::Search("phone".to_string())))
    );
    assert_eq!(ids(view.rows()), vec![9]);
}

#[tokio::test]
async fn json_rendering_describes_the_view() {
    let fake = Arc::new(FakeSource::new());
    fake.push_page(CollectionKind::Users, Ok(users_page(1..6, 23)));
    let ctx = context_with(&fake, Options::default());
    let mut view = ctx.view(CollectionKind::Users);
    view.mount().await;
    view.search("user2").await;

    let value: serde_json::Value =
        serde_json::from_slice(&crate::render::render_json(&view)).unwrap();
    assert_eq!(value["collection"], "users");
    assert_eq!(value["page"], 1);
    assert_eq!(value["page_size"], 5);
    assert_eq!(value["total_pages"], 5);
    assert_eq!(value["total_items"], 23);
    assert_eq!(value["search"], "user2");
    assert_eq!(value["rows"].as_array().map(Vec::len), Some(1));
    assert_eq!(value["rows"][0]["kind"], "user");
    assert_eq!(value["rows"][0]["firstName"], "User2");
    assert_eq!(value["window"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn shutdown_cancels_in_flight_fetches() {
    let fake = Arc::new(FakeSource::new());
    let (_hold, gate) = oneshot::channel::<()>();
    fake.push_page_gated(CollectionKind::Users, Ok(users_page(1..6, 23)), Some(gate));
    let ctx = context_with(&fake, Options::default());
    let store = ctx.store();

    let pending = tokio::spawn(async move {
        store
            .fetch_collection(CollectionKind::Users, 1, PageSize::Five)
            .await
    });
    while fake.page_call_count() < 1 {
        tokio::task::yield_now().await;
    }
    ctx.shutdown().await;
    assert_eq!(pending.await.unwrap(), FetchOutcome::Cancelled);

    let mut view = ctx.view(CollectionKind::Users);
    assert_eq!(view.mount().await, FetchOutcome::Cancelled);
    assert!(view.rows().is_empty());
}

#[tokio::test]
async fn answer_for_a_replaced_view_is_not_applied_to_its_successor() {
    let fake = Arc::new(FakeSource::new());
    fake.push_page(CollectionKind::Users, Ok(users_page(1..6, 23)));
    fake.push_page(CollectionKind::Users, Ok(users_page(1..6, 23)));
    fake.push_query(Ok(users(1..4).into_iter().filter(|r| r.id() % 2 == 1).collect()));
    fake.push_query(Ok(users(1..5).into_iter().filter(|r| r.id() % 2 == 0).collect()));
    let ctx = context_with(&fake, Options::default());
    let source = ctx.source();

    let mut replaced = ctx.view(CollectionKind::Users);
    replaced.mount().await;
    let stale = replaced
        .request_filter(FilterField::Gender, "female")
        .unwrap()
        .unwrap();

    let mut view = ctx.view(CollectionKind::Users);
    view.mount().await;
    let latest = view
        .request_filter(FilterField::Gender, "male")
        .unwrap()
        .unwrap();
    assert_ne!(stale.ticket, latest.ticket);

    assert!(view.apply_query(latest.run(source.as_ref()).await));
    assert_eq!(ids(view.rows()), vec![1, 3]);

    assert!(!view.apply_query(stale.run(source.as_ref()).await));
    assert_eq!(ids(view.rows()), vec![1, 3]);
}
