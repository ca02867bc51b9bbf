use jiff::{SignedDuration, Timestamp};
use snaplink_cache::MokaUrlCache;
use snaplink_core::{ShortCode, Shortener, ShortenerError};
use snaplink_shortener::{ShortenerService, ShortenerSettings};
use snaplink_snowflake::{Snowflake, SnowflakeId, SnowflakeSettings};
use snaplink_storage::InMemoryRepository;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

type Service = ShortenerService<InMemoryRepository, MokaUrlCache, Arc<Snowflake>>;

fn snowflake(machine_id: u16) -> Arc<Snowflake> {
    let settings = SnowflakeSettings::builder()
        .machine_id(machine_id)
        .start_epoch(Timestamp::now() - SignedDuration::from_hours(1))
        .build();
    Arc::new(Snowflake::new(settings).unwrap())
}

fn service(generator: Arc<Snowflake>) -> Service {
    ShortenerService::with_settings(
        InMemoryRepository::new(),
        MokaUrlCache::new(),
        generator,
        ShortenerSettings::builder()
            .cache_ttl(Duration::from_secs(60))
            .build(),
    )
}

#[tokio::test]
async fn create_resolve_delete_round_trip() {
    let service = service(snowflake(3));

    let shortened = service.create("https://example.com/a?b=c").await.unwrap();
    assert!(shortened.is_new());
    assert!(shortened.link.is_consistent());

    let id = SnowflakeId::try_from(shortened.link.id).unwrap();
    assert_eq!(id.machine_id(), 3);

    let code = shortened.link.short_code.clone();
    assert_eq!(
        service.resolve(&code).await.unwrap(),
        "https://example.com/a?b=c"
    );

    service.delete(&code).await.unwrap();
    assert!(matches!(
        service.resolve(&code).await.unwrap_err(),
        ShortenerError::NotFound(_)
    ));
}

#[tokio::test]
async fn codes_decode_to_their_ids() {
    let service = service(snowflake(0));

    for i in 0..20 {
        let link = service
            .create(&format!("https://example.com/{i}"))
            .await
            .unwrap()
            .link;
        let parsed = ShortCode::new(link.short_code.as_str()).unwrap();
        assert_eq!(parsed.decode(), Some(link.id));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn services_sharing_a_generator_never_collide() {
    let generator = snowflake(9);
    let a = Arc::new(service(Arc::clone(&generator)));
    let b = Arc::new(service(generator));

    let mut handles = vec![];
    for i in 0..200 {
        let service = if i % 2 == 0 { Arc::clone(&a) } else { Arc::clone(&b) };
        handles.push(tokio::spawn(async move {
            service
                .create(&format!("https://example.com/{i}"))
                .await
                .unwrap()
                .link
                .id
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        assert!(ids.insert(handle.await.unwrap()));
    }
    assert_eq!(ids.len(), 200);
}
