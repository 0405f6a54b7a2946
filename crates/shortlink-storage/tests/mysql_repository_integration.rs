//! Runs against a throwaway MySQL container; needs a Docker daemon.
//! `cargo test -p shortlink-storage -- --ignored`

use std::sync::Arc;
use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use shortlink_core::{ClickEvent, LinkRecord, ShortCode};
use shortlink_storage::{ClickOutcome, MySqlRepository, Repository};
use shortlink_test_infra::mysql::{MySqlServer, MysqlConfig};
use sqlx::mysql::MySqlPoolOptions;

struct Fixture {
    _mysql: MySqlServer,
    repo: MySqlRepository,
}

impl Fixture {
    async fn start() -> Self {
        let mysql = MySqlServer::new(MysqlConfig::builder().build())
            .await
            .expect("start mysql");
        let url = mysql.database_url().await.expect("mysql url");
        let pool = connect_with_retry(&url).await;

        let repo = MySqlRepository::new(pool);
        repo.migrate().await.expect("create schema");

        Self {
            _mysql: mysql,
            repo,
        }
    }
}

async fn connect_with_retry(url: &str) -> sqlx::MySqlPool {
    let mut last_error = None;

    for _ in 0..20 {
        match MySqlPoolOptions::new()
            .max_connections(8)
            .connect(url)
            .await
        {
            Ok(pool) => return pool,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect mysql: {last_error:?}");
}

fn base() -> Timestamp {
    Timestamp::from_second(1_700_000_000).unwrap()
}

fn code(value: &str) -> ShortCode {
    ShortCode::new_unchecked(value)
}

fn record(value: &str, url: &str, validity: SignedDuration) -> LinkRecord {
    LinkRecord::new(code(value), url, base(), base() + validity)
}

#[tokio::test]
#[ignore = "requires docker"]
async fn insert_and_get_record() {
    let fixture = Fixture::start().await;

    assert!(fixture
        .repo
        .insert_if_absent(record("abc123", "https://example.com", SignedDuration::from_mins(30)))
        .await
        .unwrap());

    let got = fixture.repo.get_by_code(&code("abc123")).await.unwrap().unwrap();
    assert_eq!(got.original_url, "https://example.com");
    assert_eq!(got.created_at, base());
    assert_eq!(got.expiry_at, base() + SignedDuration::from_mins(30));
    assert_eq!(got.click_count(), 0);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn insert_reports_collision_without_overwriting() {
    let fixture = Fixture::start().await;
    let validity = SignedDuration::from_mins(30);

    assert!(fixture
        .repo
        .insert_if_absent(record("abc123", "https://one.example", validity))
        .await
        .unwrap());
    assert!(!fixture
        .repo
        .insert_if_absent(record("abc123", "https://two.example", validity))
        .await
        .unwrap());

    let got = fixture.repo.get_by_code(&code("abc123")).await.unwrap().unwrap();
    assert_eq!(got.original_url, "https://one.example");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn short_codes_are_case_sensitive() {
    let fixture = Fixture::start().await;
    let validity = SignedDuration::from_mins(30);

    assert!(fixture
        .repo
        .insert_if_absent(record("abcd", "https://lower.example", validity))
        .await
        .unwrap());
    assert!(fixture
        .repo
        .insert_if_absent(record("ABCD", "https://upper.example", validity))
        .await
        .unwrap());

    let upper = fixture.repo.get_by_code(&code("ABCD")).await.unwrap().unwrap();
    assert_eq!(upper.original_url, "https://upper.example");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn append_click_checks_expiry_in_the_same_transaction() {
    let fixture = Fixture::start().await;
    fixture
        .repo
        .insert_if_absent(record("abc123", "https://example.com", SignedDuration::from_mins(1)))
        .await
        .unwrap();

    let click = ClickEvent {
        timestamp: base(),
        referrer: Some("https://ref.example".to_string()),
        source: Some("10.0.0.1".to_string()),
        user_agent: Some("curl/8.0".to_string()),
    };
    let outcome = fixture
        .repo
        .append_click(&code("abc123"), click.clone(), base())
        .await
        .unwrap();
    assert_eq!(outcome, ClickOutcome::Recorded);

    let later = base() + SignedDuration::from_secs(61);
    let outcome = fixture
        .repo
        .append_click(&code("abc123"), ClickEvent::at(later), later)
        .await
        .unwrap();
    assert!(matches!(outcome, ClickOutcome::Expired { .. }));

    let got = fixture.repo.get_by_code(&code("abc123")).await.unwrap().unwrap();
    assert_eq!(got.click_count(), 1);
    assert_eq!(got.clicks(), &[click]);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn concurrent_clicks_are_all_counted() {
    let fixture = Fixture::start().await;
    fixture
        .repo
        .insert_if_absent(record("hot", "https://example.com", SignedDuration::from_mins(30)))
        .await
        .unwrap();

    let repo = Arc::new(fixture.repo.clone());
    let handles: Vec<_> = (0..50)
        .map(|_| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move {
                repo.append_click(&code("hot"), ClickEvent::at(base()), base())
                    .await
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), ClickOutcome::Recorded);
    }

    let got = fixture.repo.get_by_code(&code("hot")).await.unwrap().unwrap();
    assert_eq!(got.click_count(), 50);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn delete_expired_removes_links_and_their_clicks() {
    let fixture = Fixture::start().await;
    fixture
        .repo
        .insert_if_absent(record("old", "https://old.example", SignedDuration::from_mins(1)))
        .await
        .unwrap();
    fixture
        .repo
        .insert_if_absent(record("new", "https://new.example", SignedDuration::from_mins(60)))
        .await
        .unwrap();
    fixture
        .repo
        .append_click(&code("old"), ClickEvent::at(base()), base())
        .await
        .unwrap();

    let removed = fixture
        .repo
        .delete_expired(base() + SignedDuration::from_mins(2))
        .await
        .unwrap();
    assert_eq!(removed, 1);

    assert!(fixture.repo.get_by_code(&code("old")).await.unwrap().is_none());
    assert!(fixture.repo.get_by_code(&code("new")).await.unwrap().is_some());

    let orphaned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM link_clicks WHERE short_code = ?")
        .bind("old")
        .fetch_one(fixture.repo.pool())
        .await
        .unwrap();
    assert_eq!(orphaned, 0);
}
