//! Integration tests against an in-memory SQLite database

use galactic_config::ConfigurationItem;
use galactic_identity::{AttributeValue, ObjectType, SearchFilter};
use galactic_log::{EventSeverity, MemoryEventLog};
use galactic_sql::{SqlClient, SqlConfig, SqlDriver, SqlError, SqlRow, SqlValue};
use std::sync::Arc;

async fn crew_db() -> SqlClient {
    // One connection, or each pooled connection would see its own database
    let config = SqlConfig::new("sqlite::memory:").with_max_connections(1);
    let client = SqlClient::connect(&config).await.unwrap();
    client
        .execute(
            "CREATE TABLE crew (id TEXT PRIMARY KEY, name TEXT NOT NULL, rank TEXT, age INTEGER)",
            &[],
        )
        .await
        .unwrap();
    for (id, name, rank, age) in [
        ("c1", "Kara Thrace", Some("Captain"), 34),
        ("c2", "Karl Agathon", None, 31),
        ("c3", "Lee Adama", Some("Major"), 33),
    ] {
        let row = SqlRow::new()
            .with("id", id)
            .with("name", name)
            .with("rank", rank)
            .with("age", age);
        assert_eq!(client.insert("crew", &row).await.unwrap(), 1);
    }
    client
}

#[tokio::test]
async fn test_select_with_filter() {
    let client = crew_db().await;
    assert_eq!(client.driver(), SqlDriver::Sqlite);

    let filter = SearchFilter::starts_with("name", "Kar");
    let rows = client.select("crew", Some(&filter), &["id", "name"]).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].column_names(), vec!["id", "name"]);

    let filter = SearchFilter::and(vec![
        SearchFilter::starts_with("name", "Kar"),
        SearchFilter::present("rank"),
    ]);
    let rows = client.select("crew", Some(&filter), &[]).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text("id"), Some("c1"));
    assert_eq!(rows[0].integer("age"), Some(34));
}

#[tokio::test]
async fn test_null_columns_read_as_null() {
    let client = crew_db().await;
    let row = client
        .query_one("SELECT * FROM crew WHERE id = ?", &[SqlValue::from("c2")])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get("rank"), Some(&SqlValue::Null));
    assert_eq!(row.text("name"), Some("Karl Agathon"));

    let missing = client
        .query_one("SELECT * FROM crew WHERE id = ?", &[SqlValue::from("c9")])
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_values_are_bound_not_inlined() {
    let client = crew_db().await;
    let hostile = "x' OR '1'='1";
    let filter = SearchFilter::eq("name", hostile);
    assert!(client.select("crew", Some(&filter), &[]).await.unwrap().is_empty());

    let row = SqlRow::new().with("id", "c4").with("name", hostile);
    client.insert("crew", &row).await.unwrap();
    let rows = client.select("crew", Some(&filter), &[]).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text("name"), Some(hostile));

    let wildcard = SearchFilter::starts_with("name", "%");
    assert!(client.select("crew", Some(&wildcard), &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_and_delete() {
    let log = Arc::new(MemoryEventLog::new());
    let client = crew_db().await.with_event_log(log.clone());

    let change = SqlRow::new().with("rank", "Commander");
    assert!(client.update("crew", "id", "c3", &change).await.unwrap());
    assert!(!client.update("crew", "id", "nobody", &change).await.unwrap());
    let row = client
        .query_one("SELECT rank FROM crew WHERE id = ?", &[SqlValue::from("c3")])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.text("rank"), Some("Commander"));

    assert!(client.delete("crew", "id", "c2").await.unwrap());
    assert!(!client.delete("crew", "id", "c2").await.unwrap());
    assert_eq!(client.select("crew", None, &[]).await.unwrap().len(), 2);

    let entries = log.entries();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.source == "galactic-sql"));
    assert_eq!(log.entries_with(EventSeverity::Warning).len(), 1);
}

#[tokio::test]
async fn test_empty_rows_and_bad_tables_rejected() {
    let client = crew_db().await;
    assert!(matches!(
        client.insert("crew", &SqlRow::new()).await,
        Err(SqlError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.update("crew", "id", "c1", &SqlRow::new()).await,
        Err(SqlError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.select("main.", None, &[]).await,
        Err(SqlError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.execute("SELECT * FROM no_such_table", &[]).await,
        Err(SqlError::Database(_))
    ));
}

#[tokio::test]
async fn test_find_records() {
    let client = crew_db().await;
    let records = client
        .find_records("crew", "id", ObjectType::User, Some(&SearchFilter::present("rank")))
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].unique_id, "c1");
    assert_eq!(records[0].text("rank"), Some("Captain"));
    assert_eq!(records[0].attribute("age"), Some(&AttributeValue::Integer(34)));
}

#[tokio::test]
async fn test_connection_string_from_encrypted_item() {
    let dir = tempfile::tempdir().unwrap();
    let mut item = ConfigurationItem::new(dir.path(), "crew-db.cfg", true, Some("passphrase")).unwrap();
    item.set_value("sqlite::memory:\n");
    item.write().unwrap();

    let item = ConfigurationItem::new(dir.path(), "crew-db.cfg", true, Some("passphrase")).unwrap();
    let config = SqlConfig::from_item(&item).unwrap().with_max_connections(1);
    let client = SqlClient::connect(&config).await.unwrap();
    let row = client.query_one("SELECT 1 AS one", &[]).await.unwrap().unwrap();
    assert_eq!(row.integer("one"), Some(1));
    client.close().await;

    let empty = ConfigurationItem::new(dir.path(), "empty.cfg", false, None).unwrap();
    assert!(SqlConfig::from_item(&empty).is_err());
}
