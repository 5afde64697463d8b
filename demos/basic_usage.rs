//! # Basic Usage Example
//!
//! Walks through the verb set against a local MySQL server:
//! - Registering a backend with a `Session`
//! - create / get / update / filter / exist / delete
//! - Binding a `Collection` with its own retry budget
//! - Inspecting the error taxonomy
//!
//! Point it at a server with `CRUDHAUS_MYSQL_HOST`, `CRUDHAUS_MYSQL_USER`,
//! `CRUDHAUS_MYSQL_PASSWORD` and `CRUDHAUS_MYSQL_DATABASE`.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use crudhaus::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("crudhaus basic usage");
    println!("====================");

    let host = env::var("CRUDHAUS_MYSQL_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let user = env::var("CRUDHAUS_MYSQL_USER").unwrap_or_else(|_| "root".to_string());
    let password = env::var("CRUDHAUS_MYSQL_PASSWORD").unwrap_or_default();
    let database = env::var("CRUDHAUS_MYSQL_DATABASE").unwrap_or_else(|_| "crudhaus".to_string());

    // 1. Register the backend; the first one becomes the default
    let mysql = DatabaseConfig::Mysql(
        SqlConfig::new(host, 3306, user, password)
            .with_database(database)
            .with_max_op_fail_retry(2)
            .with_timeout(5.0),
    );
    let session = Arc::new(Session::with_databases([mysql])?);

    session
        .execute(
            "CREATE TABLE IF NOT EXISTS demo_users (\
             id BIGINT PRIMARY KEY, name VARCHAR(64), age INT, deleted_at DATETIME NULL)",
            &[],
            &CallOptions::new(),
        )
        .await?;

    // 2. Bind a collection handle
    let users = session
        .collection("demo_users")
        .with_retry(1)
        .with_timeout(Duration::from_secs(2));

    let mut ada = Record::new();
    ada.insert("id".into(), Value::from(1));
    ada.insert("name".into(), Value::from("Ada"));
    ada.insert("age".into(), Value::from(36));
    users.create(&ada, CreateMode::Replace).await?;
    println!("created: {:?}", ada);

    // 3. Inserting the same key again is a duplicate
    match users.create(&ada, CreateMode::Insert).await {
        Err(err) if err.kind() == ErrorKind::DuplicateKey => println!("duplicate rejected: {}", err),
        other => println!("unexpected create result: {:?}", other),
    }

    // 4. Reads
    let found = users.get(&[Filter::eq("id", 1)], &["name", "age"]).await?;
    println!("get: {:?}", found);

    let mut changes = Record::new();
    changes.insert("age".into(), Value::from(37));
    users.update(&changes, &[Filter::eq("id", 1)]).await?;

    let query = QueryBuilder::new()
        .filter(Filter::gte("age", 18))
        .filter(Filter::is_null("deleted_at"))
        .fields(["id", "name"])
        .order_by("-age")
        .limit(10);
    let adults = users.filter(&query).await?;
    println!("filter: {} row(s)", adults.len());

    println!("exist: {}", users.exist(&[Filter::eq("id", 1)]).await?);

    // 5. Errors carry a taxonomy kind
    if let Err(err) = users.exist(&[]).await {
        println!("{:?}: {}", err.kind(), err);
    }

    users.delete(&[Filter::eq("id", 1)]).await?;
    session.close().await;
    println!("done");
    Ok(())
}
