use procard_app_lib::db::repositories::key_value_repository::{KeyValueRepository, KvTable};
use procard_app_lib::db::{migrations, DbPool};
use procard_app_lib::models::settings::{DEFAULT_COMPANY_NAME, KEY_COMPANY_NAME, KEY_LEADERBOARD_PERIOD};
use procard_app_lib::services::blob_store::{BlobStore, SqliteBlobStore};
use tempfile::tempdir;

fn column_names(conn: &rusqlite::Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

#[test]
fn test_key_value_tables_creation() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("test.sqlite")).expect("db pool");

    pool.with_connection(|conn| {
        for table in ["app_settings", "kv_store"] {
            let columns = column_names(conn, table)?;
            assert_eq!(columns, vec!["key", "value", "updated_at"], "table {table}");
        }
        Ok(())
    })
    .expect("table structure verification");
}

#[test]
fn test_migration_seeds_settings_once() {
    let dir = tempdir().expect("temp dir");
    let db_path = dir.path().join("test.sqlite");
    let pool = DbPool::new(&db_path).expect("db pool");

    pool.with_connection(|conn| {
        let name = KeyValueRepository::get(conn, KvTable::Settings, KEY_COMPANY_NAME)?
            .expect("seeded company name");
        assert_eq!(name.value, DEFAULT_COMPANY_NAME);

        let period = KeyValueRepository::get(conn, KvTable::Settings, KEY_LEADERBOARD_PERIOD)?
            .expect("seeded leaderboard period");
        assert_eq!(period.value, "Quarterly");

        KeyValueRepository::upsert(conn, KvTable::Settings, KEY_COMPANY_NAME, "Acme")?;
        Ok(())
    })
    .expect("seed verification");

    let reopened = DbPool::new(&db_path).expect("reopen");
    reopened
        .with_connection(|conn| {
            let name = KeyValueRepository::get(conn, KvTable::Settings, KEY_COMPANY_NAME)?
                .expect("company name");
            assert_eq!(name.value, "Acme");

            let history = migrations::get_migration_history(conn)?;
            assert_eq!(history.len(), 1);
            assert_eq!(history[0].version, 1);

            let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
            assert_eq!(version, 1);
            Ok(())
        })
        .expect("reopen verification");
}

#[test]
fn test_blob_store_persists_raw_values() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("test.sqlite")).expect("db pool");
    let store = SqliteBlobStore::new(pool.clone());

    assert_eq!(store.get("technicianTemplates").expect("get"), None);
    store.set("technicianTemplates", "[]").expect("set");
    store.set("technicianTemplates", "[{\"id\":\"1\"}]").expect("overwrite");
    assert_eq!(
        store.get("technicianTemplates").expect("get").as_deref(),
        Some("[{\"id\":\"1\"}]")
    );

    pool.with_connection(|conn| {
        let rows = KeyValueRepository::list(conn, KvTable::Storage)?;
        assert_eq!(rows.len(), 1);
        let settings_row = KeyValueRepository::get(conn, KvTable::Settings, "technicianTemplates")?;
        assert!(settings_row.is_none());
        Ok(())
    })
    .expect("storage table verification");

    store.remove("technicianTemplates").expect("remove");
    assert_eq!(store.get("technicianTemplates").expect("get"), None);
}
