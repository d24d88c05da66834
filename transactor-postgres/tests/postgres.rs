
#[cfg(test)]
mod tests {
    use super::init::init;
    use std::sync::Mutex;
    use transactor_core::{
        Beginnable, Executor, Query, Transaction, TransactionError, Value, stream::TryStreamExt,
    };
    use transactor_postgres::PostgresConnection;
    use transactor_tests::{execute_tests, init_logs, silent_logs};

    static MUTEX: Mutex<()> = Mutex::new(());

    async fn bindings(connection: &PostgresConnection) {
        connection
            .execute("DROP TABLE IF EXISTS items".into())
            .await
            .expect("Failed to drop the items table");
        connection
            .execute(
                "CREATE TABLE items (id SERIAL PRIMARY KEY, name TEXT, qty INTEGER, price REAL, data BYTEA, ok BOOLEAN)"
                    .into(),
            )
            .await
            .expect("Failed to create the items table");
        let inserted = connection
            .execute(
                Query::new(
                    "INSERT INTO items (name, qty, price, data, ok) VALUES ($1, $2, $3, $4, $5), ($1, $2, $3, NULL, NULL)",
                )
                .bind("pen")
                .bind(3)
                .bind(1.5)
                .bind(vec![1u8, 2, 3])
                .bind(true),
            )
            .await
            .expect("Failed to insert the items");
        assert_eq!(inserted.rows_affected, 2);
        let updated = connection
            .execute(Query::new("UPDATE items SET qty = qty + $1 WHERE id = $2").bind(4).bind(1))
            .await
            .expect("Failed to update the item");
        assert_eq!(updated.rows_affected, 1);
        let rows = connection
            .fetch("SELECT id, name, qty, price, data, ok FROM items ORDER BY id".into())
            .try_collect::<Vec<_>>()
            .await
            .expect("Failed to read the items");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].names(), ["id", "name", "qty", "price", "data", "ok"]);
        assert_eq!(rows[0].get::<i64>("id").unwrap(), 1);
        assert_eq!(rows[0].get::<String>("name").unwrap(), "pen");
        assert_eq!(rows[0].get::<i32>("qty").unwrap(), 7);
        assert_eq!(rows[0].get::<f64>("price").unwrap(), 1.5);
        assert_eq!(rows[0].get::<Vec<u8>>("data").unwrap(), [1, 2, 3]);
        assert_eq!(rows[0].get::<bool>("ok").unwrap(), true);
        assert_eq!(rows[1].get_column("data"), Some(&Value::Null));
        assert_eq!(rows[1].get::<Option<bool>>("ok").unwrap(), None);
        silent_logs! {
            assert!(connection.execute("SELEC 1".into()).await.is_err());
        }
    }

    async fn transaction_completes_once(connection: &PostgresConnection) {
        let transaction = connection.begin().await.expect("Could not begin");
        transaction
            .execute("DELETE FROM items".into())
            .await
            .expect("Failed to delete");
        transaction.rollback().await.expect("Failed to rollback");
        let error = transaction.commit().await.unwrap_err();
        assert_eq!(
            error.downcast_ref::<TransactionError>(),
            Some(&TransactionError::AlreadyCompleted)
        );
        let count = connection
            .fetch_one("SELECT COUNT(*) AS count FROM items".into())
            .await
            .expect("Failed to count")
            .expect("No row returned");
        assert_eq!(count.get::<i64>("count").unwrap(), 2);
    }

    #[tokio::test]
    async fn postgres() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();
        let (url, container) = init().await;
        let error_msg = format!("Could not connect to `{url}`");
        let connection = PostgresConnection::connect(url.into())
            .await
            .expect(&error_msg);
        bindings(&connection).await;
        transaction_completes_once(&connection).await;
        execute_tests(connection).await;
        drop(container);
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(
                PostgresConnection::connect("sqlite://some_url".into())
                    .await
                    .is_err()
            );
        }
    }
}
