use indoc::indoc;
use std::sync::LazyLock;
use tokio::sync::Mutex;
use transactor::{Executor, Query, Result};

/// Scenarios share the `balances` table, run them one at a time.
pub static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Recreate `balances` with the single account 1 holding `amount`.
pub async fn reset_balances<E: Executor>(executor: &E, amount: i64) {
    executor
        .execute("DROP TABLE IF EXISTS balances".into())
        .await
        .expect("Failed to drop the balances table");
    executor
        .execute(
            indoc! {"
                CREATE TABLE balances (
                    id BIGINT PRIMARY KEY,
                    amount BIGINT NOT NULL
                )
            "}
            .into(),
        )
        .await
        .expect("Failed to create the balances table");
    let inserted = executor
        .execute(
            Query::new("INSERT INTO balances (id, amount) VALUES ($1, $2)")
                .bind(1)
                .bind(amount),
        )
        .await
        .expect("Failed to insert the account");
    assert_eq!(inserted.rows_affected, 1);
}

pub async fn set_amount<E: Executor>(executor: &E, amount: i64) -> Result<()> {
    let updated = executor
        .execute(Query::new("UPDATE balances SET amount = $1 WHERE id = 1").bind(amount))
        .await?;
    assert_eq!(updated.rows_affected, 1);
    Ok(())
}

pub async fn add_amount<E: Executor>(executor: &E, delta: i64) -> Result<()> {
    let updated = executor
        .execute(Query::new("UPDATE balances SET amount = amount + $1 WHERE id = 1").bind(delta))
        .await?;
    assert_eq!(updated.rows_affected, 1);
    Ok(())
}

pub async fn amount<E: Executor>(executor: &E) -> i64 {
    executor
        .fetch_one("SELECT amount FROM balances WHERE id = 1".into())
        .await
        .expect("Failed to read the balance")
        .expect("The account does not exist")
        .get::<i64>("amount")
        .expect("The amount is not an integer")
}
