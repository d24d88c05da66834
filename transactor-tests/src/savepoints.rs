use crate::{MUTEX, add_amount, amount, reset_balances, set_amount};
use std::sync::Arc;
use transactor::{
    Beginnable, Context, Error, Executor, Query, Savepoints, TransactionRunner, Transactor,
};

pub async fn savepoints<D>(root: &Arc<D>)
where
    D: Beginnable + 'static,
    D::Transaction: 'static,
{
    let _lock = MUTEX.lock().await;
    let transactor = Transactor::from_arc(root.clone(), Savepoints::new());
    let ctx = Context::new();

    // B: a failing unit of work leaves the balance untouched
    reset_balances(&**root, 100).await;
    let result = transactor
        .within_transaction(&ctx, async |ctx| {
            set_amount(&transactor.db(&ctx), 110).await?;
            assert_eq!(amount(&transactor.db(&ctx)).await, 110);
            Err::<(), Error>(Error::msg("simulated failure"))
        })
        .await;
    assert_eq!(
        result.expect_err("The unit of work should fail").to_string(),
        "simulated failure"
    );
    assert_eq!(amount(&**root).await, 100);

    // A: a successful one is committed
    transactor
        .within_transaction(&ctx, async |ctx| set_amount(&transactor.db(&ctx), 110).await)
        .await
        .expect("Failed to commit the transaction");
    assert_eq!(amount(&**root).await, 110);

    // C: a failing nested call only discards its own changes
    reset_balances(&**root, 100).await;
    transactor
        .within_transaction(&ctx, async |ctx| {
            set_amount(&transactor.db(&ctx), 50).await?;
            let nested = transactor
                .within_transaction(&ctx, async |ctx| {
                    set_amount(&transactor.db(&ctx), 200).await?;
                    Err::<(), Error>(Error::msg("nested failure"))
                })
                .await;
            assert!(nested.is_err());
            assert_eq!(amount(&transactor.db(&ctx)).await, 50);
            Ok::<_, Error>(())
        })
        .await
        .expect("Failed to commit the outer transaction");
    assert_eq!(amount(&**root).await, 50);

    // Nested changes are committed with the outer transaction
    reset_balances(&**root, 100).await;
    transactor
        .within_transaction(&ctx, async |ctx| {
            transactor
                .within_transaction(&ctx, async |ctx| set_amount(&transactor.db(&ctx), 120).await)
                .await
        })
        .await
        .expect("Failed to commit the nested transaction");
    assert_eq!(amount(&**root).await, 120);

    // Three levels deep
    reset_balances(&**root, 100).await;
    transactor
        .within_transaction(&ctx, async |ctx| {
            transactor
                .within_transaction(&ctx, async |ctx| {
                    transactor
                        .within_transaction(&ctx, async |ctx| {
                            set_amount(&transactor.db(&ctx), 110).await
                        })
                        .await
                })
                .await
        })
        .await
        .expect("Failed to commit three nested transactions");
    assert_eq!(amount(&**root).await, 110);

    // D: a released innermost level is undone when its parent fails
    reset_balances(&**root, 100).await;
    transactor
        .within_transaction(&ctx, async |ctx| {
            add_amount(&transactor.db(&ctx), 10).await?;
            let second = transactor
                .within_transaction(&ctx, async |ctx| {
                    add_amount(&transactor.db(&ctx), 10).await?;
                    transactor
                        .within_transaction(&ctx, async |ctx| {
                            add_amount(&transactor.db(&ctx), 10).await
                        })
                        .await?;
                    assert_eq!(amount(&transactor.db(&ctx)).await, 130);
                    Err::<(), Error>(Error::msg("second level failure"))
                })
                .await;
            assert!(second.is_err());
            assert_eq!(amount(&transactor.db(&ctx)).await, 110);
            Ok::<_, Error>(())
        })
        .await
        .expect("Failed to commit the outer transaction");
    assert_eq!(amount(&**root).await, 110);

    // The outer failure discards the committed nested changes
    reset_balances(&**root, 100).await;
    let result = transactor
        .within_transaction(&ctx, async |ctx| {
            transactor
                .within_transaction(&ctx, async |ctx| set_amount(&transactor.db(&ctx), 130).await)
                .await?;
            Err::<(), Error>(Error::msg("outer failure"))
        })
        .await;
    assert!(result.is_err());
    assert_eq!(amount(&**root).await, 100);
}

/// Siblings at the same depth reuse the savepoint name, the second one must
/// still roll back only its own changes.
pub async fn savepoint_names<D>(root: &Arc<D>)
where
    D: Beginnable + 'static,
    D::Transaction: 'static,
{
    let _lock = MUTEX.lock().await;
    let transactor = Transactor::from_arc(root.clone(), Savepoints::new());
    reset_balances(&**root, 100).await;
    transactor
        .within_transaction(&Context::new(), async |ctx| {
            transactor
                .within_transaction(&ctx, async |ctx| set_amount(&transactor.db(&ctx), 10).await)
                .await?;
            let second = transactor
                .within_transaction(&ctx, async |ctx| {
                    set_amount(&transactor.db(&ctx), 20).await?;
                    Err::<(), Error>(Error::msg("second sibling failure"))
                })
                .await;
            assert!(second.is_err());
            assert_eq!(amount(&transactor.db(&ctx)).await, 10);
            transactor
                .db(&ctx)
                .execute(Query::new("UPDATE balances SET amount = amount + $1").bind(5))
                .await?;
            Ok::<_, Error>(())
        })
        .await
        .expect("Failed to commit the sibling transactions");
    assert_eq!(amount(&**root).await, 15);
}
