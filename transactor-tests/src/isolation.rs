use crate::{MUTEX, amount, reset_balances, set_amount};
use std::sync::Arc;
use transactor::{
    Beginnable, Context, DbGetter, Error, Savepoints, TransactionRunner, Transactor,
};

/// Uncommitted changes are visible through the scope only.
pub async fn isolation<D>(root: &Arc<D>)
where
    D: Beginnable + 'static,
    D::Transaction: 'static,
{
    let _lock = MUTEX.lock().await;
    let transactor = Transactor::from_arc(root.clone(), Savepoints::new());
    let getter = transactor.db_getter();
    let ctx = Context::new();
    reset_balances(&**root, 100).await;
    transactor
        .within_transaction(&ctx, async |inner| {
            set_amount(&getter.get(&inner), 110).await?;
            assert_eq!(amount(&getter.get(&inner)).await, 110);
            assert!(!getter.get(&ctx).is_transaction());
            assert_eq!(amount(&getter.get(&ctx)).await, 100);
            Ok::<_, Error>(())
        })
        .await
        .expect("Failed to commit the transaction");
    assert_eq!(amount(&getter.get(&ctx)).await, 110);
}

/// Two transactors over the same root open independent transactions, even
/// when one runs inside the other.
pub async fn two_transactors<D>(root: &Arc<D>)
where
    D: Beginnable + 'static,
    D::Transaction: 'static,
{
    let _lock = MUTEX.lock().await;
    let outer = Transactor::from_arc(root.clone(), Savepoints::new());
    let inner = Transactor::from_arc(root.clone(), Savepoints::new());
    reset_balances(&**root, 100).await;
    outer
        .within_transaction(&Context::new(), async |ctx| {
            assert!(outer.is_within_transaction(&ctx));
            assert!(!inner.is_within_transaction(&ctx));
            assert!(!inner.db(&ctx).is_transaction());
            let result = inner
                .within_transaction(&ctx, async |ctx| {
                    assert!(inner.is_within_transaction(&ctx));
                    set_amount(&inner.db(&ctx), 300).await?;
                    Err::<(), Error>(Error::msg("inner failure"))
                })
                .await;
            assert!(result.is_err());
            assert_eq!(amount(&outer.db(&ctx)).await, 100);
            Ok::<_, Error>(())
        })
        .await
        .expect("Failed to commit the outer transaction");
    assert_eq!(amount(&**root).await, 100);
}
