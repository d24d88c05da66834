use crate::{MUTEX, amount, reset_balances, set_amount};
use std::sync::Arc;
use transactor::{Beginnable, Context, Error, Flattened, TransactionRunner, Transactor};

pub async fn flattened<D>(root: &Arc<D>)
where
    D: Beginnable + 'static,
    D::Transaction: 'static,
{
    let _lock = MUTEX.lock().await;
    let transactor = Transactor::from_arc(root.clone(), Flattened);
    let ctx = Context::new();

    // Nothing is discarded until the outermost call fails
    reset_balances(&**root, 100).await;
    transactor
        .within_transaction(&ctx, async |ctx| {
            let nested = transactor
                .within_transaction(&ctx, async |ctx| {
                    set_amount(&transactor.db(&ctx), 150).await?;
                    Err::<(), Error>(Error::msg("nested failure"))
                })
                .await;
            assert!(nested.is_err());
            Ok::<_, Error>(())
        })
        .await
        .expect("Failed to commit the flattened transaction");
    assert_eq!(amount(&**root).await, 150);

    reset_balances(&**root, 100).await;
    let result = transactor
        .within_transaction(&ctx, async |ctx| {
            transactor
                .within_transaction(&ctx, async |ctx| set_amount(&transactor.db(&ctx), 160).await)
                .await?;
            Err::<(), Error>(Error::msg("outer failure"))
        })
        .await;
    assert!(result.is_err());
    assert_eq!(amount(&**root).await, 100);
}
