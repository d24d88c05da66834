use crate::{MUTEX, amount, reset_balances, set_amount};
use std::sync::Arc;
use transactor::{
    Beginnable, Context, Error, NoNesting, TransactionError, TransactionRunner, Transactor,
};

pub async fn no_nesting<D>(root: &Arc<D>)
where
    D: Beginnable + 'static,
    D::Transaction: 'static,
{
    let _lock = MUTEX.lock().await;
    let transactor = Transactor::from_arc(root.clone(), NoNesting);
    reset_balances(&**root, 100).await;
    transactor
        .within_transaction(&Context::new(), async |ctx| {
            set_amount(&transactor.db(&ctx), 70).await?;
            let error = transactor
                .within_transaction(&ctx, async |ctx| set_amount(&transactor.db(&ctx), 80).await)
                .await
                .expect_err("Nested transactions should be refused");
            assert_eq!(
                error.downcast_ref::<TransactionError>(),
                Some(&TransactionError::NestedTransactionsUnsupported)
            );
            assert_eq!(amount(&transactor.db(&ctx)).await, 70);
            Ok::<_, Error>(())
        })
        .await
        .expect("Failed to commit the outer transaction");
    assert_eq!(amount(&**root).await, 70);
}
