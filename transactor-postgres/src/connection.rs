use crate::{
    PostgresTransaction, ValueHolder,
    util::{labels_of, postgres_row_to_row},
};
use async_stream::try_stream;
use std::{borrow::Cow, future::Future, pin::pin};
use tokio::spawn;
use tokio_postgres::NoTls;
use transactor_core::{
    Beginnable, Error, ErrorContext, Executor, Query, QueryResult, Result, RowsAffected,
    stream::{Stream, StreamExt, TryStreamExt},
};
use url::Url;
use urlencoding::decode;

/// Connection to a postgres server.
///
/// Every [`begin`](Beginnable::begin) opens a new connection to the same
/// server, so transactions begun from one root never share a session.
pub struct PostgresConnection {
    url: Cow<'static, str>,
    client: tokio_postgres::Client,
}

impl PostgresConnection {
    pub const PREFIX: &'static str = "postgres://";

    pub async fn connect(url: Cow<'static, str>) -> Result<PostgresConnection> {
        let context = || format!("While trying to connect to `{}`", url);
        let decoded = decode(&url).with_context(context)?;
        if !decoded.starts_with(Self::PREFIX) {
            let error = Error::msg(format!(
                "Postgres connection url must start with `{}`",
                Self::PREFIX
            ))
            .context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        let parsed = Url::parse(&decoded).with_context(context)?;
        let (client, connection) = tokio_postgres::connect(parsed.as_str(), NoTls)
            .await
            .with_context(context)
            .map_err(|e| {
                log::error!("{:#}", e);
                e
            })?;
        spawn(async move {
            if let Err(e) = connection.await
                && !e.is_closed()
            {
                log::error!("Postgres connection error: {:#}", e);
            }
        });
        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Executor for PostgresConnection {
    fn run(&self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        let context = format!("While running the query:\n{}", query);
        try_stream! {
            let statement = self.client.prepare(&query.sql).await?;
            let params = query.params.into_iter().map(ValueHolder).collect::<Vec<_>>();
            if statement.columns().is_empty() {
                let rows_affected = self.client.execute_raw(&statement, params).await?;
                yield QueryResult::Affected(RowsAffected {
                    rows_affected,
                    last_affected_id: None,
                });
            } else {
                let labels = labels_of(statement.columns());
                let stream = self.client.query_raw(&statement, params).await?;
                let mut stream = pin!(stream);
                while let Some(row) = stream.next().await.transpose()? {
                    yield QueryResult::Row(postgres_row_to_row(row, &labels)?);
                }
            }
        }
        .map_err(move |e: Error| {
            let e = e.context(context.clone());
            log::error!("{:#}", e);
            e
        })
    }
}

impl Beginnable for PostgresConnection {
    type Transaction = PostgresTransaction;

    fn begin(&self) -> impl Future<Output = Result<PostgresTransaction>> + Send {
        let url = self.url.clone();
        async move { PostgresTransaction::new(PostgresConnection::connect(url).await?).await }
    }
}
