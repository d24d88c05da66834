use crate::ValueHolder;
use transactor_core::{Error, Result, Row, RowNames};

pub(crate) fn labels_of(columns: &[tokio_postgres::Column]) -> RowNames {
    columns.iter().map(|c| c.name().to_string()).collect()
}

pub(crate) fn postgres_row_to_row(row: tokio_postgres::Row, labels: &RowNames) -> Result<Row> {
    let values = (0..row.len())
        .map(|i| match row.try_get::<_, ValueHolder>(i) {
            Ok(v) => Ok(v.0),
            Err(..) => {
                let col = &row.columns()[i];
                Err(Error::msg(format!(
                    "Could not deserialize column {} `{}`: {}",
                    i,
                    col.name(),
                    col.type_()
                )))
            }
        })
        .collect::<Result<Box<[_]>>>()?;
    Ok(Row::new(labels.clone(), values))
}
