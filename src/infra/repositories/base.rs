//! Query helpers shared by every repository.
//!
//! Functions here are generic over [`ConnectionTrait`] so the same query runs
//! on the pooled connection or inside a transaction.

use sea_orm::{
    sea_query::{Expr, Func},
    ColumnTrait, Condition, ConnectionTrait, DeleteResult, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, Select,
};

use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

/// Run `select` for one page and count the full result set.
pub(crate) async fn fetch_page<C, E>(
    db: &C,
    select: Select<E>,
    params: &PaginationParams,
) -> AppResult<(Vec<E::Model>, u64)>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: FromQueryResult + Send + Sync,
{
    let paginator = select.paginate(db, params.limit());
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(params.page() - 1).await?;
    Ok((items, total))
}

/// Case-insensitive substring match on any of `columns`.
pub(crate) fn search_condition<Col: ColumnTrait>(columns: &[Col], term: &str) -> Condition {
    let pattern = format!("%{}%", term.to_lowercase());
    columns.iter().fold(Condition::any(), |condition, column| {
        condition.add(Expr::expr(Func::lower(Expr::col(column.as_column_ref()))).like(pattern.clone()))
    })
}

/// Apply an optional search term to a select.
pub(crate) fn with_search<E, Col>(select: Select<E>, columns: &[Col], term: Option<&str>) -> Select<E>
where
    E: EntityTrait,
    Col: ColumnTrait,
{
    match term {
        Some(term) => select.filter(search_condition(columns, term)),
        None => select,
    }
}

/// Count rows matched by `select`.
pub(crate) async fn count<C, E>(db: &C, select: Select<E>) -> AppResult<u64>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: FromQueryResult + Send + Sync,
{
    select.count(db).await.map_err(AppError::from)
}

/// Turn a zero-row delete into a not-found error.
pub(crate) fn ensure_deleted(result: DeleteResult, entity: &str) -> AppResult<()> {
    if result.rows_affected == 0 {
        return Err(AppError::not_found(entity));
    }
    Ok(())
}
