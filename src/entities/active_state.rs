//! Activation contract shared by reference-data tables.
//!
//! Inactive rows stay queryable; selection listings should go through
//! [`ActiveState::active`] so they only offer active rows.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Select};

pub trait ActiveState: EntityTrait {
    fn id_column() -> Self::Column;

    /// Boolean column holding the active flag
    fn active_column() -> Self::Column;

    fn updated_at_column() -> Self::Column;

    fn active() -> Select<Self> {
        Self::find().filter(Self::active_column().eq(true))
    }
}

/// Flips the active flag of one row, returning the number of rows changed
pub async fn set_active<E, C>(db: &C, id: i64, active: bool) -> Result<u64, DbErr>
where
    E: ActiveState,
    C: ConnectionTrait,
{
    let result = E::update_many()
        .col_expr(E::active_column(), Expr::value(active))
        .col_expr(E::updated_at_column(), Expr::value(Utc::now()))
        .filter(E::id_column().eq(id))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}
