// src/common/db_utils.rs

use sqlx::{Postgres, Transaction};

use crate::common::error::AppError;

// ---
// Helper: fecha uma transação de estoque
// ---
/// Faz commit quando o trabalho deu certo. Senão faz rollback e devolve o
/// erro original intacto, para o chamador ainda poder decidir pelo tipo.
pub(crate) async fn finish_transaction<T>(
    tx: Transaction<'_, Postgres>,
    outcome: Result<T, AppError>,
    operation: &'static str,
) -> Result<T, AppError> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(operation, error = %rollback_err, "rollback failed");
            }
            tracing::error!(operation, error = %err, "transaction rolled back");
            Err(err)
        }
    }
}
