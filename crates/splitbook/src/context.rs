// Shared runtime state threaded through every operation.

use std::fmt;
use std::sync::Arc;

use splitbook_core::db::adapter::{Adapter, SchemaOptions, SchemaStatus, TransactionAdapter};
use splitbook_core::error::{ApiError, ErrorCode, ErrorKind, SplitbookError};
use splitbook_core::{AppSchema, SplitbookLogger, SplitbookOptions};

/// Configuration, storage adapter, and logger bundled together. Handlers
/// receive it as `&SplitbookContext`.
pub struct SplitbookContext {
    pub options: SplitbookOptions,
    pub adapter: Arc<dyn Adapter>,
    pub logger: SplitbookLogger,
}

impl fmt::Debug for SplitbookContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitbookContext")
            .field("options", &self.options)
            .field("adapter", &"<dyn Adapter>")
            .finish()
    }
}

impl SplitbookContext {
    pub fn new(options: SplitbookOptions, adapter: Arc<dyn Adapter>) -> Arc<Self> {
        let logger = SplitbookLogger::new(options.logger.clone());
        Arc::new(Self {
            options,
            adapter,
            logger,
        })
    }

    /// Bring the database schema up to date, applying pending migrations.
    pub async fn init(&self) -> Result<(), SplitbookError> {
        self.adapter
            .create_schema(
                &AppSchema::default_schema(),
                &SchemaOptions { auto_migrate: true },
            )
            .await?;
        self.logger
            .info(&format!("{} schema is ready", self.options.app_name));
        Ok(())
    }

    /// Diff the database against the expected schema without touching it.
    pub async fn check_schema(&self) -> Result<SchemaStatus, SplitbookError> {
        let status = self
            .adapter
            .create_schema(
                &AppSchema::default_schema(),
                &SchemaOptions {
                    auto_migrate: false,
                },
            )
            .await?;
        if let SchemaStatus::NeedsMigration { statements } = &status {
            self.logger.warn(&format!(
                "Schema out of date, {} statements pending",
                statements.len()
            ));
        }
        Ok(status)
    }

    /// Open the transaction an operation runs inside.
    pub(crate) async fn begin(&self) -> Result<Box<dyn TransactionAdapter>, ApiError> {
        self.adapter.begin_transaction().await.map_err(internal_error)
    }
}

/// Commit on success, roll back on failure, and hand the result through.
pub(crate) async fn finish<T>(
    tx: Box<dyn TransactionAdapter>,
    result: Result<T, ApiError>,
) -> Result<T, ApiError> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(internal_error)?;
            Ok(value)
        }
        Err(err) => {
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}

pub(crate) fn internal_error(err: SplitbookError) -> ApiError {
    ApiError::with_message(
        ErrorKind::Internal,
        ErrorCode::InternalServerError,
        err.to_string(),
    )
}
