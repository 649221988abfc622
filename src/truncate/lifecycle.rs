use std::fmt;
use std::sync::Arc;

use tracing::debug;
use tracing::info;

use crate::Error;
use crate::Result;
use crate::StorageClient;
use crate::TableMetadata;
use crate::TruncateError;
use crate::WaiterPolicy;

/// Steps of a drop-and-recreate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Describing,
    Deleting,
    Creating,
    Done,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            LifecyclePhase::Describing => "describing",
            LifecyclePhase::Deleting => "deleting",
            LifecyclePhase::Creating => "creating",
            LifecyclePhase::Done => "done",
        };
        f.write_str(s)
    }
}

/// Replaces a table with an empty, schema-identical copy.
///
/// Cost is independent of the item count, at the price of a window during
/// which the table does not exist. The snapshot taken while describing is the
/// only source for the rebuilt table's schema.
pub struct TableLifecycle<C: StorageClient> {
    client: Arc<C>,
    waiter: WaiterPolicy,
}

impl<C: StorageClient> TableLifecycle<C> {
    pub fn new(
        client: Arc<C>,
        waiter: WaiterPolicy,
    ) -> Self {
        Self { client, waiter }
    }

    /// Describe → delete → await gone → create → await active.
    ///
    /// # Returns
    /// The snapshot the table was rebuilt from.
    ///
    /// # Errors
    /// [`TruncateError::Lifecycle`] tagged with the phase that failed. Nothing
    /// is retried: a missing table, a rejected delete/create or a waiter
    /// timeout all end the operation.
    pub async fn recreate(
        &self,
        table: &str,
    ) -> Result<TableMetadata> {
        let mut phase = LifecyclePhase::Describing;
        let result = self.run(table, &mut phase).await;
        result.map_err(|source| {
            TruncateError::Lifecycle {
                table: table.to_string(),
                phase,
                source: Box::new(source),
            }
            .into()
        })
    }

    async fn run(
        &self,
        table: &str,
        phase: &mut LifecyclePhase,
    ) -> std::result::Result<TableMetadata, Error> {
        let snapshot = self.client.describe_table(table).await?;
        let spec = snapshot.to_create_spec();
        spec.validate()?;
        debug!("captured schema of '{}': {:?}", table, spec);

        *phase = LifecyclePhase::Deleting;
        info!("Deleting the table '{}'...", table);
        self.client.delete_table(table).await?;
        self.client.await_not_exists(table, &self.waiter).await?;
        info!("Table '{}' was deleted.", table);

        *phase = LifecyclePhase::Creating;
        info!("Recreating the table '{}'...", table);
        self.client.create_table(spec).await?;
        self.client.await_exists(table, &self.waiter).await?;

        *phase = LifecyclePhase::Done;
        info!("Table '{}' was recreated successfully.", table);
        Ok(snapshot)
    }
}
