//! Store trait for executing query descriptors

use crate::core::error::StorageError;
use crate::core::query::QueryDescriptor;
use async_trait::async_trait;

/// A data-access layer able to run a [`QueryDescriptor`]
///
/// Implementations lower the descriptor's filter tree, sort keys,
/// projection and window into their own query language.
#[async_trait]
pub trait QueryExecutor<T>: Send + Sync {
    /// Run the descriptor
    ///
    /// # Returns
    /// The rows inside the pagination window, and the number of rows
    /// matching the filter when the window is ignored.
    async fn execute(&self, descriptor: &QueryDescriptor) -> Result<(Vec<T>, u64), StorageError>;
}
