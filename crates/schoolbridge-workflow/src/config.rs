//! Workflow configuration.

/// Limits applied by the request ledger, application workflow and facade.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Page size used when a listing does not ask for one (default: 50).
    pub default_page_size: u64,
    /// Upper bound on any requested page size (default: 100).
    pub max_page_size: u64,
    /// Maximum request description length in characters (default: 2000).
    pub max_description_len: usize,
    /// Maximum fulfillment feedback length in characters (default: 2000).
    pub max_feedback_len: usize,
    /// How many times an approval or fulfillment transaction is retried
    /// when the datastore fails it, e.g. on a write conflict (default: 1).
    pub fulfillment_retries: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 100,
            max_description_len: 2000,
            max_feedback_len: 2000,
            fulfillment_retries: 1,
        }
    }
}
