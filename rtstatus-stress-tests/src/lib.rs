pub mod metrics;
pub mod reconcile;
pub mod server;
pub mod worker;
pub mod workload;
