pub mod backend;
pub mod registry;
pub mod selector;
pub mod health_checker;
pub mod manager;


pub use backend::Backend;
pub use registry::{BackendRegistry, LoadBalancerStats, ServiceSnapshot};
pub use selector::BackendSelector;
pub use health_checker::HealthChecker;
pub use manager::LoadBalanceManager;
