pub mod user_repo;
pub use user_repo::UserRepository;
pub mod dashboard_repo;
pub use dashboard_repo::{DashboardRepository, MetricsSource};
pub mod employee_repo;
pub use employee_repo::EmployeeRepository;
