pub mod auth;
pub mod metrics;
pub mod dashboard_service;
pub mod dashboard_monitor;
pub mod employee_service;
