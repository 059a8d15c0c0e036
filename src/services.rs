pub mod dashboard_service;
pub mod selection_service;

pub use dashboard_service::DashboardService;
pub use selection_service::SelectionService;
