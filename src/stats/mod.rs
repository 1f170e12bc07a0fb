pub mod cold_hot;
pub mod dashboard;
pub mod forecast;

pub use dashboard::{load_dashboard, DashboardQuery, DashboardStats};
pub use forecast::ForecastRange;
