pub mod fifo;
pub mod inventory_service;
pub use inventory_service::InventoryService;
pub mod report_service;
pub use report_service::ReportService;
