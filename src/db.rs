pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod report_repo;
pub use report_repo::ReportRepository;
