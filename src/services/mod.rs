pub mod catalog;
pub mod image_service;
pub mod listing;
pub mod preferences;
pub mod profile;
pub mod recommend;
pub mod usage_log;

// 重新导出主要的服务结构体，以便可以直接从 services 模块导入
pub use catalog::CatalogService;
pub use image_service::ImageService;
pub use listing::ListingService;
pub use preferences::PreferenceStore;
pub use profile::ProfileService;
pub use recommend::RecommendService;
pub use usage_log::{UsageLogService, UsageNotifier};
