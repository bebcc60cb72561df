// アプリケーション層モジュール
pub mod dashboard_mapper;
pub mod queue_mapper;
pub mod stack_synthesizer;
pub mod static_site_mapper;
pub mod table_mapper;

// 再エクスポート
pub use dashboard_mapper::{DashboardConstruct, DashboardMapper, DashboardSources};
pub use queue_mapper::{QueueConstruct, QueueHandle, QueueMapper};
pub use stack_synthesizer::{StackSpec, StackSynthesizer, SynthError, SynthesizedStack};
pub use static_site_mapper::{BucketHandle, DistributionHandle, StaticSiteConstruct, StaticSiteMapper};
pub use table_mapper::{TableConstruct, TableHandle, TableMapper};
