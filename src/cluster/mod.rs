/// Ephemeral cluster records, reports and script-backed operations
pub mod models;
pub mod render;
pub mod scripts;

pub use render::cluster_table;
pub use scripts::ClusterScripts;
