pub mod audit;
pub mod fastx;

pub use audit::AuditWriter;
pub use fastx::*;
