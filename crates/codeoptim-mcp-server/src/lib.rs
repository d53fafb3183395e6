pub mod reports;
pub mod server;

pub use server::CodeOptimMcpServer;
