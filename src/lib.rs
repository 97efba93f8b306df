pub mod analyzer;
pub mod cascade;
pub mod catalogue;
pub mod classifier;
pub mod config;
pub mod css;
pub mod dom;
pub mod partition;
pub mod verdict;

pub use analyzer::CloakAnalyzer;
pub use catalogue::{Catalogue, InvisibleConfig};
pub use config::Config;
pub use verdict::{Disposition, EmailVerdict};
