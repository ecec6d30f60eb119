pub mod bank;
pub mod config;
pub mod library;
pub mod template;
pub mod text;

pub use bank::*;
pub use config::*;
pub use library::*;
pub use template::*;
pub use text::*;
