pub mod bank_ops;
pub mod linkage;
pub mod reconcile;
pub mod selection;
pub mod template_ops;

pub use bank_ops::*;
pub use linkage::*;
pub use reconcile::*;
pub use selection::*;
pub use template_ops::*;
