pub mod catalog;
pub mod check;
pub mod resolve;
pub mod util;

pub use catalog::*;
pub use check::*;
pub use resolve::*;
pub use util::*;
