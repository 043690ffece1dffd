pub mod addr;

pub use addr::*;
