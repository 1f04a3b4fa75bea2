mod jst;
pub mod serde;

pub use jst::Jst;
