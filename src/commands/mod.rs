mod convert;
mod detect;

pub use convert::run_convert;
pub use detect::run_detect;
