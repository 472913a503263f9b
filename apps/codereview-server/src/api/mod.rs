pub mod meta;
pub mod review;
