pub mod collector;
pub mod request;
