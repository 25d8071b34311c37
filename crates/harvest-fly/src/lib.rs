pub mod backend;
pub mod response;

pub use backend::FlyBackend;
