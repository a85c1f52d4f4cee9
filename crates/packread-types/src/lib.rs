pub mod blob;
pub mod cancel;
pub mod error;
pub mod handle;
pub mod id;
