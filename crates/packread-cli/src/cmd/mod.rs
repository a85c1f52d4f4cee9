pub mod sort;
pub mod stream;
