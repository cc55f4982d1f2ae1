pub mod read;

pub use read::post_read;
