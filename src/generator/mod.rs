pub mod xmltv;

pub use xmltv::{serialize, write_to_path};
