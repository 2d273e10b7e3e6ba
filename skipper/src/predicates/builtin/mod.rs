pub mod host;
pub mod method;
pub mod path;
