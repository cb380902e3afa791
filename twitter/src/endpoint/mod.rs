pub mod relation;
pub mod timeline;
pub mod users;
