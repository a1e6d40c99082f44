pub mod mongodb;
pub mod poll;
pub mod store;
