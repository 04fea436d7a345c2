pub mod confidence;
pub mod odds;
pub mod store;
