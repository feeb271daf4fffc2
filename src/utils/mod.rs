pub mod data;
pub mod odds;
