pub mod analysis;
pub mod configuration;
pub mod controller;
pub mod detection;
pub mod error_handling;
pub mod events;
pub mod storage;
pub mod web_interface;
