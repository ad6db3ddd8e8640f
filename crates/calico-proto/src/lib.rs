pub mod config;
pub mod metadata;
pub mod platform;
pub mod protocol;
pub mod quality;
pub mod rating;
pub mod state;
pub mod view;
