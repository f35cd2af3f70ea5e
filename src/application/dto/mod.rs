//! # Data Transfer Objects

pub mod pipeline_config;
