#![doc = include_str!("../readme.md")]

pub mod config;
pub mod device_manager;
pub mod error;
pub mod events;
pub mod executor;
pub mod experiment;
pub mod load_generator;
pub mod location;
pub mod logger;
pub mod mobility;
pub mod network;
pub mod orchestrator;
pub mod resource_pool;
pub mod simulation;
pub mod stats;
pub mod task;
pub mod utilization;
