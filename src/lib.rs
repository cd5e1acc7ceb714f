//! Brewbus - coffee-shop event producers
//!
//! Independent producer pipelines that connect to RabbitMQ with bounded
//! retry, provision a durable primary/monitor queue pair, and fan every
//! generated domain event out to both queues with persistent delivery.

pub mod broker;
pub mod config;
pub mod connector;
pub mod domains;
pub mod event;
pub mod producer;
pub mod provision;
pub mod publisher;
pub mod queue;
pub mod utils;
