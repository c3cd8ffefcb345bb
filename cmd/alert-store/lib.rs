pub mod aggregator;
pub mod amqp;
pub mod broker;
pub mod cli;
pub mod consumer;
pub mod initializers;
pub mod liveness;
pub mod reconciler;
