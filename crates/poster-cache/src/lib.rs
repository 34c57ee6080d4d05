pub mod config;
pub mod errors;
pub mod job_scheduling;
pub mod services;
pub mod sources;
pub mod web;
