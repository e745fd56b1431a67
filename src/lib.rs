//! Markov simulation of atrial-fibrillation anticoagulation therapies with
//! cost-effectiveness and cost-benefit comparison.

pub mod cba;
pub mod cea;
pub mod cli_input;
pub mod cohort;
pub mod config;
pub mod error;
pub mod health;
pub mod inputs;
pub mod patient;
pub mod rates;
pub mod report;
pub mod stats;
pub mod trace;
