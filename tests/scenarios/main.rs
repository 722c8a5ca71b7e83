//! Scenario-based tests for medallion

mod helpers;

mod conditional_branching;
mod csv_ingestion;
mod failure_handling;
mod max_retries;
mod retry_behavior;
mod success_chain;
