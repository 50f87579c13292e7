//! Core pipeline orchestration for lead-refresh.
//!
//! This crate ties together the lead list, the scrapers cache and the CRM
//! into the end-to-end batch workflow (`run_batch`).

pub mod batch;
pub mod input;
pub mod mapping;
pub mod pipeline;
pub mod update;
