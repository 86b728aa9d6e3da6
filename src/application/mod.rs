//! Application layer containing the split-tender orchestration.
//!
//! This module defines the `SplitTenderEngine`, the single entry point for
//! creating and simulating charges split between the balance ledger and
//! the card processor.

pub mod orchestrator;
