//! Collaborator contracts.
//!
//! These are INFRASTRUCTURE traits only: storage, crawling, LLM analysis and
//! the publishing system. The engine owns the decisions; implementations own
//! the IO. All of them return `anyhow::Result` and are injected as
//! `Arc<dyn Trait>` through [`crate::deps::AutomationDeps`].

pub mod analyzer;
pub mod crawler;
pub mod publisher;
pub mod store;
