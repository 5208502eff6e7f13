//! Data types shared by the pipeline stages and their collaborators.

pub mod crawl;
pub mod fingerprint;
pub mod publish;
pub mod record;
pub mod run;
