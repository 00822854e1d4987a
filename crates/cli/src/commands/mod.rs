//! CLI Commands

pub mod aggregate;
pub mod dispatch;
pub mod notify;
pub mod publish;
pub mod record;
pub mod run;
