//! Client for a remote legal-document analysis service.
//!
//! A document is uploaded together with a set of analysis agents, the resulting
//! task is polled until it settles, and each agent's result is classified and
//! rendered for display.

pub mod api;
pub mod config;
pub mod download;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod results;

pub use api::{AnalysisApi, DocumentUpload, HttpAnalysisApi};
pub use config::Config;
pub use error::{AnalysisError, ApiError};
pub use lifecycle::{LifecycleState, Task, TaskLifecycleClient, TaskStatus};
pub use notify::{EventType, Notification, NotificationLevel, NotificationSink};
pub use results::{AgentReport, AgentResult};
