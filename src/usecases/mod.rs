//! Use Cases Layer - Polling Engine
//!
//! Orchestrates domain types with the `QuoteProvider` port to run
//! the concurrent multi-series polling engine.
//!
//! Use cases:
//! - `ProviderChain`: ordered fallback across quote providers
//! - `SeriesPoller`: per-series fetch/backoff state machine
//! - `PollSupervisor`: lifecycle and control surface for all pollers

pub mod provider_chain;
pub mod series_poller;
pub mod supervisor;

pub use provider_chain::{AllProvidersFailed, ChainQuote, ProviderAttempt, ProviderChain, ProviderFailure};
pub use series_poller::{PollSettings, PollerHandle, PollerState, SeriesPoller};
pub use supervisor::{PollSupervisor, ShutdownReport, SupervisorError};
