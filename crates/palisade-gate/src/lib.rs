//! Palisade Gate - guardrail validation composed in front of the apply engine.
//!
//! The [`MutationGate`] is the crate's single entry point: a batch of
//! operations is screened as a whole by the guardrail validator (every path,
//! plus the file and line budgets) and only an approved batch reaches the
//! apply engine. A rejected batch returns [`GateError::Rejected`] carrying
//! the full validation report, and no file is touched.
//!
//! [`PalisadeConfig`] loads both halves from one TOML document with
//! `[guardrails]` and `[apply]` sections; every key is optional.
//!
//! # Example
//!
//! ```
//! use palisade_gate::{MutationGate, PalisadeConfig};
//!
//! let config = PalisadeConfig::from_toml(
//!     "[apply]\nlanguages = [\"rust\", \"go\"]\n",
//! )?;
//! let gate = MutationGate::from_config(config);
//! assert_eq!(gate.engine().supported_languages(), ["rust", "go"]);
//! # Ok::<(), palisade_gate::GateError>(())
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
/// Error types and results for the gate.
pub mod error;
pub mod gate;

pub use config::PalisadeConfig;
pub use error::{GateError, GateResult};
pub use gate::MutationGate;
