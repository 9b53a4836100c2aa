//! Fieldlock Protocol Core
//!
//! Browser-to-server form-field encryption: the server issues an ephemeral
//! RSA keypair per form render, hands the public half to the browser so
//! sensitive fields are encrypted before submission, and decrypts them with
//! the private half loaded from a session-bound store. The key is voided
//! after one use.
//!
//! # State Machine
//!
//! Each session slot cycles through three states:
//!
//! ```text
//! Empty ──render──▶ KeyIssued ──submit──▶ Consumed ──void──▶ Empty
//!   ▲                                                          │
//!   └──────────────────────────────────────────────────────────┘
//! ```
//!
//! - `Empty → KeyIssued`: [`Orchestrator::render`] generates a fresh key,
//!   stores it in the slot and emits the public-key wire form plus the
//!   field-list descriptor.
//! - `KeyIssued → Consumed`: [`Orchestrator::submit`] loads the key and
//!   decrypts each submitted field.
//! - `Consumed → Empty`: the slot is voided synchronously within the submit
//!   handler, whether or not decryption succeeded. A failed decryption must
//!   not leave the private key live for another try.
//!
//! Re-entry `Empty → KeyIssued` is always legal; one key is live per slot.
//!
//! # Host Integration
//!
//! The HTTP layer is the host's business. The core consumes a request-scoped
//! [`SessionStore`] (get/set/delete plus an explicit commit point) and
//! exposes a [`RenderOutput`] the host embeds into its markup; serving the
//! client-side encryption script is likewise the host's job.
//!
//! # Concurrency
//!
//! Every operation is synchronous. The host must not let two concurrent
//! requests for the same session interleave store/load/void on one slot;
//! without that atomicity a second submission can load a key the first
//! already voided. Key generation is CPU-bound and may be slow for 4096-bit
//! keys; hosts wanting non-blocking behavior run it off the request task.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod key;
pub mod protocol;
pub mod session;
pub mod store;
pub mod wire;

pub use error::Error;
pub use key::KeyMaterial;
pub use protocol::{Orchestrator, RenderOutput};
pub use session::{MemorySessionStore, SessionError, SessionStore, SlotHandle};
pub use store::{KEY_FIELD, SessionKeyStore};
pub use wire::FieldList;
