//! Protocol orchestration: the shared logic of the render and submit
//! handlers.
//!
//! Drives the per-slot state machine described in the crate docs:
//! `Empty → KeyIssued → Consumed(→ Empty)`. The orchestrator owns the
//! single-use guarantee — every successful load is followed by a void
//! before the request completes, whatever the decryption outcome.

use crate::{
    error::Error,
    key::KeyMaterial,
    session::{SessionStore, SlotHandle},
    store::SessionKeyStore,
    wire::FieldList,
};

/// Everything the host needs to render an encrypted form.
///
/// The host embeds the wire string and the field list into its markup and
/// serves the client-side encryption script; neither is interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    /// Public key wire form, `<modulus-hex>:<exponent-hex>`.
    pub public_key: String,
    /// Ordered names of the form fields the client must encrypt.
    pub fields: FieldList,
}

/// Shared logic of the render and submit request handlers.
///
/// Configured once with the key bit length and the fields to protect,
/// then driven per request with the host's session store and slot handle.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    bit_length: usize,
    fields: FieldList,
}

impl Orchestrator {
    /// Configure the protocol for keys of `bit_length` bits protecting
    /// `fields`.
    pub fn new(bit_length: usize, fields: FieldList) -> Self {
        Self { bit_length, fields }
    }

    /// Fields configured for encryption.
    pub fn fields(&self) -> &FieldList {
        &self.fields
    }

    /// Handle a render request: `Empty → KeyIssued`.
    ///
    /// Generates a fresh key, stores it in the slot (overwriting any
    /// previous, unconsumed key) and returns the material for the response.
    ///
    /// # Errors
    ///
    /// Any generation or storage failure aborts the request with the
    /// specific error; there is no fallback to a previously issued key.
    pub fn render<S: SessionStore>(
        &self,
        session: &S,
        slot: &SlotHandle,
    ) -> Result<RenderOutput, Error> {
        let mut key = KeyMaterial::new(self.bit_length);
        key.generate()?;

        SessionKeyStore::new(session, slot.clone()).store(&key)?;
        tracing::debug!(bit_length = self.bit_length, ?slot, "issued form encryption key");

        Ok(RenderOutput { public_key: key.public_key_wire_form()?, fields: self.fields.clone() })
    }

    /// Handle a submit request: `KeyIssued → Consumed → Empty`.
    ///
    /// Loads the key, decrypts each `(field name, ciphertext hex)` pair in
    /// order, and voids the slot before returning — also when decryption
    /// fails, since a live private key must not survive for a second guess
    /// against it.
    ///
    /// # Errors
    ///
    /// - [`Error::NoKey`]: no prior render in this session (replayed or
    ///   out-of-order submission); nothing is decrypted
    /// - [`Error::Decode`] / [`Error::Decryption`]: a field failed; the
    ///   slot is still voided. If that void itself fails, the persistence
    ///   error is logged and the decryption error is returned — neither
    ///   suppresses the other
    /// - [`Error::Persistence`]: backend failure while loading or voiding
    pub fn submit<S: SessionStore>(
        &self,
        session: &S,
        slot: &SlotHandle,
        submitted: &[(&str, &str)],
    ) -> Result<Vec<(String, Vec<u8>)>, Error> {
        let store = SessionKeyStore::new(session, slot.clone());
        let key = store.load()?;

        let mut plaintexts = Vec::with_capacity(submitted.len());
        let mut failure = None;
        for &(name, ciphertext_hex) in submitted {
            match key.decrypt(ciphertext_hex) {
                Ok(plaintext) => plaintexts.push((name.to_string(), plaintext)),
                Err(err) => {
                    failure = Some(err);
                    break;
                },
            }
        }

        let void_result = store.void();

        match (failure, void_result) {
            (None, Ok(())) => {
                tracing::debug!(?slot, fields = plaintexts.len(), "consumed form encryption key");
                Ok(plaintexts)
            },
            (None, Err(void_err)) => Err(void_err),
            (Some(err), Ok(())) => Err(err),
            (Some(err), Err(void_err)) => {
                tracing::error!(
                    error = %void_err,
                    ?slot,
                    "failed to void session key after decryption error"
                );
                Err(err)
            },
        }
    }
}
