//! Session-bound key store.
//!
//! Binds a [`KeyMaterial`] to one session slot under the well-known field
//! [`KEY_FIELD`] with store/load/void operations. Loading never clears the
//! slot: voiding is the orchestrator's explicit duty, which keeps the
//! single-use contract visible at the call site.
//!
//! The persisted record is a fixed, versioned schema defined once here at
//! the store boundary; no runtime type registration is involved and the
//! host session layer only ever sees opaque bytes.

use fieldlock_crypto::{KeyComponents, RsaKeyPair};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{
    error::Error,
    key::KeyMaterial,
    session::{SessionStore, SlotHandle},
};

/// Well-known session field under which the key record is stored.
pub const KEY_FIELD: &str = "fieldlock/key";

/// Schema version of the persisted record.
const STORED_KEY_VERSION: u8 = 1;

/// Persisted key record, version 1.
///
/// Every keypair component as big-endian bytes plus the generated marker,
/// CBOR-encoded. Zeroized on drop.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct StoredKey {
    version: u8,
    bit_length: u32,
    generated: bool,
    modulus: Vec<u8>,
    public_exponent: Vec<u8>,
    private_exponent: Vec<u8>,
    prime_p: Vec<u8>,
    prime_q: Vec<u8>,
    exponent_p: Vec<u8>,
    exponent_q: Vec<u8>,
    crt_coefficient: Vec<u8>,
}

impl StoredKey {
    fn from_key(key: &KeyMaterial) -> Self {
        let mut record = Self {
            version: STORED_KEY_VERSION,
            bit_length: key.bit_length() as u32,
            generated: false,
            modulus: Vec::new(),
            public_exponent: Vec::new(),
            private_exponent: Vec::new(),
            prime_p: Vec::new(),
            prime_q: Vec::new(),
            exponent_p: Vec::new(),
            exponent_q: Vec::new(),
            crt_coefficient: Vec::new(),
        };

        if let Some(keypair) = key.keypair() {
            let components = keypair.components();
            record.generated = true;
            record.modulus = components.modulus.clone();
            record.public_exponent = components.public_exponent.clone();
            record.private_exponent = components.private_exponent.clone();
            record.prime_p = components.prime_p.clone();
            record.prime_q = components.prime_q.clone();
            record.exponent_p = components.exponent_p.clone();
            record.exponent_q = components.exponent_q.clone();
            record.crt_coefficient = components.crt_coefficient.clone();
        }

        record
    }

    fn into_key(self) -> Result<KeyMaterial, Error> {
        if self.version != STORED_KEY_VERSION {
            return Err(Error::persistence(
                "load",
                format!("unsupported key record version {}", self.version),
            ));
        }

        let bit_length = self.bit_length as usize;
        if !self.generated {
            return Ok(KeyMaterial::from_parts(bit_length, None));
        }

        let components = KeyComponents {
            modulus: self.modulus.clone(),
            public_exponent: self.public_exponent.clone(),
            private_exponent: self.private_exponent.clone(),
            prime_p: self.prime_p.clone(),
            prime_q: self.prime_q.clone(),
            exponent_p: self.exponent_p.clone(),
            exponent_q: self.exponent_q.clone(),
            crt_coefficient: self.crt_coefficient.clone(),
        };
        let keypair =
            RsaKeyPair::from_components(&components).map_err(|err| Error::persistence("load", err))?;

        Ok(KeyMaterial::from_parts(bit_length, Some(keypair)))
    }
}

/// Store/load/void operations for the key bound to one session slot.
///
/// One slot holds at most one key at a time; storing overwrites any
/// previous, unconsumed key. There is no queueing.
pub struct SessionKeyStore<'a, S: SessionStore> {
    session: &'a S,
    slot: SlotHandle,
}

impl<'a, S: SessionStore> SessionKeyStore<'a, S> {
    /// Bind to `slot` within the request's `session`.
    pub fn new(session: &'a S, slot: SlotHandle) -> Self {
        Self { session, slot }
    }

    /// Persist `key` into the slot, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// - [`Error::Persistence`]: the session layer could not store or
    ///   commit; the message names the failing stage
    pub fn store(&self, key: &KeyMaterial) -> Result<(), Error> {
        let record = StoredKey::from_key(key);
        let mut blob = Zeroizing::new(Vec::new());
        ciborium::ser::into_writer(&record, &mut *blob)
            .map_err(|err| Error::persistence("encode", err))?;

        self.session
            .set(&self.slot, KEY_FIELD, &blob)
            .map_err(|err| Error::persistence("store", err))?;
        self.session.commit(&self.slot).map_err(|err| Error::persistence("store commit", err))
    }

    /// Load the stored key. Does not clear the slot.
    ///
    /// # Errors
    ///
    /// - [`Error::NoKey`]: the slot is empty or was voided — the normal
    ///   outcome for a stale or replayed submission
    /// - [`Error::Persistence`]: backend failure, or a blob that does not
    ///   decode to a supported record
    pub fn load(&self) -> Result<KeyMaterial, Error> {
        let blob = self
            .session
            .get(&self.slot, KEY_FIELD)
            .map_err(|err| Error::persistence("load", err))?;
        let Some(blob) = blob else {
            return Err(Error::NoKey);
        };
        let blob = Zeroizing::new(blob);

        let record: StoredKey = ciborium::de::from_reader(blob.as_slice())
            .map_err(|err| Error::persistence("decode", err))?;
        record.into_key()
    }

    /// Clear the slot.
    ///
    /// Voiding an already-empty slot succeeds: empty is the normal end
    /// state after a completed exchange.
    ///
    /// # Errors
    ///
    /// - [`Error::Persistence`]: the session layer could not commit the
    ///   removal
    pub fn void(&self) -> Result<(), Error> {
        self.session
            .delete(&self.slot, KEY_FIELD)
            .map_err(|err| Error::persistence("void", err))?;
        self.session.commit(&self.slot).map_err(|err| Error::persistence("void commit", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemorySessionStore, testing::FlakySessionStore};

    fn generated_key() -> KeyMaterial {
        let mut key = KeyMaterial::new(512);
        key.generate().unwrap();
        key
    }

    #[test]
    fn store_load_round_trip() {
        let session = MemorySessionStore::new();
        let store = SessionKeyStore::new(&session, SlotHandle::Default);
        let key = generated_key();

        store.store(&key).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, key);
    }

    #[test]
    fn store_overwrites_previous_key() {
        let session = MemorySessionStore::new();
        let store = SessionKeyStore::new(&session, SlotHandle::Default);
        let first = generated_key();
        let second = generated_key();

        store.store(&first).unwrap();
        store.store(&second).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, second);
        assert_ne!(loaded, first);
    }

    #[test]
    fn load_from_empty_slot_is_no_key() {
        let session = MemorySessionStore::new();
        let store = SessionKeyStore::new(&session, SlotHandle::Default);
        assert_eq!(store.load().unwrap_err(), Error::NoKey);
    }

    #[test]
    fn load_after_void_is_no_key() {
        let session = MemorySessionStore::new();
        let store = SessionKeyStore::new(&session, SlotHandle::Default);

        store.store(&generated_key()).unwrap();
        store.void().unwrap();
        assert_eq!(store.load().unwrap_err(), Error::NoKey);
    }

    #[test]
    fn void_is_idempotent() {
        let session = MemorySessionStore::new();
        let store = SessionKeyStore::new(&session, SlotHandle::Default);

        store.void().unwrap();

        store.store(&generated_key()).unwrap();
        store.void().unwrap();
        store.void().unwrap();
    }

    #[test]
    fn load_does_not_clear_the_slot() {
        let session = MemorySessionStore::new();
        let store = SessionKeyStore::new(&session, SlotHandle::Default);

        store.store(&generated_key()).unwrap();
        store.load().unwrap();
        store.load().unwrap();
    }

    #[test]
    fn ungenerated_key_round_trips_as_ungenerated() {
        let session = MemorySessionStore::new();
        let store = SessionKeyStore::new(&session, SlotHandle::Default);

        store.store(&KeyMaterial::new(2048)).unwrap();
        let loaded = store.load().unwrap();
        assert!(!loaded.is_generated());
        assert_eq!(loaded.bit_length(), 2048);
    }

    #[test]
    fn named_slots_are_isolated() {
        let session = MemorySessionStore::new();
        let default_store = SessionKeyStore::new(&session, SlotHandle::Default);
        let named_store = SessionKeyStore::new(&session, SlotHandle::named("checkout"));

        default_store.store(&generated_key()).unwrap();
        assert_eq!(named_store.load().unwrap_err(), Error::NoKey);

        default_store.void().unwrap();
        named_store.store(&generated_key()).unwrap();
        named_store.load().unwrap();
        assert_eq!(default_store.load().unwrap_err(), Error::NoKey);
    }

    #[test]
    fn corrupt_blob_is_persistence_error() {
        let session = MemorySessionStore::new();
        session.set(&SlotHandle::Default, KEY_FIELD, b"not cbor at all").unwrap();

        let store = SessionKeyStore::new(&session, SlotHandle::Default);
        assert!(matches!(store.load().unwrap_err(), Error::Persistence { stage: "decode", .. }));
    }

    #[test]
    fn unsupported_record_version_is_persistence_error() {
        let session = MemorySessionStore::new();
        let store = SessionKeyStore::new(&session, SlotHandle::Default);
        store.store(&generated_key()).unwrap();

        // Rewrite the blob with a bumped version byte
        let blob = session.get(&SlotHandle::Default, KEY_FIELD).unwrap().unwrap();
        let mut record: StoredKey = ciborium::de::from_reader(blob.as_slice()).unwrap();
        record.version = 99;
        let mut tampered = Vec::new();
        ciborium::ser::into_writer(&record, &mut tampered).unwrap();
        session.set(&SlotHandle::Default, KEY_FIELD, &tampered).unwrap();

        assert!(matches!(store.load().unwrap_err(), Error::Persistence { stage: "load", .. }));
    }

    #[test]
    fn failing_commit_is_persistence_error() {
        let session = FlakySessionStore { fail_commit: true, ..FlakySessionStore::default() };
        let store = SessionKeyStore::new(&session, SlotHandle::Default);

        assert!(matches!(
            store.store(&generated_key()).unwrap_err(),
            Error::Persistence { stage: "store commit", .. }
        ));
        assert!(matches!(
            store.void().unwrap_err(),
            Error::Persistence { stage: "void commit", .. }
        ));
    }

    #[test]
    fn failing_backend_is_distinct_from_no_key() {
        let session = FlakySessionStore { fail_get: true, ..FlakySessionStore::default() };
        let store = SessionKeyStore::new(&session, SlotHandle::Default);

        let err = store.load().unwrap_err();
        assert!(matches!(err, Error::Persistence { stage: "load", .. }));
        assert!(!err.is_stale_submission());
    }
}
