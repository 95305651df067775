//! Frame counter issuance and key lookup.
//!
//! The acknowledgment generator only depends on the [`SecurityDirectory`]
//! and [`KeyStore`] traits. [`KeyTable`] is a small in-memory
//! implementation of both, suitable for devices with a handful of keys.
use core::cell::RefCell;

use dot15d4_frame::{KeyId, KeyIdMode};
use dot15d4_util::warn;
use heapless::Vec;

/// Length of an IEEE 802.15.4 (AES-128) key.
pub const KEY_LEN: usize = 16;

/// An IEEE 802.15.4 key.
pub type Key = [u8; KEY_LEN];

/// Longest key identifier: an 8 byte key source plus the key index.
const MAX_KEY_ID_LEN: usize = 9;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SecurityError {
    /// No key is known for the given key identifier.
    KeyNotFound,
    /// The frame counter of the key reached its maximum value.
    FrameCounterExhausted,
    /// The key identifier does not match its key identifier mode.
    InvalidKeyId,
    /// No more keys can be stored.
    TableFull,
}

impl core::fmt::Display for SecurityError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SecurityError::KeyNotFound => write!(f, "key not found"),
            SecurityError::FrameCounterExhausted => write!(f, "frame counter exhausted"),
            SecurityError::InvalidKeyId => write!(f, "invalid key identifier"),
            SecurityError::TableFull => write!(f, "key table full"),
        }
    }
}

/// Issues outgoing frame counters.
pub trait SecurityDirectory {
    /// Returns the next frame counter for the given key and advances the
    /// counter.
    ///
    /// A counter value must never be issued twice for the same key.
    fn next_frame_counter(&mut self, key_id: &KeyId<&[u8]>) -> Result<u32, SecurityError>;
}

/// Looks up keys by their identifier.
pub trait KeyStore {
    fn key(&self, key_id: &KeyId<&[u8]>) -> Option<Key>;
}

/// Shared access to a security directory, e.g. to serve counter issuance and
/// cipher preparation from the same table.
impl<T: SecurityDirectory> SecurityDirectory for &RefCell<T> {
    fn next_frame_counter(&mut self, key_id: &KeyId<&[u8]>) -> Result<u32, SecurityError> {
        self.borrow_mut().next_frame_counter(key_id)
    }
}

impl<T: KeyStore> KeyStore for &RefCell<T> {
    fn key(&self, key_id: &KeyId<&[u8]>) -> Option<Key> {
        self.borrow().key(key_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct KeyDescriptor {
    mode: KeyIdMode,
    id: Vec<u8, MAX_KEY_ID_LEN>,
    key: Key,
    frame_counter: u32,
    use_global_frame_counter: bool,
}

impl KeyDescriptor {
    fn matches(&self, key_id: &KeyId<&[u8]>) -> bool {
        self.mode == key_id.mode() && self.id.as_slice() == key_id.as_bytes()
    }
}

/// A fixed capacity key table with per-key and global frame counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTable<const N: usize> {
    keys: Vec<KeyDescriptor, N>,
    global_frame_counter: u32,
}

impl<const N: usize> Default for KeyTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> KeyTable<N> {
    pub const fn new() -> Self {
        Self {
            keys: Vec::new(),
            global_frame_counter: 0,
        }
    }

    /// Adds a key or replaces the key material of a known identifier.
    ///
    /// Keys using the global frame counter share a single counter, all other
    /// keys start counting at zero. Replacing a key keeps its counter.
    pub fn add_key(
        &mut self,
        mode: KeyIdMode,
        id: &[u8],
        key: Key,
        use_global_frame_counter: bool,
    ) -> Result<(), SecurityError> {
        let key_id = KeyId::new(mode, id).map_err(|_| SecurityError::InvalidKeyId)?;

        if let Some(descriptor) = self.keys.iter_mut().find(|d| d.matches(&key_id)) {
            descriptor.key = key;
            descriptor.use_global_frame_counter = use_global_frame_counter;
            return Ok(());
        }

        let descriptor = KeyDescriptor {
            mode,
            id: Vec::from_slice(id).map_err(|_| SecurityError::InvalidKeyId)?,
            key,
            frame_counter: 0,
            use_global_frame_counter,
        };
        self.keys
            .push(descriptor)
            .map_err(|_| SecurityError::TableFull)
    }

    pub fn remove_key(&mut self, key_id: &KeyId<&[u8]>) -> Result<(), SecurityError> {
        let position = self
            .keys
            .iter()
            .position(|d| d.matches(key_id))
            .ok_or(SecurityError::KeyNotFound)?;
        self.keys.swap_remove(position);
        Ok(())
    }

    pub fn global_frame_counter(&self) -> u32 {
        self.global_frame_counter
    }

    pub fn set_global_frame_counter(&mut self, frame_counter: u32) {
        self.global_frame_counter = frame_counter;
    }

    /// The next frame counter that would be issued for the given key.
    pub fn frame_counter(&self, key_id: &KeyId<&[u8]>) -> Option<u32> {
        let descriptor = self.keys.iter().find(|d| d.matches(key_id))?;
        if descriptor.use_global_frame_counter {
            Some(self.global_frame_counter)
        } else {
            Some(descriptor.frame_counter)
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<const N: usize> SecurityDirectory for KeyTable<N> {
    fn next_frame_counter(&mut self, key_id: &KeyId<&[u8]>) -> Result<u32, SecurityError> {
        let Self {
            keys,
            global_frame_counter,
        } = self;

        let descriptor = keys
            .iter_mut()
            .find(|d| d.matches(key_id))
            .ok_or(SecurityError::KeyNotFound)?;
        let frame_counter = if descriptor.use_global_frame_counter {
            global_frame_counter
        } else {
            &mut descriptor.frame_counter
        };

        // Outgoing frames must never carry a frame counter of 0xffffffff.
        if *frame_counter == u32::MAX {
            warn!("frame counter exhausted");
            return Err(SecurityError::FrameCounterExhausted);
        }

        let issued = *frame_counter;
        *frame_counter += 1;
        Ok(issued)
    }
}

impl<const N: usize> KeyStore for KeyTable<N> {
    fn key(&self, key_id: &KeyId<&[u8]>) -> Option<Key> {
        self.keys
            .iter()
            .find(|d| d.matches(key_id))
            .map(|d| d.key)
    }
}
