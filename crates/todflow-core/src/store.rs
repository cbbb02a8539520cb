use std::any::Any;
use std::collections::HashMap;

use crate::error::StoreError;

/// Marker for values that can live in a [`DataStore`] slot.
///
/// Blanket-implemented for every `'static + Send` type, so a routine can
/// stash whatever intermediate artifact it produces without registering the
/// type anywhere first.
pub trait Artifact: Any + Send {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any + Send> Artifact for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Shared scratch space for one unit's pass through the routine sequence.
///
/// Routines communicate exclusively through named keys. Reading a key that
/// was never written is a configuration bug and surfaces as
/// [`StoreError::MissingKey`], never as a default value. The driver creates
/// a fresh store per unit and drops it when the pass ends, so nothing leaks
/// between units.
#[derive(Default)]
pub struct DataStore {
    slots: HashMap<String, Box<dyn Artifact>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the artifact under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Artifact) {
        self.slots.insert(key.into(), Box::new(value));
    }

    /// Borrows the artifact under `key` as a `T`.
    pub fn get<T: Any + Send>(&self, key: &str) -> Result<&T, StoreError> {
        let slot = self.slots.get(key).ok_or_else(|| StoreError::MissingKey {
            key: key.to_string(),
        })?;
        slot.as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| StoreError::TypeMismatch {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Mutably borrows the artifact under `key` as a `T`.
    pub fn get_mut<T: Any + Send>(&mut self, key: &str) -> Result<&mut T, StoreError> {
        let slot = self
            .slots
            .get_mut(key)
            .ok_or_else(|| StoreError::MissingKey {
                key: key.to_string(),
            })?;
        slot.as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| StoreError::TypeMismatch {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Removes the artifact under `key` and hands ownership to the caller.
    ///
    /// The slot is only vacated when the stored artifact really is a `T`;
    /// on a type mismatch the artifact stays in place.
    pub fn take<T: Any + Send>(&mut self, key: &str) -> Result<T, StoreError> {
        let matches = self
            .slots
            .get(key)
            .ok_or_else(|| StoreError::MissingKey {
                key: key.to_string(),
            })?
            .as_any()
            .is::<T>();
        if !matches {
            return Err(StoreError::TypeMismatch {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
            });
        }
        let slot = self.slots.remove(key).ok_or_else(|| StoreError::MissingKey {
            key: key.to_string(),
        })?;
        match slot.into_any().downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(StoreError::TypeMismatch {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
            }),
        }
    }

    /// Existence check that never raises.
    pub fn has(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
