//! Per-cell hooks.
//!
//! A cell's optional behaviour is one capability object, [`CellOptions`]:
//! a [`Codec`] strategy applied where values cross the persistence boundary,
//! plus `on_load`/`on_change` callbacks. Encoding and decoding live on the
//! same trait, so a cell can never encode without the matching decode.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// A codec rejected a value (malformed or tampered ciphertext, etc.).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CodecError {
    message: String,
}

impl CodecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Transform applied to values on their way into and out of the store.
///
/// `decode(encode(v))` must yield `v`. Callbacks only ever see decoded values.
pub trait Codec<T>: Send + Sync {
    /// Logical value -> stored form. Runs before every `Store::set`.
    fn encode(&self, value: &T) -> Result<T, CodecError>;

    /// Stored form -> logical value. Runs after every `Store::get`.
    fn decode(&self, stored: T) -> Result<T, CodecError>;
}

/// Codec built from a pair of closures.
pub struct FnCodec<E, D> {
    encode: E,
    decode: D,
}

impl<E, D> FnCodec<E, D> {
    pub fn new(encode: E, decode: D) -> Self {
        Self { encode, decode }
    }
}

impl<T, E, D> Codec<T> for FnCodec<E, D>
where
    E: Fn(&T) -> Result<T, CodecError> + Send + Sync,
    D: Fn(T) -> Result<T, CodecError> + Send + Sync,
{
    fn encode(&self, value: &T) -> Result<T, CodecError> {
        (self.encode)(value)
    }

    fn decode(&self, stored: T) -> Result<T, CodecError> {
        (self.decode)(stored)
    }
}

/// Applies an element codec to every item of a list, e.g. encrypting the
/// API key of each configured provider.
pub struct VecCodec<C> {
    element: C,
}

impl<C> VecCodec<C> {
    pub fn new(element: C) -> Self {
        Self { element }
    }
}

impl<T, C: Codec<T>> Codec<Vec<T>> for VecCodec<C> {
    fn encode(&self, value: &Vec<T>) -> Result<Vec<T>, CodecError> {
        value.iter().map(|item| self.element.encode(item)).collect()
    }

    fn decode(&self, stored: Vec<T>) -> Result<Vec<T>, CodecError> {
        stored
            .into_iter()
            .map(|item| self.element.decode(item))
            .collect()
    }
}

/// Callback receiving a decoded value.
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Optional hooks for one cell.
pub struct CellOptions<T> {
    codec: Option<Arc<dyn Codec<T>>>,
    on_load: Option<Callback<T>>,
    on_change: Option<Callback<T>>,
}

impl<T> Default for CellOptions<T> {
    fn default() -> Self {
        Self {
            codec: None,
            on_load: None,
            on_change: None,
        }
    }
}

impl<T> Clone for CellOptions<T> {
    fn clone(&self) -> Self {
        Self {
            codec: self.codec.clone(),
            on_load: self.on_load.clone(),
            on_change: self.on_change.clone(),
        }
    }
}

impl<T> fmt::Debug for CellOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellOptions")
            .field("codec", &self.codec.is_some())
            .field("on_load", &self.on_load.is_some())
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

impl<T> CellOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encrypt/decrypt (or otherwise transform) values at the store boundary.
    #[must_use]
    pub fn with_codec(mut self, codec: impl Codec<T> + 'static) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    /// Called once if the initial load finds a stored value.
    #[must_use]
    pub fn on_load(mut self, callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_load = Some(Arc::new(callback));
        self
    }

    /// Called after a stored value is loaded, after each successful local
    /// persist, and after each applied remote change.
    #[must_use]
    pub fn on_change(mut self, callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Arc::new(callback));
        self
    }

    pub fn has_codec(&self) -> bool {
        self.codec.is_some()
    }
}

impl<T: Clone> CellOptions<T> {
    pub(crate) fn encode(&self, value: &T) -> Result<T, CodecError> {
        match &self.codec {
            Some(codec) => codec.encode(value),
            None => Ok(value.clone()),
        }
    }

    pub(crate) fn decode(&self, stored: T) -> Result<T, CodecError> {
        match &self.codec {
            Some(codec) => codec.decode(stored),
            None => Ok(stored),
        }
    }

    pub(crate) fn fire_load(&self, value: &T) {
        if let Some(callback) = &self.on_load {
            callback(value);
        }
    }

    pub(crate) fn fire_change(&self, value: &T) {
        if let Some(callback) = &self.on_change {
            callback(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn reversing() -> FnCodec<
        impl Fn(&String) -> Result<String, CodecError> + Send + Sync,
        impl Fn(String) -> Result<String, CodecError> + Send + Sync,
    > {
        FnCodec::new(
            |value: &String| -> Result<String, CodecError> {
                Ok(format!("enc:{}", value.chars().rev().collect::<String>()))
            },
            |stored: String| -> Result<String, CodecError> {
                stored
                    .strip_prefix("enc:")
                    .map(|body| body.chars().rev().collect::<String>())
                    .ok_or_else(|| CodecError::new("missing enc: prefix"))
            },
        )
    }

    #[test]
    fn test_without_codec_is_identity() {
        let options = CellOptions::<String>::new();
        assert!(!options.has_codec());
        assert_eq!(options.encode(&"sk-1".to_string()).unwrap(), "sk-1");
        assert_eq!(options.decode("sk-1".to_string()).unwrap(), "sk-1");
    }

    #[test]
    fn test_fn_codec_pairs() {
        let options = CellOptions::<String>::new().with_codec(reversing());
        let stored = options.encode(&"sk-123".to_string()).unwrap();

        assert_eq!(stored, "enc:321-ks");
        assert_eq!(options.decode(stored).unwrap(), "sk-123");
        assert!(options.decode("plain".to_string()).is_err());
    }

    #[test]
    fn test_vec_codec_maps_elements() {
        let codec = VecCodec::new(reversing());
        let keys = vec!["ab".to_string(), "cd".to_string()];

        let stored = codec.encode(&keys).unwrap();
        assert_eq!(stored, vec!["enc:ba".to_string(), "enc:dc".to_string()]);
        assert_eq!(codec.decode(stored).unwrap(), keys);

        // One bad element fails the whole list
        let tampered = vec!["enc:ba".to_string(), "dc".to_string()];
        assert!(codec.decode(tampered).is_err());
    }

    #[test]
    fn test_callbacks_fire() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let loads = Arc::clone(&seen);
        let changes = Arc::clone(&seen);
        let options = CellOptions::new()
            .on_load(move |v: &i32| loads.lock().unwrap().push(("load", *v)))
            .on_change(move |v: &i32| changes.lock().unwrap().push(("change", *v)));

        options.fire_load(&1);
        options.fire_change(&2);

        assert_eq!(*seen.lock().unwrap(), vec![("load", 1), ("change", 2)]);
    }
}
