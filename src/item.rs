//! Item capability: how queue elements become list values and back.
//!
//! The queue never looks inside an item. It only asks the item to encode
//! itself on push and to decode a stored value on scan.

use std::borrow::Cow;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Error raised by an item's own encode/decode logic.
pub type ItemError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A value that can travel through a [`Queue`](crate::queue::Queue).
pub trait Item: Send + Sync {
    /// Render the item as the text stored in the backing list.
    fn encode(&self) -> Result<String, ItemError>;

    /// Overwrite `self` with the item stored as `text`.
    fn decode(&mut self, text: &str) -> Result<(), ItemError>;

    /// Tag compared on every push against the tag of the queue's witness.
    ///
    /// Defaults to the Rust type name, so a queue of `T` accepts every `T`.
    /// Enum item types can return a per-variant tag to pin a queue to one
    /// variant.
    fn type_tag(&self) -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }
}

/// Opt-in marker: serde types that implement this are stored as JSON.
///
/// ```ignore
/// #[derive(Default, Serialize, Deserialize)]
/// struct Job { name: String }
/// impl JsonItem for Job {}
/// ```
pub trait JsonItem: Serialize + DeserializeOwned + Send + Sync {}

impl<T: JsonItem> Item for T {
    fn encode(&self) -> Result<String, ItemError> {
        Ok(serde_json::to_string(self)?)
    }

    fn decode(&mut self, text: &str) -> Result<(), ItemError> {
        *self = serde_json::from_str(text)?;
        Ok(())
    }
}

impl JsonItem for serde_json::Value {}
