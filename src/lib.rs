use std::{
    fmt::{Debug, Display},
    sync::Arc,
};

pub use command::Command;
pub use dispatch::{forwarding, Forwarding};
pub use error::{Error, Result};
pub use implementations::memory::Memory;
pub use key::Key;
#[cfg(feature = "macros")]
pub use nestkv_macros::{path, segment};
pub use nestkv_types::{KeyPath, KeyPathBuf, ParseSegmentError, Segment, SegmentBuf, Selector};
use serde_json::Value;
use url::Url;

mod command;
mod dispatch;
mod error;
mod implementations;
mod key;

/// A client that executes operations against a key-value store.
///
/// [`Key`] builds one [`Command`] per operation and hands it over; the
/// client returns the store's raw result, in whatever shape the store
/// gives it. Errors raised by the store pass through unchanged.
pub trait StoreClient {
    fn execute(&self, command: Command) -> Result<Value>;
}

/// A [`StoreClient`] that keys can share across threads.
pub trait SharedStoreClient: StoreClient + Debug + Send + Sync + Display {}

impl<T> SharedStoreClient for T where T: StoreClient + Debug + Send + Sync + Display {}

/// Open a store client by URI.
///
/// `memory://<name>` opens the in-process store registered under that
/// name; clients opened with the same name share their data. Other
/// schemes belong to external clients and are not resolved here.
///
/// # Example
/// ```
/// use nestkv::{open, segment, Key, Segment};
/// use url::Url;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = open(&Url::parse("memory://sessions")?)?;
/// let key = Key::new(segment!("nest-test"), client);
///
/// key.sub("getset")?.set(1)?;
/// assert_eq!(key.sub("getset")?.get()?, "1");
/// # Ok(())
/// # }
/// ```
pub fn open(storage_uri: &Url) -> Result<Arc<dyn SharedStoreClient>> {
    match storage_uri.scheme() {
        "memory" => Ok(Arc::new(Memory::open(
            storage_uri.host_str().unwrap_or_default(),
        )?)),
        scheme => Err(Error::UnknownScheme(scheme.to_owned())),
    }
}
