use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
    hash::{Hash, Hasher},
    sync::Arc,
};

use nestkv_types::{KeyPath, KeyPathBuf, Selector};
use serde_json::Value;

use crate::{
    dispatch::{self, Forwarding},
    Command, Error, Result, SharedStoreClient,
};

/// A hierarchical key bound to a store client.
///
/// A `Key` is a plain value: it carries the colon-joined name of a store
/// entry plus a handle to the client that reaches the store. Indexing it
/// with a scalar derives a longer key on the same client; calling a store
/// operation on it forwards that operation to the client, with the key's
/// own name injected where the operation addresses a single key.
///
/// # Example
/// ```
/// use std::sync::Arc;
///
/// use nestkv::{Key, Memory, Segment};
///
/// # fn main() -> Result<(), nestkv::Error> {
/// let client = Arc::new(Memory::new());
/// let event = Key::new(Segment::parse("event")?, client);
/// let attendees = event.sub(3)?.sub("attendees")?;
///
/// assert_eq!(attendees, "event:3:attendees");
/// attendees.sadd("robin")?;
/// assert_eq!(attendees.sismember("robin")?, true);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Key {
    path: KeyPathBuf,
    client: Arc<dyn SharedStoreClient>,
}

impl Key {
    /// Bind a key path to a store client.
    pub fn new(path: impl Into<KeyPathBuf>, client: Arc<dyn SharedStoreClient>) -> Key {
        Key {
            path: path.into(),
            client,
        }
    }

    /// The full path of the key.
    pub fn path(&self) -> &KeyPath {
        &self.path
    }

    /// The full path of the key, as a string slice.
    pub fn as_str(&self) -> &str {
        self.path.as_str()
    }

    /// Derive a child key by appending a scalar selector to this key's path.
    /// The child is bound to the same client; this key is left untouched.
    ///
    /// # Errors
    /// Deriving with a range selector fails with
    /// [`Error::InvalidKeyOperation`], since a range does not name a single
    /// child. Deriving with an empty string, or with a fragment containing
    /// an empty segment, fails with [`Error::Segment`].
    pub fn sub(&self, selector: impl Into<Selector>) -> Result<Key> {
        match selector.into() {
            Selector::Scalar(scalar) => {
                let fragment = KeyPath::parse(&scalar)?;
                Ok(Key {
                    path: self.path.join_path(fragment),
                    client: self.client.clone(),
                })
            }
            Selector::Range(range) => Err(Error::InvalidKeyOperation(format!(
                "cannot derive a key from range selector `{range}`"
            ))),
        }
    }

    /// Forward a store operation by name.
    ///
    /// Single-key operations get this key's path injected as their first
    /// argument; multi-key and keyspace operations are forwarded exactly as
    /// given. Unknown names fail with [`Error::UnsupportedOperation`]
    /// without reaching the client.
    pub fn call(&self, op: &str, args: Vec<Value>) -> Result<Value> {
        let command = match dispatch::forwarding(op) {
            Some(Forwarding::KeyFirst) => Command::new(op).arg(self.as_str()),
            Some(Forwarding::AsIs) => Command::new(op),
            None => return Err(Error::UnsupportedOperation(op.to_owned())),
        };
        let command = args.into_iter().fold(command, |command, arg| command.arg(arg));

        self.client.execute(command)
    }

    /// Remove the store entry this key names. `del` takes explicit key
    /// names when forwarded, so this passes the key's own path along.
    pub fn delete(&self) -> Result<Value> {
        self.call("del", vec![self.as_str().into()])
    }

    // String operations.

    pub fn append(&self, value: impl Into<Value>) -> Result<Value> {
        self.call("append", vec![value.into()])
    }

    pub fn decr(&self) -> Result<Value> {
        self.call("decr", Vec::new())
    }

    pub fn decrby(&self, delta: i64) -> Result<Value> {
        self.call("decrby", vec![delta.into()])
    }

    pub fn get(&self) -> Result<Value> {
        self.call("get", Vec::new())
    }

    pub fn getrange(&self, start: i64, end: i64) -> Result<Value> {
        self.call("getrange", vec![start.into(), end.into()])
    }

    pub fn getset(&self, value: impl Into<Value>) -> Result<Value> {
        self.call("getset", vec![value.into()])
    }

    pub fn incr(&self) -> Result<Value> {
        self.call("incr", Vec::new())
    }

    pub fn incrby(&self, delta: i64) -> Result<Value> {
        self.call("incrby", vec![delta.into()])
    }

    pub fn set(&self, value: impl Into<Value>) -> Result<Value> {
        self.call("set", vec![value.into()])
    }

    pub fn setex(&self, seconds: i64, value: impl Into<Value>) -> Result<Value> {
        self.call("setex", vec![seconds.into(), value.into()])
    }

    pub fn setnx(&self, value: impl Into<Value>) -> Result<Value> {
        self.call("setnx", vec![value.into()])
    }

    pub fn strlen(&self) -> Result<Value> {
        self.call("strlen", Vec::new())
    }

    // Keyspace operations.

    pub fn exists(&self) -> Result<Value> {
        self.call("exists", Vec::new())
    }

    pub fn expire(&self, seconds: i64) -> Result<Value> {
        self.call("expire", vec![seconds.into()])
    }

    pub fn expireat(&self, timestamp: i64) -> Result<Value> {
        self.call("expireat", vec![timestamp.into()])
    }

    pub fn persist(&self) -> Result<Value> {
        self.call("persist", Vec::new())
    }

    pub fn ttl(&self) -> Result<Value> {
        self.call("ttl", Vec::new())
    }

    pub fn rename(&self, to: impl Into<Value>) -> Result<Value> {
        self.call("rename", vec![to.into()])
    }

    pub fn renamenx(&self, to: impl Into<Value>) -> Result<Value> {
        self.call("renamenx", vec![to.into()])
    }

    /// The kind of value the key holds, named `type` on the wire.
    pub fn key_type(&self) -> Result<Value> {
        self.call("type", Vec::new())
    }

    pub fn publish(&self, message: impl Into<Value>) -> Result<Value> {
        self.call("publish", vec![message.into()])
    }

    // List operations.

    pub fn lindex(&self, index: i64) -> Result<Value> {
        self.call("lindex", vec![index.into()])
    }

    pub fn llen(&self) -> Result<Value> {
        self.call("llen", Vec::new())
    }

    pub fn lpop(&self) -> Result<Value> {
        self.call("lpop", Vec::new())
    }

    pub fn lpush(&self, value: impl Into<Value>) -> Result<Value> {
        self.call("lpush", vec![value.into()])
    }

    pub fn lpushx(&self, value: impl Into<Value>) -> Result<Value> {
        self.call("lpushx", vec![value.into()])
    }

    pub fn lrange(&self, start: i64, stop: i64) -> Result<Value> {
        self.call("lrange", vec![start.into(), stop.into()])
    }

    pub fn lrem(&self, count: i64, value: impl Into<Value>) -> Result<Value> {
        self.call("lrem", vec![count.into(), value.into()])
    }

    pub fn lset(&self, index: i64, value: impl Into<Value>) -> Result<Value> {
        self.call("lset", vec![index.into(), value.into()])
    }

    pub fn ltrim(&self, start: i64, stop: i64) -> Result<Value> {
        self.call("ltrim", vec![start.into(), stop.into()])
    }

    pub fn rpop(&self) -> Result<Value> {
        self.call("rpop", Vec::new())
    }

    pub fn rpoplpush(&self, destination: impl Into<Value>) -> Result<Value> {
        self.call("rpoplpush", vec![destination.into()])
    }

    pub fn rpush(&self, value: impl Into<Value>) -> Result<Value> {
        self.call("rpush", vec![value.into()])
    }

    pub fn rpushx(&self, value: impl Into<Value>) -> Result<Value> {
        self.call("rpushx", vec![value.into()])
    }

    // Set operations.

    pub fn sadd(&self, member: impl Into<Value>) -> Result<Value> {
        self.call("sadd", vec![member.into()])
    }

    pub fn scard(&self) -> Result<Value> {
        self.call("scard", Vec::new())
    }

    pub fn sismember(&self, member: impl Into<Value>) -> Result<Value> {
        self.call("sismember", vec![member.into()])
    }

    pub fn smembers(&self) -> Result<Value> {
        self.call("smembers", Vec::new())
    }

    pub fn smove(&self, destination: impl Into<Value>, member: impl Into<Value>) -> Result<Value> {
        self.call("smove", vec![destination.into(), member.into()])
    }

    pub fn spop(&self) -> Result<Value> {
        self.call("spop", Vec::new())
    }

    pub fn srandmember(&self) -> Result<Value> {
        self.call("srandmember", Vec::new())
    }

    pub fn srem(&self, member: impl Into<Value>) -> Result<Value> {
        self.call("srem", vec![member.into()])
    }

    // Hash operations.

    pub fn hdel(&self, field: impl Into<Value>) -> Result<Value> {
        self.call("hdel", vec![field.into()])
    }

    pub fn hexists(&self, field: impl Into<Value>) -> Result<Value> {
        self.call("hexists", vec![field.into()])
    }

    pub fn hget(&self, field: impl Into<Value>) -> Result<Value> {
        self.call("hget", vec![field.into()])
    }

    pub fn hgetall(&self) -> Result<Value> {
        self.call("hgetall", Vec::new())
    }

    pub fn hincrby(&self, field: impl Into<Value>, delta: i64) -> Result<Value> {
        self.call("hincrby", vec![field.into(), delta.into()])
    }

    pub fn hkeys(&self) -> Result<Value> {
        self.call("hkeys", Vec::new())
    }

    pub fn hlen(&self) -> Result<Value> {
        self.call("hlen", Vec::new())
    }

    pub fn hmget(&self, fields: Vec<Value>) -> Result<Value> {
        self.call("hmget", fields)
    }

    /// Set several hash fields at once; `pairs` alternates field and value.
    pub fn hmset(&self, pairs: Vec<Value>) -> Result<Value> {
        self.call("hmset", pairs)
    }

    pub fn hset(&self, field: impl Into<Value>, value: impl Into<Value>) -> Result<Value> {
        self.call("hset", vec![field.into(), value.into()])
    }

    pub fn hsetnx(&self, field: impl Into<Value>, value: impl Into<Value>) -> Result<Value> {
        self.call("hsetnx", vec![field.into(), value.into()])
    }

    pub fn hvals(&self) -> Result<Value> {
        self.call("hvals", Vec::new())
    }

    // Sorted set operations.

    pub fn zadd(&self, score: f64, member: impl Into<Value>) -> Result<Value> {
        self.call("zadd", vec![score.into(), member.into()])
    }

    pub fn zcard(&self) -> Result<Value> {
        self.call("zcard", Vec::new())
    }

    pub fn zcount(&self, min: f64, max: f64) -> Result<Value> {
        self.call("zcount", vec![min.into(), max.into()])
    }

    pub fn zincrby(&self, delta: f64, member: impl Into<Value>) -> Result<Value> {
        self.call("zincrby", vec![delta.into(), member.into()])
    }

    pub fn zrange(&self, start: i64, stop: i64) -> Result<Value> {
        self.call("zrange", vec![start.into(), stop.into()])
    }

    pub fn zrangebyscore(&self, min: f64, max: f64) -> Result<Value> {
        self.call("zrangebyscore", vec![min.into(), max.into()])
    }

    pub fn zrank(&self, member: impl Into<Value>) -> Result<Value> {
        self.call("zrank", vec![member.into()])
    }

    pub fn zrem(&self, member: impl Into<Value>) -> Result<Value> {
        self.call("zrem", vec![member.into()])
    }

    pub fn zrevrange(&self, start: i64, stop: i64) -> Result<Value> {
        self.call("zrevrange", vec![start.into(), stop.into()])
    }

    pub fn zrevrank(&self, member: impl Into<Value>) -> Result<Value> {
        self.call("zrevrank", vec![member.into()])
    }

    pub fn zscore(&self, member: impl Into<Value>) -> Result<Value> {
        self.call("zscore", vec![member.into()])
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<KeyPath> for Key {
    fn as_ref(&self) -> &KeyPath {
        self.path()
    }
}

// Keys compare by path alone; which client they are bound to does not
// change what they name.

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.cmp(&other.path)
    }
}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl PartialEq<str> for Key {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Key {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl PartialEq<String> for Key {
    fn eq(&self, other: &String) -> bool {
        self.as_str() == other
    }
}
