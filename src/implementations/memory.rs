use std::{
    collections::{BTreeMap, BTreeSet, HashMap, VecDeque},
    fmt::Display,
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use lazy_static::lazy_static;
use rand::Rng;
use serde_json::{Map, Value};

use crate::{Command, Error, Result, StoreClient};

type Db = HashMap<String, Entry>;

lazy_static! {
    /// Databases shared between clients opened with the same name.
    static ref STORES: Mutex<HashMap<String, Arc<Mutex<Db>>>> = Mutex::new(HashMap::new());
}

/// An in-process store client.
///
/// Keeps string, list, set, hash, and sorted set entries with optional
/// expiry, and answers the same operations an external store would. Clients
/// created with [`Memory::new`] get a database of their own; clients opened
/// with [`Memory::open`] share the database registered under that name.
#[derive(Debug)]
pub struct Memory {
    name: Option<String>,
    inner: Arc<Mutex<Db>>,
}

impl Memory {
    /// Create a client with a private database.
    pub fn new() -> Memory {
        Memory {
            name: None,
            inner: Arc::new(Mutex::new(Db::new())),
        }
    }

    /// Open the shared database registered under `name`, creating it first
    /// if no client has used that name yet.
    pub fn open(name: &str) -> Result<Memory> {
        let mut stores = STORES.lock().map_err(|e| Error::MutexLock(e.to_string()))?;
        let inner = stores.entry(name.to_owned()).or_default().clone();

        Ok(Memory {
            name: Some(name.to_owned()),
            inner,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Db>> {
        self.inner
            .lock()
            .map_err(|e| Error::MutexLock(e.to_string()))
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new()
    }
}

impl Display for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "StoreClient::Memory({name})"),
            None => write!(f, "StoreClient::Memory"),
        }
    }
}

impl StoreClient for Memory {
    fn execute(&self, command: Command) -> Result<Value> {
        let mut db = self.lock()?;
        apply(&mut db, &command)
    }
}

#[derive(Clone, Debug)]
struct Entry {
    data: Data,
    expires_at: Option<SystemTime>,
}

impl Entry {
    fn new(data: Data) -> Entry {
        Entry {
            data,
            expires_at: None,
        }
    }

    fn expired(&self) -> bool {
        matches!(self.expires_at, Some(at) if at <= SystemTime::now())
    }
}

#[derive(Clone, Debug)]
enum Data {
    Text(String),
    List(VecDeque<String>),
    Set(BTreeSet<String>),
    Hash(BTreeMap<String, String>),
    SortedSet(BTreeMap<String, f64>),
}

impl Data {
    fn kind(&self) -> &'static str {
        match self {
            Data::Text(_) => "string",
            Data::List(_) => "list",
            Data::Set(_) => "set",
            Data::Hash(_) => "hash",
            Data::SortedSet(_) => "zset",
        }
    }
}

fn apply(db: &mut Db, command: &Command) -> Result<Value> {
    let op = command.op();
    let args = command.args();

    match op {
        // Strings.
        "set" => {
            let [key, value] = exactly(op, args)?;
            db.insert(text(key), Entry::new(Data::Text(text(value))));
            Ok(Value::Bool(true))
        }
        "get" => {
            let [key] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            Ok(string_or_null(read_text(db, op, &key)?))
        }
        "getset" => {
            let [key, value] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let previous = read_text(db, op, &key)?.cloned();
            db.insert(key, Entry::new(Data::Text(text(value))));
            Ok(string_or_null(previous))
        }
        "setnx" => {
            let [key, value] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            if db.contains_key(&key) {
                Ok(Value::Bool(false))
            } else {
                db.insert(key, Entry::new(Data::Text(text(value))));
                Ok(Value::Bool(true))
            }
        }
        "setex" => {
            let [key, seconds, value] = exactly(op, args)?;
            let seconds = int(seconds)?;
            if seconds <= 0 {
                return Err(Error::Other(format!("invalid expire time in `{op}`")));
            }
            let mut entry = Entry::new(Data::Text(text(value)));
            entry.expires_at = Some(SystemTime::now() + Duration::from_secs(seconds as u64));
            db.insert(text(key), entry);
            Ok(Value::Bool(true))
        }
        "append" => {
            let [key, value] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let buffer = write_text(db, op, &key)?;
            buffer.push_str(&text(value));
            Ok(Value::from(buffer.chars().count() as i64))
        }
        "strlen" => {
            let [key] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let length = read_text(db, op, &key)?
                .map(|text| text.chars().count() as i64)
                .unwrap_or(0);
            Ok(Value::from(length))
        }
        "getrange" => {
            let [key, start, end] = exactly(op, args)?;
            let (start, end) = (int(start)?, int(end)?);
            let key = text(key);
            purge(db, &key);
            let chars: Vec<char> = read_text(db, op, &key)?
                .map(|text| text.chars().collect())
                .unwrap_or_default();
            let sub: String = match window(chars.len(), start, end) {
                Some((front, back)) => chars[front..=back].iter().collect(),
                None => String::new(),
            };
            Ok(Value::from(sub))
        }
        "incr" | "decr" | "incrby" | "decrby" => {
            let (key, delta) = match op {
                "incr" => {
                    let [key] = exactly(op, args)?;
                    (text(key), 1)
                }
                "decr" => {
                    let [key] = exactly(op, args)?;
                    (text(key), -1)
                }
                "incrby" => {
                    let [key, delta] = exactly(op, args)?;
                    (text(key), int(delta)?)
                }
                _ => {
                    let [key, delta] = exactly(op, args)?;
                    (text(key), int(delta)?.checked_neg().ok_or(Error::NotInteger)?)
                }
            };
            purge(db, &key);
            let buffer = write_text(db, op, &key)?;
            let current: i64 = if buffer.is_empty() {
                0
            } else {
                buffer.parse().map_err(|_| Error::NotInteger)?
            };
            let next = current.checked_add(delta).ok_or(Error::NotInteger)?;
            *buffer = next.to_string();
            Ok(Value::from(next))
        }

        // Keyspace.
        "exists" => {
            let [key] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            Ok(Value::Bool(db.contains_key(&key)))
        }
        "del" => {
            let args = at_least(op, args, 1)?;
            let mut removed = 0i64;
            for key in args {
                let key = text(key);
                purge(db, &key);
                if db.remove(&key).is_some() {
                    removed += 1;
                }
            }
            Ok(Value::from(removed))
        }
        "expire" => {
            let [key, seconds] = exactly(op, args)?;
            let key = text(key);
            let seconds = int(seconds)?;
            purge(db, &key);
            if !db.contains_key(&key) {
                return Ok(Value::Bool(false));
            }
            if seconds <= 0 {
                db.remove(&key);
            } else if let Some(entry) = db.get_mut(&key) {
                entry.expires_at = Some(SystemTime::now() + Duration::from_secs(seconds as u64));
            }
            Ok(Value::Bool(true))
        }
        "expireat" => {
            let [key, timestamp] = exactly(op, args)?;
            let key = text(key);
            let timestamp = int(timestamp)?;
            purge(db, &key);
            if !db.contains_key(&key) {
                return Ok(Value::Bool(false));
            }
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs() as i64;
            if timestamp <= now {
                db.remove(&key);
            } else if let Some(entry) = db.get_mut(&key) {
                entry.expires_at = Some(UNIX_EPOCH + Duration::from_secs(timestamp as u64));
            }
            Ok(Value::Bool(true))
        }
        "ttl" => {
            let [key] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            match db.get(&key) {
                None => Ok(Value::from(-2)),
                Some(Entry { expires_at: None, .. }) => Ok(Value::from(-1)),
                Some(Entry { expires_at: Some(at), .. }) => {
                    let remaining = at
                        .duration_since(SystemTime::now())
                        .map(|remaining| remaining.as_secs() as i64)
                        .unwrap_or(0);
                    Ok(Value::from(remaining))
                }
            }
        }
        "persist" => {
            let [key] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let persisted = db
                .get_mut(&key)
                .map(|entry| entry.expires_at.take().is_some())
                .unwrap_or(false);
            Ok(Value::Bool(persisted))
        }
        "type" => {
            let [key] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let kind = db.get(&key).map(|entry| entry.data.kind()).unwrap_or("none");
            Ok(Value::from(kind))
        }
        "rename" => {
            let [key, to] = exactly(op, args)?;
            let (key, to) = (text(key), text(to));
            purge(db, &key);
            purge(db, &to);
            match db.remove(&key) {
                None => Err(Error::Other("no such key".to_owned())),
                Some(entry) => {
                    db.insert(to, entry);
                    Ok(Value::Bool(true))
                }
            }
        }
        "renamenx" => {
            let [key, to] = exactly(op, args)?;
            let (key, to) = (text(key), text(to));
            purge(db, &key);
            purge(db, &to);
            if !db.contains_key(&key) {
                return Err(Error::Other("no such key".to_owned()));
            }
            if db.contains_key(&to) {
                return Ok(Value::Bool(false));
            }
            if let Some(entry) = db.remove(&key) {
                db.insert(to, entry);
            }
            Ok(Value::Bool(true))
        }
        "publish" => {
            // No subscriber plumbing; report zero receivers.
            let [_channel, _message] = exactly(op, args)?;
            Ok(Value::from(0))
        }

        // Lists.
        "lpush" | "rpush" => {
            let args = at_least(op, args, 2)?;
            let key = text(&args[0]);
            purge(db, &key);
            let list = write_list(db, op, &key)?;
            for value in &args[1..] {
                if op == "lpush" {
                    list.push_front(text(value));
                } else {
                    list.push_back(text(value));
                }
            }
            Ok(Value::from(list.len() as i64))
        }
        "lpushx" | "rpushx" => {
            let [key, value] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            if read_list(db, op, &key)?.is_none() {
                return Ok(Value::from(0));
            }
            let list = write_list(db, op, &key)?;
            if op == "lpushx" {
                list.push_front(text(value));
            } else {
                list.push_back(text(value));
            }
            Ok(Value::from(list.len() as i64))
        }
        "lpop" | "rpop" => {
            let [key] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let popped = match db.get_mut(&key).map(|entry| &mut entry.data) {
                None => None,
                Some(Data::List(list)) => {
                    if op == "lpop" {
                        list.pop_front()
                    } else {
                        list.pop_back()
                    }
                }
                Some(_) => return Err(Error::WrongType(op.to_owned())),
            };
            drop_if_empty(db, &key);
            Ok(string_or_null(popped))
        }
        "llen" => {
            let [key] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let length = read_list(db, op, &key)?.map(|list| list.len() as i64).unwrap_or(0);
            Ok(Value::from(length))
        }
        "lrange" => {
            let [key, start, stop] = exactly(op, args)?;
            let (start, stop) = (int(start)?, int(stop)?);
            let key = text(key);
            purge(db, &key);
            let values = match read_list(db, op, &key)? {
                None => Vec::new(),
                Some(list) => match window(list.len(), start, stop) {
                    None => Vec::new(),
                    Some((front, back)) => list
                        .iter()
                        .skip(front)
                        .take(back - front + 1)
                        .map(|value| Value::from(value.as_str()))
                        .collect(),
                },
            };
            Ok(Value::Array(values))
        }
        "lindex" => {
            let [key, index] = exactly(op, args)?;
            let index = int(index)?;
            let key = text(key);
            purge(db, &key);
            let value = match read_list(db, op, &key)? {
                None => None,
                Some(list) => {
                    let offset = if index < 0 { list.len() as i64 + index } else { index };
                    usize::try_from(offset).ok().and_then(|offset| list.get(offset)).cloned()
                }
            };
            Ok(string_or_null(value))
        }
        "lset" => {
            let [key, index, value] = exactly(op, args)?;
            let index = int(index)?;
            let key = text(key);
            purge(db, &key);
            let list = match db.get_mut(&key).map(|entry| &mut entry.data) {
                None => return Err(Error::Other("no such key".to_owned())),
                Some(Data::List(list)) => list,
                Some(_) => return Err(Error::WrongType(op.to_owned())),
            };
            let offset = if index < 0 { list.len() as i64 + index } else { index };
            match usize::try_from(offset).ok().and_then(|offset| list.get_mut(offset)) {
                Some(slot) => {
                    *slot = text(value);
                    Ok(Value::Bool(true))
                }
                None => Err(Error::Other("index out of range".to_owned())),
            }
        }
        "ltrim" => {
            let [key, start, stop] = exactly(op, args)?;
            let (start, stop) = (int(start)?, int(stop)?);
            let key = text(key);
            purge(db, &key);
            match db.get_mut(&key).map(|entry| &mut entry.data) {
                None => {}
                Some(Data::List(list)) => {
                    match window(list.len(), start, stop) {
                        None => list.clear(),
                        Some((front, back)) => {
                            let kept = list
                                .iter()
                                .skip(front)
                                .take(back - front + 1)
                                .cloned()
                                .collect();
                            *list = kept;
                        }
                    }
                }
                Some(_) => return Err(Error::WrongType(op.to_owned())),
            }
            drop_if_empty(db, &key);
            Ok(Value::Bool(true))
        }
        "lrem" => {
            let [key, count, value] = exactly(op, args)?;
            let count = int(count)?;
            let target = text(value);
            let key = text(key);
            purge(db, &key);
            let list = match db.get_mut(&key).map(|entry| &mut entry.data) {
                None => return Ok(Value::from(0)),
                Some(Data::List(list)) => list,
                Some(_) => return Err(Error::WrongType(op.to_owned())),
            };
            let limit = if count == 0 { usize::MAX } else { count.unsigned_abs() as usize };
            let mut removed = 0i64;
            let mut kept = VecDeque::with_capacity(list.len());
            if count >= 0 {
                for item in list.drain(..) {
                    if (removed as usize) < limit && item == target {
                        removed += 1;
                    } else {
                        kept.push_back(item);
                    }
                }
            } else {
                for item in list.drain(..).rev() {
                    if (removed as usize) < limit && item == target {
                        removed += 1;
                    } else {
                        kept.push_front(item);
                    }
                }
            }
            *list = kept;
            drop_if_empty(db, &key);
            Ok(Value::from(removed))
        }
        "rpoplpush" => {
            let [source, destination] = exactly(op, args)?;
            let (source, destination) = (text(source), text(destination));
            purge(db, &source);
            purge(db, &destination);
            read_list(db, op, &destination)?;
            let popped = match db.get_mut(&source).map(|entry| &mut entry.data) {
                None => None,
                Some(Data::List(list)) => list.pop_back(),
                Some(_) => return Err(Error::WrongType(op.to_owned())),
            };
            drop_if_empty(db, &source);
            match popped {
                None => Ok(Value::Null),
                Some(value) => {
                    write_list(db, op, &destination)?.push_front(value.clone());
                    Ok(Value::from(value))
                }
            }
        }

        // Sets.
        "sadd" => {
            let args = at_least(op, args, 2)?;
            let key = text(&args[0]);
            purge(db, &key);
            let set = write_set(db, op, &key)?;
            let mut added = 0i64;
            for member in &args[1..] {
                if set.insert(text(member)) {
                    added += 1;
                }
            }
            Ok(Value::from(added))
        }
        "srem" => {
            let args = at_least(op, args, 2)?;
            let key = text(&args[0]);
            purge(db, &key);
            let mut removed = 0i64;
            match db.get_mut(&key).map(|entry| &mut entry.data) {
                None => {}
                Some(Data::Set(set)) => {
                    for member in &args[1..] {
                        if set.remove(&text(member)) {
                            removed += 1;
                        }
                    }
                }
                Some(_) => return Err(Error::WrongType(op.to_owned())),
            }
            drop_if_empty(db, &key);
            Ok(Value::from(removed))
        }
        "scard" => {
            let [key] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let count = read_set(db, op, &key)?.map(|set| set.len() as i64).unwrap_or(0);
            Ok(Value::from(count))
        }
        "sismember" => {
            let [key, member] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let found = read_set(db, op, &key)?
                .map(|set| set.contains(&text(member)))
                .unwrap_or(false);
            Ok(Value::Bool(found))
        }
        "smembers" => {
            let [key] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let members = read_set(db, op, &key)?
                .map(|set| set.iter().map(|member| Value::from(member.as_str())).collect())
                .unwrap_or_default();
            Ok(Value::Array(members))
        }
        "spop" | "srandmember" => {
            let [key] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let member = match db.get_mut(&key).map(|entry| &mut entry.data) {
                None => None,
                Some(Data::Set(set)) if set.is_empty() => None,
                Some(Data::Set(set)) => {
                    let index = rand::thread_rng().gen_range(0..set.len());
                    let member = set.iter().nth(index).cloned();
                    if op == "spop" {
                        if let Some(member) = &member {
                            set.remove(member);
                        }
                    }
                    member
                }
                Some(_) => return Err(Error::WrongType(op.to_owned())),
            };
            drop_if_empty(db, &key);
            Ok(string_or_null(member))
        }
        "smove" => {
            let [source, destination, member] = exactly(op, args)?;
            let (source, destination) = (text(source), text(destination));
            let member = text(member);
            purge(db, &source);
            purge(db, &destination);
            read_set(db, op, &destination)?;
            let moved = match db.get_mut(&source).map(|entry| &mut entry.data) {
                None => false,
                Some(Data::Set(set)) => set.remove(&member),
                Some(_) => return Err(Error::WrongType(op.to_owned())),
            };
            if moved {
                write_set(db, op, &destination)?.insert(member);
                drop_if_empty(db, &source);
            }
            Ok(Value::Bool(moved))
        }
        "sdiff" | "sinter" | "sunion" => {
            let args = at_least(op, args, 1)?;
            let members = set_algebra(db, op, args)?;
            Ok(Value::Array(members.into_iter().map(Value::from).collect()))
        }
        "sdiffstore" | "sinterstore" | "sunionstore" => {
            let args = at_least(op, args, 2)?;
            let destination = text(&args[0]);
            let members = set_algebra(db, op, &args[1..])?;
            let count = members.len() as i64;
            if members.is_empty() {
                db.remove(&destination);
            } else {
                db.insert(destination, Entry::new(Data::Set(members)));
            }
            Ok(Value::from(count))
        }

        // Hashes.
        "hset" => {
            let [key, field, value] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let hash = write_hash(db, op, &key)?;
            let created = hash.insert(text(field), text(value)).is_none();
            Ok(Value::from(if created { 1 } else { 0 }))
        }
        "hsetnx" => {
            let [key, field, value] = exactly(op, args)?;
            let key = text(key);
            let field = text(field);
            purge(db, &key);
            let hash = write_hash(db, op, &key)?;
            if hash.contains_key(&field) {
                Ok(Value::Bool(false))
            } else {
                hash.insert(field, text(value));
                Ok(Value::Bool(true))
            }
        }
        "hget" => {
            let [key, field] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let value = read_hash(db, op, &key)?.and_then(|hash| hash.get(&text(field))).cloned();
            Ok(string_or_null(value))
        }
        "hdel" => {
            let args = at_least(op, args, 2)?;
            let key = text(&args[0]);
            purge(db, &key);
            let mut removed = 0i64;
            match db.get_mut(&key).map(|entry| &mut entry.data) {
                None => {}
                Some(Data::Hash(hash)) => {
                    for field in &args[1..] {
                        if hash.remove(&text(field)).is_some() {
                            removed += 1;
                        }
                    }
                }
                Some(_) => return Err(Error::WrongType(op.to_owned())),
            }
            drop_if_empty(db, &key);
            Ok(Value::from(removed))
        }
        "hexists" => {
            let [key, field] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let found = read_hash(db, op, &key)?
                .map(|hash| hash.contains_key(&text(field)))
                .unwrap_or(false);
            Ok(Value::Bool(found))
        }
        "hlen" => {
            let [key] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let count = read_hash(db, op, &key)?.map(|hash| hash.len() as i64).unwrap_or(0);
            Ok(Value::from(count))
        }
        "hkeys" => {
            let [key] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let fields = read_hash(db, op, &key)?
                .map(|hash| hash.keys().map(|field| Value::from(field.as_str())).collect())
                .unwrap_or_default();
            Ok(Value::Array(fields))
        }
        "hvals" => {
            let [key] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let values = read_hash(db, op, &key)?
                .map(|hash| hash.values().map(|value| Value::from(value.as_str())).collect())
                .unwrap_or_default();
            Ok(Value::Array(values))
        }
        "hgetall" => {
            let [key] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let mut object = Map::new();
            if let Some(hash) = read_hash(db, op, &key)? {
                for (field, value) in hash {
                    object.insert(field.clone(), Value::from(value.as_str()));
                }
            }
            Ok(Value::Object(object))
        }
        "hmget" => {
            let args = at_least(op, args, 2)?;
            let key = text(&args[0]);
            purge(db, &key);
            let hash = read_hash(db, op, &key)?;
            let values = args[1..]
                .iter()
                .map(|field| {
                    string_or_null(hash.and_then(|hash| hash.get(&text(field))).cloned())
                })
                .collect();
            Ok(Value::Array(values))
        }
        "hmset" => {
            let args = at_least(op, args, 3)?;
            if args[1..].len() % 2 != 0 {
                return Err(Error::Arity(op.to_owned()));
            }
            let key = text(&args[0]);
            purge(db, &key);
            let hash = write_hash(db, op, &key)?;
            for pair in args[1..].chunks_exact(2) {
                hash.insert(text(&pair[0]), text(&pair[1]));
            }
            Ok(Value::Bool(true))
        }
        "hincrby" => {
            let [key, field, delta] = exactly(op, args)?;
            let key = text(key);
            let field = text(field);
            let delta = int(delta)?;
            purge(db, &key);
            let hash = write_hash(db, op, &key)?;
            let current: i64 = match hash.get(&field) {
                None => 0,
                Some(value) => value.parse().map_err(|_| Error::NotInteger)?,
            };
            let next = current.checked_add(delta).ok_or(Error::NotInteger)?;
            hash.insert(field, next.to_string());
            Ok(Value::from(next))
        }

        // Sorted sets.
        "zadd" => {
            let args = at_least(op, args, 3)?;
            if args[1..].len() % 2 != 0 {
                return Err(Error::Arity(op.to_owned()));
            }
            let key = text(&args[0]);
            purge(db, &key);
            let zset = write_zset(db, op, &key)?;
            let mut added = 0i64;
            for pair in args[1..].chunks_exact(2) {
                let score = float(&pair[0])?;
                if zset.insert(text(&pair[1]), score).is_none() {
                    added += 1;
                }
            }
            Ok(Value::from(added))
        }
        "zcard" => {
            let [key] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let count = read_zset(db, op, &key)?.map(|zset| zset.len() as i64).unwrap_or(0);
            Ok(Value::from(count))
        }
        "zscore" => {
            let [key, member] = exactly(op, args)?;
            let key = text(key);
            purge(db, &key);
            let score = read_zset(db, op, &key)?.and_then(|zset| zset.get(&text(member)).copied());
            Ok(score.map(Value::from).unwrap_or(Value::Null))
        }
        "zincrby" => {
            let [key, delta, member] = exactly(op, args)?;
            let key = text(key);
            let delta = float(delta)?;
            let member = text(member);
            purge(db, &key);
            let zset = write_zset(db, op, &key)?;
            let next = zset.get(&member).copied().unwrap_or(0.0) + delta;
            zset.insert(member, next);
            Ok(Value::from(next))
        }
        "zrank" | "zrevrank" => {
            let [key, member] = exactly(op, args)?;
            let key = text(key);
            let member = text(member);
            purge(db, &key);
            let rank = read_zset(db, op, &key)?.and_then(|zset| {
                let ranked = ranked(zset);
                let position = ranked.iter().position(|(m, _)| *m == member);
                position.map(|position| {
                    if op == "zrevrank" {
                        (ranked.len() - 1 - position) as i64
                    } else {
                        position as i64
                    }
                })
            });
            Ok(rank.map(Value::from).unwrap_or(Value::Null))
        }
        "zrem" => {
            let args = at_least(op, args, 2)?;
            let key = text(&args[0]);
            purge(db, &key);
            let mut removed = 0i64;
            match db.get_mut(&key).map(|entry| &mut entry.data) {
                None => {}
                Some(Data::SortedSet(zset)) => {
                    for member in &args[1..] {
                        if zset.remove(&text(member)).is_some() {
                            removed += 1;
                        }
                    }
                }
                Some(_) => return Err(Error::WrongType(op.to_owned())),
            }
            drop_if_empty(db, &key);
            Ok(Value::from(removed))
        }
        "zcount" => {
            let [key, min, max] = exactly(op, args)?;
            let (min, max) = (float(min)?, float(max)?);
            let key = text(key);
            purge(db, &key);
            let count = read_zset(db, op, &key)?
                .map(|zset| {
                    zset.values().filter(|score| min <= **score && **score <= max).count() as i64
                })
                .unwrap_or(0);
            Ok(Value::from(count))
        }
        "zrange" | "zrevrange" => {
            if args.len() < 3 || args.len() > 4 {
                return Err(Error::Arity(op.to_owned()));
            }
            let key = text(&args[0]);
            let (start, stop) = (int(&args[1])?, int(&args[2])?);
            let with_scores = match args.get(3) {
                None => false,
                Some(flag) if text(flag).eq_ignore_ascii_case("withscores") => true,
                Some(_) => return Err(Error::Other("syntax error".to_owned())),
            };
            purge(db, &key);
            let mut values = Vec::new();
            if let Some(zset) = read_zset(db, op, &key)? {
                let mut ordered = ranked(zset);
                if op == "zrevrange" {
                    ordered.reverse();
                }
                if let Some((front, back)) = window(ordered.len(), start, stop) {
                    for (member, score) in &ordered[front..=back] {
                        values.push(Value::from(*member));
                        if with_scores {
                            values.push(Value::from(*score));
                        }
                    }
                }
            }
            Ok(Value::Array(values))
        }
        "zrangebyscore" | "zrevrangebyscore" => {
            let [key, first, second] = exactly(op, args)?;
            let key = text(key);
            let (min, max) = if op == "zrevrangebyscore" {
                (float(second)?, float(first)?)
            } else {
                (float(first)?, float(second)?)
            };
            purge(db, &key);
            let mut values = Vec::new();
            if let Some(zset) = read_zset(db, op, &key)? {
                let mut ordered: Vec<(&str, f64)> = ranked(zset)
                    .into_iter()
                    .filter(|(_, score)| min <= *score && *score <= max)
                    .collect();
                if op == "zrevrangebyscore" {
                    ordered.reverse();
                }
                values = ordered.into_iter().map(|(member, _)| Value::from(member)).collect();
            }
            Ok(Value::Array(values))
        }
        "zremrangebyrank" => {
            let [key, start, stop] = exactly(op, args)?;
            let (start, stop) = (int(start)?, int(stop)?);
            let key = text(key);
            purge(db, &key);
            let mut removed = 0i64;
            match db.get_mut(&key).map(|entry| &mut entry.data) {
                None => {}
                Some(Data::SortedSet(zset)) => {
                    let doomed: Vec<String> = {
                        let ranked = ranked(zset);
                        match window(ranked.len(), start, stop) {
                            None => Vec::new(),
                            Some((front, back)) => ranked[front..=back]
                                .iter()
                                .map(|(member, _)| (*member).to_owned())
                                .collect(),
                        }
                    };
                    for member in &doomed {
                        if zset.remove(member).is_some() {
                            removed += 1;
                        }
                    }
                }
                Some(_) => return Err(Error::WrongType(op.to_owned())),
            }
            drop_if_empty(db, &key);
            Ok(Value::from(removed))
        }
        "zremrangebyscore" => {
            let [key, min, max] = exactly(op, args)?;
            let (min, max) = (float(min)?, float(max)?);
            let key = text(key);
            purge(db, &key);
            let mut removed = 0i64;
            match db.get_mut(&key).map(|entry| &mut entry.data) {
                None => {}
                Some(Data::SortedSet(zset)) => {
                    let doomed: Vec<String> = zset
                        .iter()
                        .filter(|(_, score)| min <= **score && **score <= max)
                        .map(|(member, _)| member.clone())
                        .collect();
                    for member in &doomed {
                        if zset.remove(member).is_some() {
                            removed += 1;
                        }
                    }
                }
                Some(_) => return Err(Error::WrongType(op.to_owned())),
            }
            drop_if_empty(db, &key);
            Ok(Value::from(removed))
        }

        // Keyspace-wide operations.
        "mget" => {
            let args = at_least(op, args, 1)?;
            let mut values = Vec::with_capacity(args.len());
            for key in args {
                let key = text(key);
                purge(db, &key);
                values.push(match db.get(&key).map(|entry| &entry.data) {
                    Some(Data::Text(text)) => Value::from(text.as_str()),
                    _ => Value::Null,
                });
            }
            Ok(Value::Array(values))
        }
        "mset" => {
            let args = at_least(op, args, 2)?;
            if args.len() % 2 != 0 {
                return Err(Error::Arity(op.to_owned()));
            }
            for pair in args.chunks_exact(2) {
                db.insert(text(&pair[0]), Entry::new(Data::Text(text(&pair[1]))));
            }
            Ok(Value::Bool(true))
        }
        "msetnx" => {
            let args = at_least(op, args, 2)?;
            if args.len() % 2 != 0 {
                return Err(Error::Arity(op.to_owned()));
            }
            for pair in args.chunks_exact(2) {
                let key = text(&pair[0]);
                purge(db, &key);
                if db.contains_key(&key) {
                    return Ok(Value::Bool(false));
                }
            }
            for pair in args.chunks_exact(2) {
                db.insert(text(&pair[0]), Entry::new(Data::Text(text(&pair[1]))));
            }
            Ok(Value::Bool(true))
        }
        "keys" => {
            let [pattern] = exactly(op, args)?;
            let pattern = text(pattern);
            db.retain(|_, entry| !entry.expired());
            let mut keys: Vec<&str> = db
                .keys()
                .filter(|key| glob_match(&pattern, key))
                .map(|key| key.as_str())
                .collect();
            keys.sort_unstable();
            Ok(Value::Array(keys.into_iter().map(Value::from).collect()))
        }
        "randomkey" => {
            let [] = exactly(op, args)?;
            db.retain(|_, entry| !entry.expired());
            if db.is_empty() {
                return Ok(Value::Null);
            }
            let index = rand::thread_rng().gen_range(0..db.len());
            Ok(string_or_null(db.keys().nth(index)))
        }
        "dbsize" => {
            let [] = exactly(op, args)?;
            db.retain(|_, entry| !entry.expired());
            Ok(Value::from(db.len() as i64))
        }
        "flushdb" => {
            let [] = exactly(op, args)?;
            db.clear();
            Ok(Value::Bool(true))
        }

        op => Err(Error::Other(format!("`{op}` is not implemented by the memory store"))),
    }
}

/// Coerce an argument to the textual form entries are stored in. Strings
/// pass through; anything else keeps its compact JSON rendering.
fn text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn int(value: &Value) -> Result<i64> {
    match value {
        Value::Number(number) => number.as_i64().ok_or(Error::NotInteger),
        Value::String(text) => text.parse().map_err(|_| Error::NotInteger),
        _ => Err(Error::NotInteger),
    }
}

fn float(value: &Value) -> Result<f64> {
    match value {
        Value::Number(number) => number.as_f64().ok_or(Error::NotFloat),
        Value::String(text) => text.parse().map_err(|_| Error::NotFloat),
        _ => Err(Error::NotFloat),
    }
}

fn string_or_null(value: Option<impl AsRef<str>>) -> Value {
    value.map(|value| Value::from(value.as_ref())).unwrap_or(Value::Null)
}

fn exactly<'a, const N: usize>(op: &str, args: &'a [Value]) -> Result<&'a [Value; N]> {
    args.try_into().map_err(|_| Error::Arity(op.to_owned()))
}

fn at_least<'a>(op: &str, args: &'a [Value], count: usize) -> Result<&'a [Value]> {
    if args.len() >= count {
        Ok(args)
    } else {
        Err(Error::Arity(op.to_owned()))
    }
}

fn purge(db: &mut Db, key: &str) {
    if db.get(key).map(Entry::expired).unwrap_or(false) {
        db.remove(key);
    }
}

/// Aggregates never stay behind empty; a key either holds members or does
/// not exist.
fn drop_if_empty(db: &mut Db, key: &str) {
    let empty = match db.get(key).map(|entry| &entry.data) {
        Some(Data::List(list)) => list.is_empty(),
        Some(Data::Set(set)) => set.is_empty(),
        Some(Data::Hash(hash)) => hash.is_empty(),
        Some(Data::SortedSet(zset)) => zset.is_empty(),
        _ => false,
    };
    if empty {
        db.remove(key);
    }
}

macro_rules! typed_access {
    ($read:ident, $write:ident, $variant:ident, $type:ty) => {
        fn $read<'a>(db: &'a Db, op: &str, key: &str) -> Result<Option<&'a $type>> {
            match db.get(key).map(|entry| &entry.data) {
                None => Ok(None),
                Some(Data::$variant(value)) => Ok(Some(value)),
                Some(_) => Err(Error::WrongType(op.to_owned())),
            }
        }

        fn $write<'a>(db: &'a mut Db, op: &str, key: &str) -> Result<&'a mut $type> {
            let entry = db
                .entry(key.to_owned())
                .or_insert_with(|| Entry::new(Data::$variant(<$type>::default())));
            match &mut entry.data {
                Data::$variant(value) => Ok(value),
                _ => Err(Error::WrongType(op.to_owned())),
            }
        }
    };
}

typed_access!(read_text, write_text, Text, String);
typed_access!(read_list, write_list, List, VecDeque<String>);
typed_access!(read_set, write_set, Set, BTreeSet<String>);
typed_access!(read_hash, write_hash, Hash, BTreeMap<String, String>);
typed_access!(read_zset, write_zset, SortedSet, BTreeMap<String, f64>);

fn set_algebra(db: &mut Db, op: &str, keys: &[Value]) -> Result<BTreeSet<String>> {
    let mut result: Option<BTreeSet<String>> = None;
    for key in keys {
        let key = text(key);
        purge(db, &key);
        let members = read_set(db, op, &key)?.cloned().unwrap_or_default();
        result = Some(match result {
            None => members,
            Some(acc) if op.starts_with("sdiff") => acc.difference(&members).cloned().collect(),
            Some(acc) if op.starts_with("sinter") => acc.intersection(&members).cloned().collect(),
            Some(acc) => acc.union(&members).cloned().collect(),
        });
    }
    Ok(result.unwrap_or_default())
}

/// Members of a sorted set ordered by score, ties broken by member name.
fn ranked(zset: &BTreeMap<String, f64>) -> Vec<(&str, f64)> {
    let mut members: Vec<(&str, f64)> = zset
        .iter()
        .map(|(member, score)| (member.as_str(), *score))
        .collect();
    members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    members
}

/// Clamp start/stop indexes the way a store server does: negative indexes
/// count from the end and stop is inclusive. `None` means the window is
/// empty.
fn window(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if start > stop || start >= len || stop < 0 {
        None
    } else {
        Some((start as usize, stop as usize))
    }
}

/// Match a key against a `keys` pattern: `*` spans any run of characters,
/// `?` exactly one.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = backtrack {
            backtrack = Some((star_p, star_t + 1));
            p = star_p + 1;
            t = star_t + 1;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}
