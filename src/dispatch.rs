use std::collections::HashMap;

use lazy_static::lazy_static;

/// How a key forwards an operation to its store client.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Forwarding {
    /// The full key path is injected as the first argument.
    KeyFirst,
    /// The arguments are forwarded untouched, no key injected.
    AsIs,
}

/// Operations addressing the key they are called on. The key path goes
/// first, the caller's arguments follow.
const KEY_FIRST_OPS: &[&str] = &[
    "append",
    "blpop",
    "brpop",
    "brpoplpush",
    "decr",
    "decrby",
    "exists",
    "expire",
    "expireat",
    "get",
    "getbit",
    "getrange",
    "getset",
    "hdel",
    "hexists",
    "hget",
    "hgetall",
    "hincrby",
    "hkeys",
    "hlen",
    "hmget",
    "hmset",
    "hset",
    "hsetnx",
    "hvals",
    "incr",
    "incrby",
    "lindex",
    "linsert",
    "llen",
    "lpop",
    "lpush",
    "lpushx",
    "lrange",
    "lrem",
    "lset",
    "ltrim",
    "move",
    "persist",
    "publish",
    "rename",
    "renamenx",
    "rpop",
    "rpoplpush",
    "rpush",
    "rpushx",
    "sadd",
    "scard",
    "set",
    "setbit",
    "setex",
    "setnx",
    "setrange",
    "sismember",
    "smembers",
    "smove",
    "sort",
    "spop",
    "srandmember",
    "srem",
    "strlen",
    "ttl",
    "type",
    "watch",
    "zadd",
    "zcard",
    "zcount",
    "zincrby",
    "zrange",
    "zrangebyscore",
    "zrank",
    "zrem",
    "zremrangebyrank",
    "zremrangebyscore",
    "zrevrange",
    "zrevrangebyscore",
    "zrevrank",
    "zscore",
];

/// Operations that take explicit key names, a pattern, or no key at all:
/// multi-key batches, keyspace scans, cross-key set algebra, subscriptions,
/// and bulk delete. The key a caller holds takes no part in them.
const AS_IS_OPS: &[&str] = &[
    "dbsize",
    "del",
    "flushdb",
    "keys",
    "mget",
    "mset",
    "msetnx",
    "psubscribe",
    "punsubscribe",
    "randomkey",
    "scan",
    "sdiff",
    "sdiffstore",
    "sinter",
    "sinterstore",
    "subscribe",
    "sunion",
    "sunionstore",
    "unsubscribe",
    "zinterstore",
    "zunionstore",
];

lazy_static! {
    static ref FORWARDING: HashMap<&'static str, Forwarding> = {
        let mut table = HashMap::with_capacity(KEY_FIRST_OPS.len() + AS_IS_OPS.len());
        for op in KEY_FIRST_OPS {
            table.insert(*op, Forwarding::KeyFirst);
        }
        for op in AS_IS_OPS {
            table.insert(*op, Forwarding::AsIs);
        }
        table
    };
}

/// Resolve an operation name to its forwarding mode. Names are matched
/// case-insensitively; unknown names resolve to `None`.
pub fn forwarding(op: &str) -> Option<Forwarding> {
    FORWARDING
        .get(op.to_ascii_lowercase().as_str())
        .copied()
}
