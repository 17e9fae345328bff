pub(crate) mod memory;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::{distributions::Alphanumeric, Rng};
    use serde_json::{json, Value};

    use super::memory::Memory;
    use crate::{Error, Key, KeyPathBuf, SegmentBuf};

    fn random_segment() -> SegmentBuf {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect::<String>()
            .parse()
            .unwrap()
    }

    fn test_key() -> Key {
        Key::new(random_segment(), Arc::new(Memory::new()))
    }

    #[test]
    fn test_string_roundtrip() {
        let key = test_key();

        assert_eq!(key.get().unwrap(), Value::Null);
        assert_eq!(key.set(1).unwrap(), json!(true));
        assert_eq!(key.get().unwrap(), json!("1"));
        assert_eq!(key.getset("two").unwrap(), json!("1"));
        assert_eq!(key.append("-three").unwrap(), json!(9));
        assert_eq!(key.strlen().unwrap(), json!(9));
        assert_eq!(key.getrange(0, 2).unwrap(), json!("two"));
        assert_eq!(key.getrange(-5, -1).unwrap(), json!("three"));
        assert_eq!(key.setnx("other").unwrap(), json!(false));
        assert_eq!(key.get().unwrap(), json!("two-three"));
    }

    #[test]
    fn test_counters() {
        let key = test_key();

        assert_eq!(key.incr().unwrap(), json!(1));
        assert_eq!(key.incrby(10).unwrap(), json!(11));
        assert_eq!(key.decr().unwrap(), json!(10));
        assert_eq!(key.decrby(7).unwrap(), json!(3));

        key.set("eleven").unwrap();
        assert!(matches!(key.incr(), Err(Error::NotInteger)));
    }

    #[test]
    fn test_exists_type_and_delete() {
        let key = test_key();

        assert_eq!(key.exists().unwrap(), json!(false));
        assert_eq!(key.key_type().unwrap(), json!("none"));

        key.set("x").unwrap();
        assert_eq!(key.exists().unwrap(), json!(true));
        assert_eq!(key.key_type().unwrap(), json!("string"));

        assert_eq!(key.delete().unwrap(), json!(1));
        assert_eq!(key.exists().unwrap(), json!(false));
        assert_eq!(key.delete().unwrap(), json!(0));
    }

    #[test]
    fn test_expiry() {
        let key = test_key();

        assert_eq!(key.ttl().unwrap(), json!(-2));
        key.set("soon").unwrap();
        assert_eq!(key.ttl().unwrap(), json!(-1));

        assert_eq!(key.expire(100).unwrap(), json!(true));
        let remaining = key.ttl().unwrap().as_i64().unwrap();
        assert!(remaining > 0 && remaining <= 100, "{remaining}");

        assert_eq!(key.persist().unwrap(), json!(true));
        assert_eq!(key.ttl().unwrap(), json!(-1));
        assert_eq!(key.persist().unwrap(), json!(false));

        // a deadline in the past removes the entry right away
        assert_eq!(key.expire(-1).unwrap(), json!(true));
        assert_eq!(key.exists().unwrap(), json!(false));

        key.setex(100, "later").unwrap();
        let remaining = key.ttl().unwrap().as_i64().unwrap();
        assert!(remaining > 0 && remaining <= 100, "{remaining}");
        assert_eq!(key.expireat(12345).unwrap(), json!(true));
        assert_eq!(key.exists().unwrap(), json!(false));

        assert_eq!(key.expire(10).unwrap(), json!(false));
        assert!(matches!(key.setex(0, "never"), Err(Error::Other(_))));
    }

    #[test]
    fn test_rename() {
        let key = test_key();
        let target = key.sub("renamed").unwrap();

        key.set("payload").unwrap();
        assert_eq!(key.rename(target.as_str()).unwrap(), json!(true));
        assert_eq!(key.exists().unwrap(), json!(false));
        assert_eq!(target.get().unwrap(), json!("payload"));

        key.set("other").unwrap();
        assert_eq!(key.renamenx(target.as_str()).unwrap(), json!(false));
        assert!(matches!(
            key.sub("missing").unwrap().rename("anywhere"),
            Err(Error::Other(_))
        ));
    }

    #[test]
    fn test_lists() {
        let key = test_key();

        assert_eq!(key.rpush("b").unwrap(), json!(1));
        assert_eq!(key.rpush("c").unwrap(), json!(2));
        assert_eq!(key.lpush("a").unwrap(), json!(3));
        assert_eq!(key.llen().unwrap(), json!(3));
        assert_eq!(key.key_type().unwrap(), json!("list"));
        assert_eq!(key.lrange(0, -1).unwrap(), json!(["a", "b", "c"]));
        assert_eq!(key.lrange(1, 1).unwrap(), json!(["b"]));
        assert_eq!(key.lindex(-1).unwrap(), json!("c"));
        assert_eq!(key.lset(1, "B").unwrap(), json!(true));
        assert_eq!(key.lindex(1).unwrap(), json!("B"));

        assert_eq!(key.lpop().unwrap(), json!("a"));
        assert_eq!(key.rpop().unwrap(), json!("c"));
        assert_eq!(key.rpop().unwrap(), json!("B"));
        assert_eq!(key.rpop().unwrap(), Value::Null);
        // popping the last element removes the entry
        assert_eq!(key.exists().unwrap(), json!(false));
    }

    #[test]
    fn test_list_editing() {
        let key = test_key();

        assert_eq!(key.lpushx("nope").unwrap(), json!(0));
        assert_eq!(key.exists().unwrap(), json!(false));

        for value in ["x", "y", "x", "z", "x"] {
            key.rpush(value).unwrap();
        }
        assert_eq!(key.lrem(2, "x").unwrap(), json!(2));
        assert_eq!(key.lrange(0, -1).unwrap(), json!(["y", "z", "x"]));
        assert_eq!(key.ltrim(0, 1).unwrap(), json!(true));
        assert_eq!(key.lrange(0, -1).unwrap(), json!(["y", "z"]));

        let other = key.sub("spill").unwrap();
        assert_eq!(key.rpoplpush(other.as_str()).unwrap(), json!("z"));
        assert_eq!(other.lrange(0, -1).unwrap(), json!(["z"]));
        assert_eq!(key.lrange(0, -1).unwrap(), json!(["y"]));
    }

    #[test]
    fn test_sets() {
        let key = test_key();

        assert_eq!(key.sadd("a").unwrap(), json!(1));
        assert_eq!(
            key.call("sadd", vec![json!("b"), json!("c"), json!("a")]).unwrap(),
            json!(2)
        );
        assert_eq!(key.scard().unwrap(), json!(3));
        assert_eq!(key.sismember("b").unwrap(), json!(true));
        assert_eq!(key.sismember("nope").unwrap(), json!(false));
        assert_eq!(key.smembers().unwrap(), json!(["a", "b", "c"]));
        assert_eq!(key.key_type().unwrap(), json!("set"));

        let moved = key.sub("moved").unwrap();
        assert_eq!(key.smove(moved.as_str(), "c").unwrap(), json!(true));
        assert_eq!(moved.smembers().unwrap(), json!(["c"]));
        assert_eq!(key.smove(moved.as_str(), "c").unwrap(), json!(false));

        let popped = key.spop().unwrap();
        assert!(popped.is_string());
        assert_eq!(key.scard().unwrap(), json!(1));
        assert!(key
            .smembers()
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .all(|member| *member != popped));

        key.spop().unwrap();
        assert_eq!(key.exists().unwrap(), json!(false));
    }

    #[test]
    fn test_srandmember_leaves_the_set() {
        let key = test_key();

        key.sadd("only").unwrap();
        assert_eq!(key.srandmember().unwrap(), json!("only"));
        assert_eq!(key.scard().unwrap(), json!(1));
        assert_eq!(key.srem("only").unwrap(), json!(1));
        assert_eq!(key.exists().unwrap(), json!(false));
    }

    #[test]
    fn test_hashes() {
        let key = test_key();

        assert_eq!(key.hset("name", "robin").unwrap(), json!(1));
        assert_eq!(key.hset("name", "sasha").unwrap(), json!(0));
        assert_eq!(key.hget("name").unwrap(), json!("sasha"));
        assert_eq!(key.hget("missing").unwrap(), Value::Null);
        assert_eq!(key.hsetnx("name", "ignored").unwrap(), json!(false));
        assert_eq!(key.hsetnx("city", "utrecht").unwrap(), json!(true));
        assert_eq!(key.hlen().unwrap(), json!(2));
        assert_eq!(key.hexists("city").unwrap(), json!(true));
        assert_eq!(key.hkeys().unwrap(), json!(["city", "name"]));
        assert_eq!(key.hvals().unwrap(), json!(["utrecht", "sasha"]));
        assert_eq!(key.hgetall().unwrap(), json!({"city": "utrecht", "name": "sasha"}));
        assert_eq!(
            key.hmget(vec![json!("name"), json!("missing")]).unwrap(),
            json!(["sasha", null])
        );
        assert_eq!(
            key.hmset(vec![json!("a"), json!("1"), json!("b"), json!("2")]).unwrap(),
            json!(true)
        );
        assert_eq!(key.hincrby("a", 5).unwrap(), json!(6));
        assert_eq!(key.hdel("a").unwrap(), json!(1));
        assert_eq!(key.hexists("a").unwrap(), json!(false));
        assert_eq!(key.key_type().unwrap(), json!("hash"));
    }

    #[test]
    fn test_sorted_sets() {
        let key = test_key();

        assert_eq!(key.zadd(2.0, "b").unwrap(), json!(1));
        assert_eq!(key.zadd(1.0, "a").unwrap(), json!(1));
        assert_eq!(key.zadd(3.0, "c").unwrap(), json!(1));
        assert_eq!(key.zadd(2.5, "b").unwrap(), json!(0));
        assert_eq!(key.zcard().unwrap(), json!(3));
        assert_eq!(key.zscore("b").unwrap(), json!(2.5));
        assert_eq!(key.zscore("missing").unwrap(), Value::Null);
        assert_eq!(key.key_type().unwrap(), json!("zset"));

        assert_eq!(key.zrank("a").unwrap(), json!(0));
        assert_eq!(key.zrevrank("a").unwrap(), json!(2));
        assert_eq!(key.zrange(0, -1).unwrap(), json!(["a", "b", "c"]));
        assert_eq!(key.zrevrange(0, 1).unwrap(), json!(["c", "b"]));
        assert_eq!(
            key.call("zrange", vec![json!(0), json!(0), json!("withscores")]).unwrap(),
            json!(["a", 1.0])
        );
        assert_eq!(key.zrangebyscore(1.5, 3.0).unwrap(), json!(["b", "c"]));
        assert_eq!(key.zcount(1.0, 2.5).unwrap(), json!(2));

        assert_eq!(key.zincrby(0.5, "a").unwrap(), json!(1.5));
        assert_eq!(key.zrem("c").unwrap(), json!(1));
        assert_eq!(
            key.call("zremrangebyrank", vec![json!(0), json!(0)]).unwrap(),
            json!(1)
        );
        assert_eq!(key.zrange(0, -1).unwrap(), json!(["b"]));
        assert_eq!(
            key.call("zremrangebyscore", vec![json!(0.0), json!(10.0)]).unwrap(),
            json!(1)
        );
        assert_eq!(key.exists().unwrap(), json!(false));
    }

    #[test]
    fn test_multi_key_ops() {
        let root = test_key();
        let (a, b) = (root.sub("a").unwrap(), root.sub("b").unwrap());

        assert_eq!(
            root.call(
                "mset",
                vec![a.as_str().into(), json!(1), b.as_str().into(), json!(2)]
            )
            .unwrap(),
            json!(true)
        );
        assert_eq!(
            root.call(
                "mget",
                vec![a.as_str().into(), b.as_str().into(), json!("missing")]
            )
            .unwrap(),
            json!(["1", "2", null])
        );
        assert_eq!(
            root.call(
                "msetnx",
                vec![a.as_str().into(), json!(9), json!("untouched"), json!(3)]
            )
            .unwrap(),
            json!(false)
        );
        assert_eq!(a.get().unwrap(), json!("1"));

        assert_eq!(
            root.call("del", vec![a.as_str().into(), b.as_str().into()]).unwrap(),
            json!(2)
        );
        assert_eq!(a.exists().unwrap(), json!(false));
    }

    #[test]
    fn test_keyspace_scans() {
        let root = test_key();
        for name in ["one", "two", "three"] {
            root.sub(name).unwrap().set(name).unwrap();
        }

        let keys = root
            .call("keys", vec![format!("{}:*", root.as_str()).into()])
            .unwrap();
        let expected = vec![
            format!("{}:one", root.as_str()),
            format!("{}:three", root.as_str()),
            format!("{}:two", root.as_str()),
        ];
        assert_eq!(keys, json!(expected));

        assert_eq!(root.call("dbsize", vec![]).unwrap(), json!(3));

        let random = root.call("randomkey", vec![]).unwrap();
        assert!(expected.contains(&random.as_str().unwrap().to_owned()), "{random}");

        assert_eq!(root.call("flushdb", vec![]).unwrap(), json!(true));
        assert_eq!(root.call("dbsize", vec![]).unwrap(), json!(0));
    }

    #[test]
    fn test_set_algebra() {
        let root = test_key();
        let (a, b) = (root.sub("a").unwrap(), root.sub("b").unwrap());
        for member in ["x", "y", "z"] {
            a.sadd(member).unwrap();
        }
        for member in ["y", "z", "w"] {
            b.sadd(member).unwrap();
        }

        assert_eq!(
            root.call("sdiff", vec![a.as_str().into(), b.as_str().into()]).unwrap(),
            json!(["x"])
        );
        assert_eq!(
            root.call("sinter", vec![a.as_str().into(), b.as_str().into()]).unwrap(),
            json!(["y", "z"])
        );
        assert_eq!(
            root.call("sunion", vec![a.as_str().into(), b.as_str().into()]).unwrap(),
            json!(["w", "x", "y", "z"])
        );

        let dest = root.sub("dest").unwrap();
        assert_eq!(
            root.call(
                "sinterstore",
                vec![dest.as_str().into(), a.as_str().into(), b.as_str().into()]
            )
            .unwrap(),
            json!(2)
        );
        assert_eq!(dest.smembers().unwrap(), json!(["y", "z"]));

        // an empty result clears the destination
        assert_eq!(
            root.call(
                "sdiffstore",
                vec![dest.as_str().into(), b.as_str().into(), b.as_str().into()]
            )
            .unwrap(),
            json!(0)
        );
        assert_eq!(dest.exists().unwrap(), json!(false));
    }

    #[test]
    fn test_wrong_type_errors() {
        let key = test_key();

        key.rpush("member").unwrap();
        assert!(matches!(key.get(), Err(Error::WrongType(_))));
        assert!(matches!(key.sadd("x"), Err(Error::WrongType(_))));

        key.delete().unwrap();
        key.set("text").unwrap();
        assert!(matches!(key.llen(), Err(Error::WrongType(_))));
        assert!(matches!(key.hget("f"), Err(Error::WrongType(_))));
        assert!(matches!(key.zscore("m"), Err(Error::WrongType(_))));
    }

    #[test]
    fn test_unimplemented_ops_error() {
        let key = test_key();

        match key.call("scan", vec![json!(0)]) {
            Err(Error::Other(message)) => assert!(message.contains("not implemented"), "{message}"),
            other => panic!("expected Other, got {other:?}"),
        }
        assert!(matches!(
            key.call("subscribe", vec![json!("channel")]),
            Err(Error::Other(_))
        ));
    }

    #[test]
    fn test_arity_errors() {
        let key = test_key();

        assert!(matches!(key.call("get", vec![json!("extra")]), Err(Error::Arity(_))));
        assert!(matches!(key.call("set", Vec::new()), Err(Error::Arity(_))));
        assert!(matches!(key.call("mset", vec![json!("odd")]), Err(Error::Arity(_))));
    }

    #[test]
    fn test_named_stores_share_data() {
        let name = random_segment();
        let first = Memory::open(name.as_str()).unwrap();
        let second = Memory::open(name.as_str()).unwrap();

        let writer = Key::new("shared".parse::<KeyPathBuf>().unwrap(), Arc::new(first));
        let reader = Key::new("shared".parse::<KeyPathBuf>().unwrap(), Arc::new(second));
        writer.set(42).unwrap();
        assert_eq!(reader.get().unwrap(), json!("42"));

        let isolated = Key::new("shared".parse::<KeyPathBuf>().unwrap(), Arc::new(Memory::new()));
        assert_eq!(isolated.get().unwrap(), Value::Null);
    }
}
