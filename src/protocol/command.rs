use std::fmt;

use bytes::Bytes;

use super::score::format_score;

/// Every command issued by the client surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    // --- Hashes ---
    Hdel,
    Hexists,
    Hget,
    Hincrby,
    Hincrbyfloat,
    Hgetall,
    Hkeys,
    Hlen,
    Hmget,
    Hmset,
    Hset,
    Hsetnx,
    Hvals,
    Hscan,

    // --- Sorted sets ---
    Zadd,
    Zcard,
    Zcount,
    Zincrby,
    Zinterstore,
    Zlexcount,
    Zrange,
    Zrangebylex,
    Zrangebyscore,
    Zrank,
    Zrem,
    Zremrangebylex,
    Zremrangebyrank,
    Zremrangebyscore,
    Zrevrange,
    Zrevrangebylex,
    Zrevrangebyscore,
    Zrevrank,
    Zscore,
    Zunionstore,
    Zscan,
}

impl CommandType {
    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            CommandType::Hdel => "HDEL",
            CommandType::Hexists => "HEXISTS",
            CommandType::Hget => "HGET",
            CommandType::Hincrby => "HINCRBY",
            CommandType::Hincrbyfloat => "HINCRBYFLOAT",
            CommandType::Hgetall => "HGETALL",
            CommandType::Hkeys => "HKEYS",
            CommandType::Hlen => "HLEN",
            CommandType::Hmget => "HMGET",
            CommandType::Hmset => "HMSET",
            CommandType::Hset => "HSET",
            CommandType::Hsetnx => "HSETNX",
            CommandType::Hvals => "HVALS",
            CommandType::Hscan => "HSCAN",
            CommandType::Zadd => "ZADD",
            CommandType::Zcard => "ZCARD",
            CommandType::Zcount => "ZCOUNT",
            CommandType::Zincrby => "ZINCRBY",
            CommandType::Zinterstore => "ZINTERSTORE",
            CommandType::Zlexcount => "ZLEXCOUNT",
            CommandType::Zrange => "ZRANGE",
            CommandType::Zrangebylex => "ZRANGEBYLEX",
            CommandType::Zrangebyscore => "ZRANGEBYSCORE",
            CommandType::Zrank => "ZRANK",
            CommandType::Zrem => "ZREM",
            CommandType::Zremrangebylex => "ZREMRANGEBYLEX",
            CommandType::Zremrangebyrank => "ZREMRANGEBYRANK",
            CommandType::Zremrangebyscore => "ZREMRANGEBYSCORE",
            CommandType::Zrevrange => "ZREVRANGE",
            CommandType::Zrevrangebylex => "ZREVRANGEBYLEX",
            CommandType::Zrevrangebyscore => "ZREVRANGEBYSCORE",
            CommandType::Zrevrank => "ZREVRANK",
            CommandType::Zscore => "ZSCORE",
            CommandType::Zunionstore => "ZUNIONSTORE",
            CommandType::Zscan => "ZSCAN",
        }
    }

    /// Looks a command up by its wire name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        ALL.iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

const ALL: &[CommandType] = &[
    CommandType::Hdel,
    CommandType::Hexists,
    CommandType::Hget,
    CommandType::Hincrby,
    CommandType::Hincrbyfloat,
    CommandType::Hgetall,
    CommandType::Hkeys,
    CommandType::Hlen,
    CommandType::Hmget,
    CommandType::Hmset,
    CommandType::Hset,
    CommandType::Hsetnx,
    CommandType::Hvals,
    CommandType::Hscan,
    CommandType::Zadd,
    CommandType::Zcard,
    CommandType::Zcount,
    CommandType::Zincrby,
    CommandType::Zinterstore,
    CommandType::Zlexcount,
    CommandType::Zrange,
    CommandType::Zrangebylex,
    CommandType::Zrangebyscore,
    CommandType::Zrank,
    CommandType::Zrem,
    CommandType::Zremrangebylex,
    CommandType::Zremrangebyrank,
    CommandType::Zremrangebyscore,
    CommandType::Zrevrange,
    CommandType::Zrevrangebylex,
    CommandType::Zrevrangebyscore,
    CommandType::Zrevrank,
    CommandType::Zscore,
    CommandType::Zunionstore,
    CommandType::Zscan,
];

impl fmt::Display for CommandType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered argument list of a command.
///
/// Arguments are kept as raw tokens; turning them into wire bytes is the
/// transport's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
    args: Vec<Bytes>,
}

impl CommandArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        mut self,
        arg: impl Into<Bytes>,
    ) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn add_key(
        self,
        key: &Bytes,
    ) -> Self {
        self.add(key.clone())
    }

    pub fn add_keys<'k>(
        mut self,
        keys: impl IntoIterator<Item = &'k Bytes>,
    ) -> Self {
        self.args.extend(keys.into_iter().cloned());
        self
    }

    pub fn add_int(
        self,
        n: i64,
    ) -> Self {
        self.add(n.to_string())
    }

    pub fn add_score(
        self,
        score: f64,
    ) -> Self {
        self.add(format_score(score))
    }

    pub fn add_keyword(
        self,
        keyword: &'static str,
    ) -> Self {
        self.add(Bytes::from_static(keyword.as_bytes()))
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bytes> {
        self.args.iter()
    }

    pub fn get(
        &self,
        index: usize,
    ) -> Option<&Bytes> {
        self.args.get(index)
    }
}

/// A command ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandType,
    pub args: CommandArgs,
}

impl Command {
    pub fn new(
        kind: CommandType,
        args: CommandArgs,
    ) -> Self {
        Self { kind, args }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

impl fmt::Display for Command {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())?;
        for arg in self.args.iter() {
            write!(f, " {}", String::from_utf8_lossy(arg))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for kind in ALL {
            assert_eq!(CommandType::from_name(kind.name()), Some(*kind));
        }
        assert_eq!(CommandType::from_name("zscan"), Some(CommandType::Zscan));
        assert_eq!(CommandType::from_name("GET"), None);
    }

    #[test]
    fn test_args_builder() {
        let key = Bytes::from_static(b"board");
        let args = CommandArgs::new()
            .add_key(&key)
            .add_score(f64::NEG_INFINITY)
            .add_int(-3)
            .add_keyword("WITHSCORES");

        let tokens: Vec<&[u8]> = args.iter().map(|b| b.as_ref()).collect();
        assert_eq!(tokens, vec![&b"board"[..], &b"-inf"[..], &b"-3"[..], &b"WITHSCORES"[..]]);
    }

    #[test]
    fn test_display() {
        let cmd = Command::new(
            CommandType::Hscan,
            CommandArgs::new().add("h").add("0").add_keyword("COUNT").add_int(5),
        );
        assert_eq!(cmd.to_string(), "HSCAN h 0 COUNT 5");
    }
}
