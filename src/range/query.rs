use bytes::Bytes;
use kvscan_error::{CommandError, KvResult};
use tracing::trace;

use crate::{
    protocol::{Command, CommandArgs, CommandType, LexRange, Reply, ScoreRange},
    streaming::{collect, deliver, ReplyElement, StreamingChannel},
};

/// Which ordering a range query selects on.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeBy {
    /// Zero-based ranks, negative values count from the end.
    Rank { start: i64, stop: i64 },
    Score(ScoreRange),
    Lex(LexRange),
}

/// Single description of a sorted-set range read.
///
/// Covers every `Z[REV]RANGE[BYSCORE|BYLEX]` variant. A range read is one
/// round trip: there is no cursor and the page comes back ordered by rank,
/// score or member, ascending unless [`rev`](RangeQuery::rev) is set. Equal
/// scores are ordered by member bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    by: RangeBy,
    reverse: bool,
    limit: Option<(i64, i64)>,
    with_scores: bool,
}

impl RangeQuery {
    fn new(by: RangeBy) -> Self {
        Self {
            by,
            reverse: false,
            limit: None,
            with_scores: false,
        }
    }

    pub fn by_rank(
        start: i64,
        stop: i64,
    ) -> Self {
        Self::new(RangeBy::Rank { start, stop })
    }

    pub fn by_score(range: ScoreRange) -> Self {
        Self::new(RangeBy::Score(range))
    }

    pub fn by_lex(range: LexRange) -> Self {
        Self::new(RangeBy::Lex(range))
    }

    /// Highest first.
    pub fn rev(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// `LIMIT offset count`; score and lex ranges only.
    pub fn limit(
        mut self,
        offset: i64,
        count: i64,
    ) -> Self {
        self.limit = Some((offset, count));
        self
    }

    /// Reply members together with their scores; rank and score ranges only.
    pub fn with_scores(mut self) -> Self {
        self.with_scores = true;
        self
    }

    pub fn by(&self) -> &RangeBy {
        &self.by
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    pub fn is_with_scores(&self) -> bool {
        self.with_scores
    }

    pub fn command_type(&self) -> CommandType {
        match (&self.by, self.reverse) {
            (RangeBy::Rank { .. }, false) => CommandType::Zrange,
            (RangeBy::Rank { .. }, true) => CommandType::Zrevrange,
            (RangeBy::Score(_), false) => CommandType::Zrangebyscore,
            (RangeBy::Score(_), true) => CommandType::Zrevrangebyscore,
            (RangeBy::Lex(_), false) => CommandType::Zrangebylex,
            (RangeBy::Lex(_), true) => CommandType::Zrevrangebylex,
        }
    }

    /// Builds the request. Reverse score and lex variants send `max` first.
    pub fn to_command(
        &self,
        key: &Bytes,
    ) -> KvResult<Command> {
        let kind = self.command_type();
        let mut args = CommandArgs::new().add_key(key);

        match &self.by {
            RangeBy::Rank { start, stop } => {
                if self.limit.is_some() {
                    return Err(invalid(kind, "LIMIT is not supported on rank ranges"));
                }
                args = args.add_int(*start).add_int(*stop);
            }
            RangeBy::Score(range) => {
                let (first, second) = if self.reverse {
                    (range.max, range.min)
                } else {
                    (range.min, range.max)
                };
                args = args.add(first.to_arg()).add(second.to_arg());
            }
            RangeBy::Lex(range) => {
                if self.with_scores {
                    return Err(invalid(kind, "WITHSCORES is not supported on lex ranges"));
                }
                let (first, second) = if self.reverse {
                    (&range.max, &range.min)
                } else {
                    (&range.min, &range.max)
                };
                args = args.add(first.to_arg()).add(second.to_arg());
            }
        }

        if self.with_scores {
            args = args.add_keyword("WITHSCORES");
        }
        if let Some((offset, count)) = self.limit {
            args = args.add_keyword("LIMIT").add_int(offset).add_int(count);
        }
        Ok(Command::new(kind, args))
    }

    /// Checks that `E` matches the reply shape this query asks for.
    pub fn expect_element<E: ReplyElement>(&self) -> KvResult<()> {
        let arity = if self.with_scores { 2 } else { 1 };
        if E::ARITY != arity {
            return Err(invalid(
                self.command_type(),
                if self.with_scores {
                    "WITHSCORES query read as plain members"
                } else {
                    "plain member query read with scores"
                },
            ));
        }
        Ok(())
    }
}

fn invalid(
    kind: CommandType,
    reason: &str,
) -> kvscan_error::StackError {
    CommandError::invalid_argument(format!("{kind}: {reason}")).into()
}

/// Interprets a range reply as one materialized page.
pub fn range_page<E: ReplyElement>(
    query: &RangeQuery,
    reply: Reply,
) -> KvResult<Vec<E>> {
    query.expect_element::<E>()?;
    let command = query.command_type().name();
    let page = collect::<E>(reply.into_array(command)?, command)?;
    trace!(command, page_len = page.len(), "Range page");
    Ok(page)
}

/// Streams a range reply into `channel`, returning the element count.
pub fn range_stream<E, C>(
    query: &RangeQuery,
    reply: Reply,
    channel: &mut C,
) -> KvResult<u64>
where
    E: ReplyElement,
    C: StreamingChannel<E> + ?Sized,
{
    query.expect_element::<E>()?;
    let command = query.command_type().name();
    deliver::<E, C>(reply.into_array(command)?, channel, command)
}
