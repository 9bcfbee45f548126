//! Multi-source store-aggregate (`ZUNIONSTORE` / `ZINTERSTORE`).

use std::{collections::BTreeMap, fmt, str::FromStr};

use bytes::Bytes;
use kvscan_error::{CommandError, KvResult};
use serde::{Deserialize, Serialize};

use crate::protocol::{Command, CommandArgs, CommandType};

/// How scores of one member are combined across sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Aggregate {
    #[default]
    Sum,
    Min,
    Max,
}

impl Aggregate {
    pub fn keyword(&self) -> &'static str {
        match self {
            Aggregate::Sum => "SUM",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }

    fn combine(
        &self,
        acc: f64,
        score: f64,
    ) -> f64 {
        match self {
            Aggregate::Sum => nan_to_zero(acc + score),
            Aggregate::Min => acc.min(score),
            Aggregate::Max => acc.max(score),
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for Aggregate {
    type Err = kvscan_error::StackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SUM" => Ok(Aggregate::Sum),
            "MIN" => Ok(Aggregate::Min),
            "MAX" => Ok(Aggregate::Max),
            other => {
                Err(CommandError::invalid_argument(format!("unknown aggregate {other:?}")).into())
            }
        }
    }
}

/// Union keeps members present in any source, intersect only those present
/// in every source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Union,
    Intersect,
}

impl StoreMode {
    pub fn command_type(&self) -> CommandType {
        match self {
            StoreMode::Union => CommandType::Zunionstore,
            StoreMode::Intersect => CommandType::Zinterstore,
        }
    }
}

/// Optional `WEIGHTS` and `AGGREGATE` clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreArgs {
    weights: Option<Vec<f64>>,
    aggregate: Option<Aggregate>,
}

impl StoreArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// One weight per source key, in key order.
    pub fn weights(
        mut self,
        weights: impl IntoIterator<Item = f64>,
    ) -> Self {
        self.weights = Some(weights.into_iter().collect());
        self
    }

    pub fn aggregate(
        mut self,
        aggregate: Aggregate,
    ) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    pub fn sum(self) -> Self {
        self.aggregate(Aggregate::Sum)
    }

    pub fn min(self) -> Self {
        self.aggregate(Aggregate::Min)
    }

    pub fn max(self) -> Self {
        self.aggregate(Aggregate::Max)
    }

    pub fn aggregate_op(&self) -> Aggregate {
        self.aggregate.unwrap_or_default()
    }

    /// Weight of every source, 1.0 when none were given.
    pub fn weights_for(
        &self,
        sources: usize,
    ) -> KvResult<Vec<f64>> {
        match &self.weights {
            None => Ok(vec![1.0; sources]),
            Some(w) if w.len() == sources => {
                if w.iter().any(|x| x.is_nan()) {
                    return Err(CommandError::invalid_argument("weight is not a number").into());
                }
                Ok(w.clone())
            }
            Some(w) => Err(CommandError::invalid_argument(format!(
                "{} weights given for {sources} source keys",
                w.len()
            ))
            .into()),
        }
    }
}

/// Builds `Z{UNION,INTER}STORE destination numkeys key... [WEIGHTS ...] [AGGREGATE ...]`.
pub fn store_command(
    mode: StoreMode,
    destination: &Bytes,
    keys: &[Bytes],
    args: Option<&StoreArgs>,
) -> KvResult<Command> {
    let kind = mode.command_type();
    if keys.is_empty() {
        return Err(CommandError::invalid_argument(format!("{kind} needs at least one source key")).into());
    }
    let numkeys = i64::try_from(keys.len())
        .map_err(|_| CommandError::invalid_argument("too many source keys"))?;

    let mut cmd_args = CommandArgs::new()
        .add_key(destination)
        .add_int(numkeys)
        .add_keys(keys);

    if let Some(args) = args {
        if args.weights.is_some() {
            cmd_args = cmd_args.add_keyword("WEIGHTS");
            for w in args.weights_for(keys.len())? {
                cmd_args = cmd_args.add_score(w);
            }
        }
        if let Some(op) = args.aggregate {
            cmd_args = cmd_args.add_keyword("AGGREGATE").add_keyword(op.keyword());
        }
    }
    Ok(Command::new(kind, cmd_args))
}

fn nan_to_zero(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v
    }
}

/// Combines weighted sources into the destination members and scores.
///
/// Each source is `(weight, members)`. A member's contribution from one source
/// is `weight * score`, with `0 * ±inf` taken as 0. Sources that do not hold
/// the member contribute nothing: `SUM` adds only what is present (the same as
/// counting absence as 0), `MIN` and `MAX` pick among present scores only.
/// `+inf + -inf` under `SUM` yields 0.
pub fn aggregate<'s, I>(
    mode: StoreMode,
    op: Aggregate,
    sources: I,
) -> BTreeMap<Bytes, f64>
where
    I: IntoIterator<Item = (f64, &'s BTreeMap<Bytes, f64>)>,
{
    let mut acc: BTreeMap<Bytes, (f64, usize)> = BTreeMap::new();
    let mut source_count = 0usize;

    for (weight, members) in sources {
        source_count += 1;
        for (member, score) in members {
            let weighted = nan_to_zero(weight * score);
            acc.entry(member.clone())
                .and_modify(|(total, seen)| {
                    *total = op.combine(*total, weighted);
                    *seen += 1;
                })
                .or_insert((weighted, 1));
        }
    }

    acc.into_iter()
        .filter(|(_, (_, seen))| mode == StoreMode::Union || *seen == source_count)
        .map(|(member, (score, _))| (member, score))
        .collect()
}

#[cfg(test)]
mod tests {
    use kvscan_error::StatusCode;

    use super::*;

    fn set(items: &[(&'static str, f64)]) -> BTreeMap<Bytes, f64> {
        items
            .iter()
            .map(|(m, s)| (Bytes::from_static(m.as_bytes()), *s))
            .collect()
    }

    fn score(
        out: &BTreeMap<Bytes, f64>,
        member: &'static str,
    ) -> Option<f64> {
        out.get(&Bytes::from_static(member.as_bytes())).copied()
    }

    #[test]
    fn test_sum_weighted_union() {
        let a = set(&[("x", 1.0), ("y", 2.0)]);
        let b = set(&[("y", 3.0), ("z", 4.0)]);
        let out = aggregate(StoreMode::Union, Aggregate::Sum, [(1.0, &a), (2.0, &b)]);
        assert_eq!(score(&out, "x"), Some(1.0));
        assert_eq!(score(&out, "y"), Some(8.0));
        assert_eq!(score(&out, "z"), Some(8.0));
    }

    #[test]
    fn test_min_max_ignore_absent_sources() {
        let a = set(&[("x", -1.0)]);
        let b = set(&[("x", 5.0), ("only_b", 5.0)]);
        let min = aggregate(StoreMode::Union, Aggregate::Min, [(1.0, &a), (2.0, &b)]);
        assert_eq!(score(&min, "x"), Some(-1.0));
        assert_eq!(score(&min, "only_b"), Some(10.0));

        let max = aggregate(StoreMode::Union, Aggregate::Max, [(1.0, &a), (2.0, &b)]);
        assert_eq!(score(&max, "x"), Some(10.0));
    }

    #[test]
    fn test_intersect_keeps_common_members() {
        let a = set(&[("x", 1.0), ("y", 1.0)]);
        let b = set(&[("y", 2.0)]);
        let out = aggregate(StoreMode::Intersect, Aggregate::Sum, [(1.0, &a), (1.0, &b)]);
        assert_eq!(out.len(), 1);
        assert_eq!(score(&out, "y"), Some(3.0));
    }

    #[test]
    fn test_infinity_edges() {
        let a = set(&[("m", f64::INFINITY)]);
        let b = set(&[("m", f64::NEG_INFINITY)]);
        let out = aggregate(StoreMode::Union, Aggregate::Sum, [(1.0, &a), (1.0, &b)]);
        assert_eq!(score(&out, "m"), Some(0.0));

        let out = aggregate(StoreMode::Union, Aggregate::Sum, [(0.0, &a)]);
        assert_eq!(score(&out, "m"), Some(0.0));
    }

    #[test]
    fn test_store_command_shape() {
        let keys = [Bytes::from_static(b"a"), Bytes::from_static(b"b")];
        let args = StoreArgs::new().weights([1.0, 2.5]).max();
        let cmd = store_command(StoreMode::Union, &Bytes::from_static(b"d"), &keys, Some(&args))
            .unwrap();
        assert_eq!(cmd.to_string(), "ZUNIONSTORE d 2 a b WEIGHTS 1 2.5 AGGREGATE MAX");
    }

    #[test]
    fn test_weight_count_mismatch() {
        let keys = [Bytes::from_static(b"a"), Bytes::from_static(b"b")];
        let args = StoreArgs::new().weights([1.0]);
        let err = store_command(StoreMode::Intersect, &Bytes::from_static(b"d"), &keys, Some(&args))
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidArgs);
    }

    #[test]
    fn test_aggregate_parse() {
        assert_eq!("min".parse::<Aggregate>().unwrap(), Aggregate::Min);
        assert!("avg".parse::<Aggregate>().is_err());
        assert_eq!(Aggregate::default(), Aggregate::Sum);
    }
}
