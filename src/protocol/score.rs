//! Score notation and range bounds.
//!
//! Scores are 64-bit floats. Infinities are legal scores and must survive a
//! round trip exactly, NaN is never a legal score.

use std::fmt;

use bytes::Bytes;
use kvscan_error::{CommandError, KvResult};

/// Formats a score as a command argument.
///
/// Finite values use the shortest representation that parses back to the
/// same `f64`.
pub fn format_score(score: f64) -> String {
    if score == f64::INFINITY {
        "+inf".to_string()
    } else if score == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{score}")
    }
}

/// Parses a score token from a reply.
pub fn parse_score(
    token: &[u8],
    command: &'static str,
) -> KvResult<f64> {
    let text = std::str::from_utf8(token)
        .map_err(|_| CommandError::malformed(command, "score is not valid UTF-8"))?;
    parse_score_text(text).ok_or_else(|| {
        CommandError::malformed(command, format!("invalid score {text:?}")).into()
    })
}

fn parse_score_text(text: &str) -> Option<f64> {
    let lower = text.trim().to_ascii_lowercase();
    let value = match lower.as_str() {
        "inf" | "+inf" | "infinity" | "+infinity" => f64::INFINITY,
        "-inf" | "-infinity" => f64::NEG_INFINITY,
        other => other.parse::<f64>().ok()?,
    };
    (!value.is_nan()).then_some(value)
}

/// One end of a score range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    Inclusive(f64),
    Exclusive(f64),
    NegInfinity,
    PosInfinity,
}

impl ScoreBound {
    /// Parses the textual forms `1.5`, `(1.5`, `-inf`, `+inf`.
    pub fn parse(text: &str) -> KvResult<Self> {
        let invalid = || CommandError::invalid_argument(format!("invalid score bound {text:?}"));
        let (exclusive, rest) = match text.strip_prefix('(') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let value = parse_score_text(rest).ok_or_else(invalid)?;
        Ok(match value {
            v if v == f64::NEG_INFINITY => ScoreBound::NegInfinity,
            v if v == f64::INFINITY => ScoreBound::PosInfinity,
            v if exclusive => ScoreBound::Exclusive(v),
            v => ScoreBound::Inclusive(v),
        })
    }

    pub fn to_arg(&self) -> String {
        match self {
            ScoreBound::Inclusive(v) => format_score(*v),
            ScoreBound::Exclusive(v) => format!("({}", format_score(*v)),
            ScoreBound::NegInfinity => "-inf".to_string(),
            ScoreBound::PosInfinity => "+inf".to_string(),
        }
    }

    /// `true` if `score` lies on the allowed side of this bound used as a
    /// lower limit.
    pub fn admits_from_below(
        &self,
        score: f64,
    ) -> bool {
        match self {
            ScoreBound::Inclusive(v) => score >= *v,
            ScoreBound::Exclusive(v) => score > *v,
            ScoreBound::NegInfinity => true,
            ScoreBound::PosInfinity => score == f64::INFINITY,
        }
    }

    /// `true` if `score` lies on the allowed side of this bound used as an
    /// upper limit.
    pub fn admits_from_above(
        &self,
        score: f64,
    ) -> bool {
        match self {
            ScoreBound::Inclusive(v) => score <= *v,
            ScoreBound::Exclusive(v) => score < *v,
            ScoreBound::NegInfinity => score == f64::NEG_INFINITY,
            ScoreBound::PosInfinity => true,
        }
    }
}

impl From<f64> for ScoreBound {
    fn from(value: f64) -> Self {
        if value == f64::NEG_INFINITY {
            ScoreBound::NegInfinity
        } else if value == f64::INFINITY {
            ScoreBound::PosInfinity
        } else {
            ScoreBound::Inclusive(value)
        }
    }
}

impl fmt::Display for ScoreBound {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.to_arg())
    }
}

/// Closed description of a score interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub min: ScoreBound,
    pub max: ScoreBound,
}

impl ScoreRange {
    pub fn new(
        min: impl Into<ScoreBound>,
        max: impl Into<ScoreBound>,
    ) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    /// Parses string-typed bounds, e.g. `("(1", "+inf")`.
    pub fn parse(
        min: &str,
        max: &str,
    ) -> KvResult<Self> {
        Ok(Self {
            min: ScoreBound::parse(min)?,
            max: ScoreBound::parse(max)?,
        })
    }

    pub fn unbounded() -> Self {
        Self {
            min: ScoreBound::NegInfinity,
            max: ScoreBound::PosInfinity,
        }
    }

    pub fn contains(
        &self,
        score: f64,
    ) -> bool {
        self.min.admits_from_below(score) && self.max.admits_from_above(score)
    }
}

/// One end of a lexicographic range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexBound {
    Inclusive(Bytes),
    Exclusive(Bytes),
    Min,
    Max,
}

impl LexBound {
    /// Parses `-`, `+`, `[member` and `(member`.
    pub fn parse(text: &str) -> KvResult<Self> {
        match text {
            "-" => Ok(LexBound::Min),
            "+" => Ok(LexBound::Max),
            _ => {
                if let Some(rest) = text.strip_prefix('[') {
                    Ok(LexBound::Inclusive(Bytes::copy_from_slice(rest.as_bytes())))
                } else if let Some(rest) = text.strip_prefix('(') {
                    Ok(LexBound::Exclusive(Bytes::copy_from_slice(rest.as_bytes())))
                } else {
                    Err(CommandError::invalid_argument(format!(
                        "lex bound must start with '[' or '(' or be '-'/'+', got {text:?}"
                    ))
                    .into())
                }
            }
        }
    }

    pub fn to_arg(&self) -> Bytes {
        match self {
            LexBound::Inclusive(m) => prefixed(b'[', m),
            LexBound::Exclusive(m) => prefixed(b'(', m),
            LexBound::Min => Bytes::from_static(b"-"),
            LexBound::Max => Bytes::from_static(b"+"),
        }
    }

    pub fn admits_from_below(
        &self,
        member: &[u8],
    ) -> bool {
        match self {
            LexBound::Inclusive(m) => member >= m.as_ref(),
            LexBound::Exclusive(m) => member > m.as_ref(),
            LexBound::Min => true,
            LexBound::Max => false,
        }
    }

    pub fn admits_from_above(
        &self,
        member: &[u8],
    ) -> bool {
        match self {
            LexBound::Inclusive(m) => member <= m.as_ref(),
            LexBound::Exclusive(m) => member < m.as_ref(),
            LexBound::Min => false,
            LexBound::Max => true,
        }
    }
}

fn prefixed(
    prefix: u8,
    member: &Bytes,
) -> Bytes {
    let mut buf = Vec::with_capacity(member.len() + 1);
    buf.push(prefix);
    buf.extend_from_slice(member);
    Bytes::from(buf)
}

/// Lexicographic interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexRange {
    pub min: LexBound,
    pub max: LexBound,
}

impl LexRange {
    pub fn new(
        min: LexBound,
        max: LexBound,
    ) -> Self {
        Self { min, max }
    }

    pub fn parse(
        min: &str,
        max: &str,
    ) -> KvResult<Self> {
        Ok(Self {
            min: LexBound::parse(min)?,
            max: LexBound::parse(max)?,
        })
    }

    pub fn contains(
        &self,
        member: &[u8],
    ) -> bool {
        self.min.admits_from_below(member) && self.max.admits_from_above(member)
    }
}
