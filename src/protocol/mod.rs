pub mod command;
pub mod reply;
pub mod score;

pub use command::{Command, CommandArgs, CommandType};
pub use reply::Reply;
pub use score::{format_score, parse_score, LexBound, LexRange, ScoreBound, ScoreRange};
