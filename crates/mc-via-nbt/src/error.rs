use thiserror::Error;

use crate::tag::TagType;

#[derive(Debug, Error)]
pub enum NbtError {
    #[error("tag tree truncated: need {needed} bytes, {remaining} left")]
    Truncated { needed: usize, remaining: usize },

    #[error("root must be a compound or TAG_End, got {0:?}")]
    RootNotCompound(TagType),

    #[error("unknown tag type id {0}")]
    UnknownTagType(u8),

    #[error("list of TAG_End with {0} elements")]
    EndList(usize),

    #[error("tag string is not valid modified UTF-8")]
    InvalidUtf8,

    #[error("tags nested deeper than {limit}")]
    TooDeep { limit: usize },

    #[error("negative array length {0}")]
    NegativeLength(i32),
}
