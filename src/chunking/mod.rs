//! Chunk planning.
//!
//! Partitions the extracted article sequence into ordered chunks that fit
//! a per-request size budget. Articles are never split: an article larger
//! than the budget travels alone in an oversized chunk.

pub mod planner;

pub use planner::{Chunk, SizeUnit, estimate_article_size, plan, plan_with_unit};

/// Default maximum chunk size (in [`SizeUnit::Chars`]).
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 120_000;

/// Fixed per-article allowance for the title, publication, date, and
/// framing that accompany each body in a request.
pub const ARTICLE_OVERHEAD_CHARS: usize = 200;

/// Characters per estimated token.
pub const CHARS_PER_TOKEN: usize = 4;
