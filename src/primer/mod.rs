pub mod align;
pub mod config;
pub mod extract;
pub mod mask;
pub mod matcher;
pub mod primer_set;
pub mod score;
pub mod scoring;

pub use align::LocalMatcher;
pub use config::MaskConfig;
pub use extract::FixedRegionExtractor;
pub use mask::{mask_seq, MaskMode};
pub use matcher::{MatchScratch, Matcher, MatcherKind, Orientation, PrimerAlignment, PrimerMatcher};
pub use primer_set::{CompiledPrimers, Primer, PrimerSet};
pub use score::FixedPositionMatcher;
pub use scoring::{GapPenalty, ScoringModel};
