//! Curve preparation: normalization, peak/end profiling and cleaning.

pub mod clean;
pub mod normalize;
pub mod profiler;

pub use clean::clean_one_curve;
pub use normalize::normalize_curve;
pub use profiler::{profile_one_curve, profile_with_report, CandidateScore, EndVotes, ProfileReport};
