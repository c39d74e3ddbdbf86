mod autodetect;
mod rule;
mod store;

pub use autodetect::AutoDetectParams;
pub use autodetect::Observation;
pub use autodetect::ProposedRule;
pub use autodetect::propose;
pub use autodetect::proposal_to_rule_spec;
pub use rule::Classification;
pub use rule::MatchSpec;
pub use rule::NewRuleSpec;
pub use rule::NoiseCategory;
pub use rule::NoiseRule;
pub use store::Candidate;
pub use store::NoiseStore;
pub use store::NoiseStoreError;
