//! Historical incidents and the similarity-search capability

mod entity;
mod search;

pub use entity::Incident;
pub use search::SimilaritySearch;

#[cfg(test)]
pub use search::MockSimilaritySearch;
