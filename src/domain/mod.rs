pub mod query;
pub mod track;
pub mod vote;
