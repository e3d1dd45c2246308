pub mod flatten;
pub mod normalize;
