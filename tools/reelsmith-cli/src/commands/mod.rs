pub mod check;
pub mod cut;
pub mod notable;
pub mod plan;
pub mod render;
pub mod score;
pub mod transcribe;
