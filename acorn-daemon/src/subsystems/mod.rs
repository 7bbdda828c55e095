pub mod broadcast;
pub mod pipeline;
pub mod search;
pub mod vectorize;
