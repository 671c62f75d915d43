pub mod cycle;
pub mod enrollment;
pub mod health;
pub mod scheduler_token;
pub mod sequence;
