pub mod cycle;
pub mod dispatch;
pub mod enroll;
pub mod review;
pub mod sequence;
