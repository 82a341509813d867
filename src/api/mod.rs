pub mod attendance;
pub mod health;
pub mod reconcile;
pub mod students;
