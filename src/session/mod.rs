pub mod controller;
pub mod forms;
