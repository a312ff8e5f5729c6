//! Adaptive learning backend: learner accounts, a course catalog, quiz
//! grading with points and badges, progress tracking and recommendations.

pub mod core;
pub mod learn;
pub mod main_module;
pub mod security;
pub mod store;
