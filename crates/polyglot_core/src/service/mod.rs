//! Localization engine and the entry lifecycle that drives it.
//!
//! # Responsibility
//! - Keep locale groups linked and shared fields mirrored (`localization_service`).
//! - Orchestrate create/update flows around the engine (`entry_lifecycle`).

pub mod entry_lifecycle;
pub mod localization_service;
