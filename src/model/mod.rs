//! Shared state mutated by the tasks: the patient and the syringe bank.
//!
//! Both own their locking. Callers never wrap them in extra mutexes.

mod patient;
mod syringe;

pub use patient::{LinearPatient, PatientParams, Physiology};
pub use syringe::{Reading, SyringeBank, SyringeGuard, SyringeParams, HALTED};
