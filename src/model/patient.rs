//! # Patient physiology.
//!
//! [`Physiology`] is the narrow seam the tasks see: compute glycemia, inject one
//! step of glucose or insulin, and expose the two decision thresholds.
//! [`LinearPatient`] is the built-in model:
//!
//! ```text
//! glycemia = k_glucose * glucose - k_insulin * insulin
//! ```
//!
//! ## Locking
//! Each field sits behind its own mutex. Every accessor that touches both takes
//! them in the same order (glucose, then insulin), so glycemia is never computed
//! from a torn pair and two accessors can never deadlock each other.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Constants of the linear model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatientParams {
    pub k_glucose: f64,
    pub k_insulin: f64,
    /// At or above this glycemia the controller asks for insulin.
    pub ref_threshold: f64,
    /// At or below this glycemia the controller asks for glucose.
    pub crit_threshold: f64,
    pub glucose_step: i64,
    pub insulin_step: i64,
}

impl Default for PatientParams {
    fn default() -> Self {
        Self {
            k_glucose: 1.6,
            k_insulin: 1.36,
            ref_threshold: 120.0,
            crit_threshold: 60.0,
            glucose_step: 1,
            insulin_step: 1,
        }
    }
}

/// Physiology seen by the controller and the infusion tasks.
pub trait Physiology: Send + Sync + 'static {
    /// Current glycemia, read atomically across both inputs.
    fn compute_glycemia(&self) -> f64;

    /// Adds one glucose step.
    fn inject_glucose(&self);

    /// Adds one insulin step.
    fn inject_insulin(&self);

    /// Glycemia at or above which insulin is requested.
    fn ref_threshold(&self) -> f64;

    /// Glycemia at or below which glucose is requested.
    fn crit_threshold(&self) -> f64;
}

/// Linear glucose/insulin model.
#[derive(Debug)]
pub struct LinearPatient {
    glucose: Mutex<i64>,
    insulin: Mutex<i64>,
    params: PatientParams,
}

impl LinearPatient {
    pub fn new(initial_glucose: i64, initial_insulin: i64, params: PatientParams) -> Self {
        Self {
            glucose: Mutex::new(initial_glucose),
            insulin: Mutex::new(initial_insulin),
            params,
        }
    }

    pub fn params(&self) -> &PatientParams {
        &self.params
    }

    /// Snapshot of `(glucose, insulin)`.
    pub fn levels(&self) -> (i64, i64) {
        let (g, i) = self.lock_both();
        (*g, *i)
    }

    fn lock_both(&self) -> (MutexGuard<'_, i64>, MutexGuard<'_, i64>) {
        let g = self.glucose.lock().unwrap_or_else(PoisonError::into_inner);
        let i = self.insulin.lock().unwrap_or_else(PoisonError::into_inner);
        (g, i)
    }
}

impl Physiology for LinearPatient {
    fn compute_glycemia(&self) -> f64 {
        let (g, i) = self.lock_both();
        self.params.k_glucose * (*g as f64) - self.params.k_insulin * (*i as f64)
    }

    fn inject_glucose(&self) {
        let mut g = self.glucose.lock().unwrap_or_else(PoisonError::into_inner);
        *g += self.params.glucose_step;
    }

    fn inject_insulin(&self) {
        let mut i = self.insulin.lock().unwrap_or_else(PoisonError::into_inner);
        *i += self.params.insulin_step;
    }

    fn ref_threshold(&self) -> f64 {
        self.params.ref_threshold
    }

    fn crit_threshold(&self) -> f64 {
        self.params.crit_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_initial_glycemia_and_one_insulin_step() {
        let p = LinearPatient::new(100, 0, PatientParams::default());
        assert!(approx(p.compute_glycemia(), 160.0));

        p.inject_insulin();
        assert!(approx(p.compute_glycemia(), 158.64));
        assert!(p.compute_glycemia() >= p.ref_threshold());
    }

    #[test]
    fn test_glucose_step_raises_glycemia() {
        let p = LinearPatient::new(30, 0, PatientParams::default());
        assert!(p.compute_glycemia() <= p.crit_threshold());
        p.inject_glucose();
        assert_eq!(p.levels(), (31, 0));
        assert!(approx(p.compute_glycemia(), 49.6));
    }

    #[test]
    fn test_concurrent_injections_are_not_lost() {
        let p = Arc::new(LinearPatient::new(0, 0, PatientParams::default()));
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let p = Arc::clone(&p);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        if n % 2 == 0 {
                            p.inject_glucose();
                        } else {
                            p.inject_insulin();
                        }
                        let _ = p.compute_glycemia();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(p.levels(), (500, 500));
    }
}
