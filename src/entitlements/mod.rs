//! Licensing decisions: what a plan grants, whether an account may use the
//! product right now, how many devices it may register, and how billing events
//! move an account between plans.
//!
//! Everything here is a pure function of its inputs. Callers pass the current
//! time in; persistence and atomicity live in `db::queries`.

mod billing;
mod evaluator;
mod plans;
mod pricing;
mod registrar;

pub use billing::*;
pub use evaluator::*;
pub use plans::*;
pub use pricing::*;
pub use registrar::*;
