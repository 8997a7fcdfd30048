//! Booking: rule selection and appointment materialization

mod materializer;
mod rules;

pub use materializer::AppointmentMaterializer;
pub use rules::{select_rule, RuleContext};
