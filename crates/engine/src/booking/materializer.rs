//! Appointment materialization
//!
//! Idempotently resolves Contact and Location, derives priority and an
//! urgency score, selects the applicable booking rule, and creates the
//! Appointment. A call can never produce two appointments: the
//! `(company_id, call_id)` lookup runs before anything is created, and a
//! create-time conflict resolves to the existing record.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use frontdesk_config::RuntimeConfig;
use frontdesk_core::{CallContext, RulePriority};
use frontdesk_persistence::{
    normalize_phone, Appointment, AppointmentStatus, Contact, ContactStatus, Location,
    PersistenceError, PersistenceLayer,
};

use super::rules::{select_rule, RuleContext};

const EMERGENCY_TERMS: &[&str] = &[
    "gas leak",
    "flood",
    "burst",
    "sparking",
    "smoke",
    "fire",
    "no heat",
    "no cooling",
    "carbon monoxide",
    "sewage",
    "emergency",
];

/// Resolves CRM records and creates appointments
pub struct AppointmentMaterializer {
    persistence: PersistenceLayer,
}

impl AppointmentMaterializer {
    pub fn new(persistence: PersistenceLayer) -> Self {
        Self { persistence }
    }

    /// Create (or return the existing) appointment for a call.
    pub async fn materialize(
        &self,
        context: &CallContext,
        config: &RuntimeConfig,
        today: NaiveDate,
    ) -> Result<Appointment, PersistenceError> {
        // Idempotency first: one appointment per call, ever.
        if let Some(existing) = self
            .persistence
            .appointments
            .find_by_call(&context.company_id, &context.call_id)
            .await?
        {
            tracing::info!(
                call_id = %context.call_id,
                appointment_id = %existing.id,
                "appointment already exists for call, returning unchanged"
            );
            return Ok(existing);
        }

        let contact = self.resolve_contact(context).await?;
        let location = self.resolve_location(context).await?;

        let service_type = context
            .extracted
            .problem
            .category
            .clone()
            .unwrap_or_else(|| "service".to_string());

        let requested_date = context
            .extracted
            .scheduling
            .preferred_date
            .as_deref()
            .and_then(parse_requested_date);

        let (priority, urgency_score) = derive_urgency(context, config, requested_date, today);

        let trade = if context.trade.is_empty() {
            config.trade.as_str()
        } else {
            context.trade.as_str()
        };

        let rule = select_rule(
            &config.booking_rules,
            &RuleContext {
                trade,
                service_type: &service_type,
                priority,
                requested_date,
                today,
                is_emergency: priority == RulePriority::Emergency,
            },
        );

        let time_window = context
            .extracted
            .scheduling
            .preferred_window
            .clone()
            .or_else(|| rule.and_then(|r| r.time_window.clone()));

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            company_id: context.company_id.clone(),
            contact_id: contact.id,
            location_id: location.id,
            call_id: context.call_id.clone(),
            trade: trade.to_string(),
            service_type,
            status: AppointmentStatus::Scheduled,
            scheduled_date: requested_date,
            time_window,
            priority,
            urgency_score,
            booking_rule_applied: rule.map(|r| r.id.clone()),
            created_at: now,
            updated_at: now,
        };

        match self.persistence.appointments.create(&appointment).await {
            Ok(()) => Ok(appointment),
            // A concurrent duplicate turn got there first; its record wins.
            Err(PersistenceError::Conflict(_)) => self
                .persistence
                .appointments
                .find_by_call(&context.company_id, &context.call_id)
                .await?
                .ok_or_else(|| {
                    PersistenceError::Io("conflicting appointment vanished".to_string())
                }),
            Err(e) => Err(e),
        }
    }

    /// Match by normalized phone within the company; create a `new_lead`
    /// on first sight, fill gaps and promote on a repeat sighting.
    async fn resolve_contact(&self, context: &CallContext) -> Result<Contact, PersistenceError> {
        let phone = context
            .extracted
            .contact
            .phone
            .as_deref()
            .and_then(normalize_phone)
            .unwrap_or_else(|| format!("unknown:{}", context.call_id));

        if let Some(mut existing) = self
            .persistence
            .contacts
            .find_by_phone(&context.company_id, &phone)
            .await?
        {
            let mut changed = false;
            if existing.name.is_none() && context.extracted.contact.name.is_some() {
                existing.name = context.extracted.contact.name.clone();
                changed = true;
            }
            if existing.email.is_none() && context.extracted.contact.email.is_some() {
                existing.email = context.extracted.contact.email.clone();
                changed = true;
            }
            // A repeat caller who books again is a customer now.
            if existing.status == ContactStatus::NewLead {
                existing.status = ContactStatus::Customer;
                changed = true;
            }
            if changed {
                existing.updated_at = Utc::now();
                self.persistence.contacts.update(&existing).await?;
            }
            return Ok(existing);
        }

        let mut contact = Contact::new_lead(context.company_id.as_str(), phone);
        contact.name = context.extracted.contact.name.clone();
        contact.email = context.extracted.contact.email.clone();
        self.persistence.contacts.insert(&contact).await?;
        Ok(contact)
    }

    /// Match by `(address_line1, postal_code)` within the company;
    /// incomplete address data gets a placeholder rather than blocking.
    async fn resolve_location(&self, context: &CallContext) -> Result<Location, PersistenceError> {
        let loc = &context.extracted.location;

        let (Some(address_line1), Some(postal_code)) =
            (loc.address_line1.as_deref(), loc.postal_code.as_deref())
        else {
            let placeholder = match loc.address_line1.as_deref() {
                Some(line1) => {
                    // Address without postal code: keep what we have, mark it
                    // for dispatch to complete.
                    let mut l = Location::new(context.company_id.as_str(), line1, "00000");
                    l.placeholder = true;
                    l.city = loc.city.clone();
                    l.state = loc.state.clone();
                    l
                }
                None => Location::placeholder(context.company_id.as_str(), &context.call_id),
            };
            self.persistence.locations.insert(&placeholder).await?;
            return Ok(placeholder);
        };

        if let Some(existing) = self
            .persistence
            .locations
            .find_by_address(&context.company_id, address_line1, postal_code)
            .await?
        {
            return Ok(existing);
        }

        let mut location = Location::new(context.company_id.as_str(), address_line1, postal_code);
        location.address_line2 = loc.address_line2.clone();
        location.city = loc.city.clone();
        location.state = loc.state.clone();
        self.persistence.locations.insert(&location).await?;
        Ok(location)
    }
}

fn parse_requested_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
}

/// Heuristic priority and urgency score in [0, 100]: emergency keywords in
/// the problem text, service-type weighting, and requested-date proximity.
fn derive_urgency(
    context: &CallContext,
    config: &RuntimeConfig,
    requested_date: Option<NaiveDate>,
    today: NaiveDate,
) -> (RulePriority, u8) {
    let mut score: i32 = 10;

    let problem_text = format!(
        "{} {}",
        context.extracted.problem.summary.as_deref().unwrap_or(""),
        context.extracted.problem.urgency.as_deref().unwrap_or("")
    )
    .to_lowercase();

    let has_emergency_term = EMERGENCY_TERMS
        .iter()
        .any(|t| problem_text.contains(t))
        || config
            .emergency_keywords
            .iter()
            .any(|t| problem_text.contains(&t.to_lowercase()));
    if has_emergency_term {
        score += 50;
    }

    match context.extracted.problem.urgency.as_deref() {
        Some(u) if u.eq_ignore_ascii_case("emergency") => score += 25,
        Some(u) if u.eq_ignore_ascii_case("high") || u.eq_ignore_ascii_case("urgent") => {
            score += 15
        }
        _ => {}
    }

    match context.extracted.problem.category.as_deref() {
        Some(c) if c.to_lowercase().contains("repair") => score += 15,
        Some(c) if c.to_lowercase().contains("install") => score += 5,
        _ => {}
    }

    if let Some(date) = requested_date {
        let days_out = (date - today).num_days();
        if days_out <= 0 {
            score += 25;
        } else if days_out <= 2 {
            score += 15;
        } else if days_out <= 7 {
            score += 5;
        }
    }

    let score = score.clamp(0, 100) as u8;
    let priority = if score >= 70 {
        RulePriority::Emergency
    } else if score >= 40 {
        RulePriority::High
    } else {
        RulePriority::Normal
    };

    (priority, score)
}
