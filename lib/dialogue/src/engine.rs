//! The dialogue engine.
//!
//! One inbound event becomes one turn: acquire the per-user permit, load
//! the session, interpret the input against the current state, and persist
//! the next state. Each state's accepted alphabet lives in its own handler,
//! so validation sits next to the state's definition. Anything outside the
//! alphabet re-prompts and leaves both the state and the accumulated draft
//! untouched.
//!
//! Provider failures never corrupt a turn: the session snapshot taken
//! before dispatch is restored, the user is asked to try again, and a retry
//! replays the same transition.

use crate::action::Action;
use crate::error::EngineError;
use crate::event::{ChannelEvent, EventKind};
use crate::reply::{MenuOption, Reply};
use bookline_availability::{
    AvailabilityError, SettingsProvider, StaffDay, slots_for_any_staff, slots_for_staff,
    upcoming_dates,
};
use bookline_catalog::{CatalogProvider, Product, ServiceItem};
use bookline_core::{BookingId, ProductId, TenantId};
use bookline_ledger::{
    Booking, BookingLedger, BookingRequest, BookingSource, CommitError, CommitService,
    OrderRequest,
};
use bookline_session::{
    BookingDraft, DialogueState, Session, SessionGate, SessionStore, StaffChoice,
};
use bookline_staffing::{Leave, Staff, StaffProvider, TimeWindow};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use futures::future;
use std::fmt;
use std::sync::Arc;

const MSG_NOT_UNDERSTOOD: &str = "Sorry, I didn't catch that.";
const MSG_TRY_AGAIN: &str = "Something went wrong on our side. Please try again in a moment.";
const MSG_UNAVAILABLE: &str =
    "Online booking is temporarily unavailable. Please contact us directly.";
const MSG_RESTART: &str = "Let's start over.";

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Free-text keywords that abandon the current flow from any state.
    pub cancel_keywords: Vec<String>,
    /// How many dates the date menu offers.
    pub date_menu_limit: usize,
    /// How many start times the time menu offers.
    pub time_menu_limit: usize,
    /// The largest quantity the purchase flow offers.
    pub max_order_quantity: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cancel_keywords: vec!["cancel".to_string()],
            date_menu_limit: 10,
            time_menu_limit: 10,
            max_order_quantity: 5,
        }
    }
}

/// Normalized input for one turn.
enum Input {
    /// Free text from the user.
    Text(String),
    /// A parsed menu action.
    Act(Action),
    /// Postback data outside the alphabet.
    Invalid,
}

/// A turn-level failure the engine absorbs by restoring the session
/// snapshot and asking the user to retry.
struct StepError {
    reason: String,
}

fn upstream(e: impl fmt::Display) -> StepError {
    StepError {
        reason: e.to_string(),
    }
}

/// The conversation state machine.
pub struct DialogueEngine {
    store: Arc<dyn SessionStore>,
    gate: Arc<SessionGate>,
    catalog: Arc<dyn CatalogProvider>,
    staffing: Arc<dyn StaffProvider>,
    settings: Arc<dyn SettingsProvider>,
    ledger: Arc<dyn BookingLedger>,
    commit: Arc<CommitService>,
    config: EngineConfig,
}

impl DialogueEngine {
    /// Creates an engine over the given collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn SessionStore>,
        gate: Arc<SessionGate>,
        catalog: Arc<dyn CatalogProvider>,
        staffing: Arc<dyn StaffProvider>,
        settings: Arc<dyn SettingsProvider>,
        ledger: Arc<dyn BookingLedger>,
        commit: Arc<CommitService>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            gate,
            catalog,
            staffing,
            settings,
            ledger,
            commit,
            config,
        }
    }

    /// Runs one dialogue turn.
    ///
    /// `now` is the tenant-local wall clock, used for date menus and
    /// same-day past-time exclusion. Turns for the same (tenant, user) are
    /// serialized by the gate; the session write is additionally
    /// compare-and-swap so a lost update cannot slip through.
    pub async fn handle_event(
        &self,
        event: ChannelEvent,
        now: NaiveDateTime,
    ) -> Result<Reply, EngineError> {
        let ChannelEvent {
            tenant_id,
            user_id,
            kind,
        } = event;
        let _permit = self.gate.acquire(tenant_id, &user_id).await;

        if matches!(kind, EventKind::Unfollow) {
            self.store.clear(tenant_id, &user_id).await?;
            return Ok(Reply::empty());
        }

        // An expired session reads as absent: the flow transparently
        // restarts instead of continuing stale selections.
        let mut session = self
            .store
            .get(tenant_id, &user_id)
            .await?
            .unwrap_or_else(|| Session::new(tenant_id, user_id.clone()));

        let ttl = match self.settings.booking_settings(tenant_id).await {
            Ok(settings) => Duration::minutes(i64::from(settings.session_ttl_minutes)),
            Err(e) => {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "settings lookup failed");
                return Ok(Reply::text(MSG_TRY_AGAIN));
            }
        };

        let input = match kind {
            EventKind::Follow => {
                session.reset();
                session.touch();
                self.store.put(session, ttl).await?;
                return Ok(self.main_menu_reply("Welcome! What can I do for you?"));
            }
            EventKind::Text { text } => Input::Text(text),
            EventKind::Postback { data } => match Action::parse(&data) {
                Some(action) => Input::Act(action),
                None => Input::Invalid,
            },
            EventKind::Unfollow => return Ok(Reply::empty()),
        };

        if self.is_cancel(&input) {
            let reply = if session.state.is_idle() {
                self.main_menu_reply("What can I do for you?")
            } else {
                session.reset();
                Reply::text("Cancelled. Nothing was booked.")
                    .with_menu("What can I do for you?", self.main_menu())
            };
            session.touch();
            self.store.put(session, ttl).await?;
            return Ok(reply);
        }

        let snapshot = session.clone();
        let reply = match self.dispatch(&mut session, input, now).await {
            Ok(reply) => reply,
            Err(StepError { reason }) => {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    state = snapshot.state.name(),
                    error = %reason,
                    "dialogue turn hit an upstream failure"
                );
                // State unchanged so a retry replays the same transition.
                session = snapshot;
                Reply::text(MSG_TRY_AGAIN)
            }
        };

        session.touch();
        self.store.put(session, ttl).await?;
        Ok(reply)
    }

    fn is_cancel(&self, input: &Input) -> bool {
        match input {
            Input::Act(Action::Cancel) => true,
            Input::Text(text) => {
                let trimmed = text.trim();
                self.config
                    .cancel_keywords
                    .iter()
                    .any(|k| k.eq_ignore_ascii_case(trimmed))
            }
            _ => false,
        }
    }

    async fn dispatch(
        &self,
        session: &mut Session,
        input: Input,
        now: NaiveDateTime,
    ) -> Result<Reply, StepError> {
        match session.state.clone() {
            DialogueState::Idle => self.on_idle(session, input, now).await,
            DialogueState::SelectingCategory => self.on_selecting_category(session, input).await,
            DialogueState::SelectingService => {
                self.on_selecting_service(session, input, now).await
            }
            DialogueState::SelectingStaff => self.on_selecting_staff(session, input, now).await,
            DialogueState::SelectingDate { offered } => {
                self.on_selecting_date(session, &offered, input, now).await
            }
            DialogueState::SelectingTime { offered } => {
                self.on_selecting_time(session, &offered, input, now).await
            }
            DialogueState::InputtingNote => self.on_inputting_note(session, input).await,
            DialogueState::ConfirmingBooking => {
                self.on_confirming_booking(session, input, now).await
            }
            DialogueState::BrowsingProducts => self.on_browsing_products(session, input).await,
            DialogueState::ViewingProductDetail { product_id } => {
                self.on_viewing_product_detail(session, product_id, input)
                    .await
            }
            DialogueState::SelectingQuantity { product_id } => {
                self.on_selecting_quantity(session, product_id, input).await
            }
            DialogueState::ConfirmingPurchase {
                product_id,
                quantity,
            } => {
                self.on_confirming_purchase(session, product_id, quantity, input)
                    .await
            }
            DialogueState::BrowsingCoupons => self.on_browsing_coupons(session, input).await,
            DialogueState::ViewingBookings { offered } => {
                self.on_viewing_bookings(session, &offered, input).await
            }
            DialogueState::ConfirmingCancelBooking { booking_id } => {
                self.on_confirming_cancel_booking(session, booking_id, input)
                    .await
            }
        }
    }

    // ---- idle and flow entry ------------------------------------------

    async fn on_idle(
        &self,
        session: &mut Session,
        input: Input,
        now: NaiveDateTime,
    ) -> Result<Reply, StepError> {
        match input {
            Input::Act(Action::StartBooking) => self.start_booking(session).await,
            Input::Act(Action::BrowseProducts) => self.enter_products(session).await,
            Input::Act(Action::BrowseCoupons) => self.enter_coupons(session, now).await,
            Input::Act(Action::ViewBookings) => self.enter_bookings(session, now).await,
            // Free text at idle falls back to the main menu.
            Input::Text(_) => Ok(self.main_menu_reply("What can I do for you?")),
            _ => Ok(self.main_menu_reply(MSG_NOT_UNDERSTOOD)),
        }
    }

    async fn start_booking(&self, session: &mut Session) -> Result<Reply, StepError> {
        let categories = self
            .catalog
            .list_categories(session.tenant_id)
            .await
            .map_err(upstream)?;

        // With zero or one category the selection step is skipped.
        if categories.len() <= 1 {
            session.draft = BookingDraft::default();
            session.draft.category_id = categories.first().map(|c| c.id);
            let category_id = session.draft.category_id;
            return self.enter_service_selection(session, category_id).await;
        }

        session.draft = BookingDraft::default();
        session.state = DialogueState::SelectingCategory;
        let options = categories
            .iter()
            .map(|c| MenuOption::new(&Action::SelectCategory(c.id), &c.name))
            .collect();
        Ok(Reply::empty().with_menu("Which category?", options))
    }

    async fn enter_service_selection(
        &self,
        session: &mut Session,
        category_id: Option<bookline_core::CategoryId>,
    ) -> Result<Reply, StepError> {
        let services = self
            .catalog
            .list_services(session.tenant_id, category_id)
            .await
            .map_err(upstream)?;
        if services.is_empty() {
            session.reset();
            return Ok(Reply::text(MSG_UNAVAILABLE));
        }

        session.state = DialogueState::SelectingService;
        Ok(Reply::empty().with_menu("Which service?", service_options(&services)))
    }

    async fn on_selecting_category(
        &self,
        session: &mut Session,
        input: Input,
    ) -> Result<Reply, StepError> {
        match input {
            Input::Act(Action::SelectCategory(id)) => {
                let categories = self
                    .catalog
                    .list_categories(session.tenant_id)
                    .await
                    .map_err(upstream)?;
                if !categories.iter().any(|c| c.id == id) {
                    return self.reprompt(session, MSG_NOT_UNDERSTOOD).await;
                }
                session.draft.category_id = Some(id);
                self.enter_service_selection(session, Some(id)).await
            }
            Input::Act(Action::Back) => {
                session.reset();
                Ok(self.main_menu_reply("What can I do for you?"))
            }
            _ => self.reprompt(session, MSG_NOT_UNDERSTOOD).await,
        }
    }

    async fn on_selecting_service(
        &self,
        session: &mut Session,
        input: Input,
        now: NaiveDateTime,
    ) -> Result<Reply, StepError> {
        match input {
            Input::Act(Action::SelectService(id)) => {
                let service = match self.catalog.get_service(session.tenant_id, id).await {
                    Ok(service) if service.active => service,
                    Ok(_) => return self.reprompt(session, MSG_NOT_UNDERSTOOD).await,
                    Err(bookline_catalog::CatalogError::ServiceNotFound { .. }) => {
                        return self.reprompt(session, MSG_NOT_UNDERSTOOD).await;
                    }
                    Err(e) => return Err(upstream(e)),
                };
                session.draft.service_id = Some(service.id);

                let settings = self
                    .settings
                    .booking_settings(session.tenant_id)
                    .await
                    .map_err(upstream)?;
                if settings.offer_staff_choice && service.requires_staff {
                    let staff = self
                        .staffing
                        .list_staff_for_service(session.tenant_id, service.id)
                        .await
                        .map_err(upstream)?;
                    if staff.is_empty() {
                        session.reset();
                        return Ok(Reply::text(MSG_UNAVAILABLE));
                    }
                    session.state = DialogueState::SelectingStaff;
                    return Ok(Reply::empty()
                        .with_menu("Who would you like?", staff_options(&staff)));
                }

                session.draft.staff = Some(StaffChoice::Any);
                self.enter_date_selection(session, now, None).await
            }
            Input::Act(Action::Back) => {
                session.draft.service_id = None;
                self.start_booking(session).await
            }
            _ => self.reprompt(session, MSG_NOT_UNDERSTOOD).await,
        }
    }

    async fn on_selecting_staff(
        &self,
        session: &mut Session,
        input: Input,
        now: NaiveDateTime,
    ) -> Result<Reply, StepError> {
        let Some(service_id) = session.draft.service_id else {
            return Ok(self.restart(session));
        };
        match input {
            Input::Act(Action::SelectStaff(id)) => {
                let staff = self
                    .staffing
                    .list_staff_for_service(session.tenant_id, service_id)
                    .await
                    .map_err(upstream)?;
                if !staff.iter().any(|s| s.id == id) {
                    return self.reprompt(session, MSG_NOT_UNDERSTOOD).await;
                }
                session.draft.staff = Some(StaffChoice::Specific { staff_id: id });
                self.enter_date_selection(session, now, None).await
            }
            Input::Act(Action::AnyStaff) => {
                session.draft.staff = Some(StaffChoice::Any);
                self.enter_date_selection(session, now, None).await
            }
            Input::Act(Action::Back) => {
                session.draft.staff = None;
                let category_id = session.draft.category_id;
                self.enter_service_selection(session, category_id).await
            }
            _ => self.reprompt(session, MSG_NOT_UNDERSTOOD).await,
        }
    }

    // ---- date and time selection --------------------------------------

    async fn enter_date_selection(
        &self,
        session: &mut Session,
        now: NaiveDateTime,
        lead: Option<&str>,
    ) -> Result<Reply, StepError> {
        let settings = self
            .settings
            .booking_settings(session.tenant_id)
            .await
            .map_err(upstream)?;
        let dates = match upcoming_dates(&settings, now.date(), self.config.date_menu_limit) {
            Ok(dates) => dates,
            Err(AvailabilityError::InvalidSettings { .. }) => {
                session.reset();
                return Ok(Reply::text(MSG_UNAVAILABLE));
            }
            Err(e) => return Err(upstream(e)),
        };
        if dates.is_empty() {
            session.reset();
            return Ok(Reply::text(MSG_UNAVAILABLE));
        }

        session.draft.date = None;
        session.draft.time = None;
        session.state = DialogueState::SelectingDate {
            offered: dates.clone(),
        };
        let mut reply = match lead {
            Some(lead) => Reply::text(lead),
            None => Reply::empty(),
        };
        reply = reply.with_menu("Pick a date", date_options(&dates));
        Ok(reply)
    }

    async fn on_selecting_date(
        &self,
        session: &mut Session,
        offered: &[NaiveDate],
        input: Input,
        now: NaiveDateTime,
    ) -> Result<Reply, StepError> {
        match input {
            // Offered dates are a closed set; only an exact match advances.
            Input::Act(Action::SelectDate(date)) if offered.contains(&date) => {
                let starts = self.compute_times(session, date, now).await?;
                if starts.is_empty() {
                    return Ok(Reply::text(format!(
                        "No times are available on {}. Pick another date.",
                        date_label(date)
                    ))
                    .with_menu("Pick a date", date_options(offered)));
                }
                session.draft.date = Some(date);
                session.state = DialogueState::SelectingTime {
                    offered: starts.clone(),
                };
                Ok(Reply::empty().with_menu("Pick a time", time_options(&starts)))
            }
            Input::Act(Action::Back) => {
                let Some(service_id) = session.draft.service_id else {
                    return Ok(self.restart(session));
                };
                let service = self
                    .catalog
                    .get_service(session.tenant_id, service_id)
                    .await
                    .map_err(upstream)?;
                let settings = self
                    .settings
                    .booking_settings(session.tenant_id)
                    .await
                    .map_err(upstream)?;
                if settings.offer_staff_choice && service.requires_staff {
                    let staff = self
                        .staffing
                        .list_staff_for_service(session.tenant_id, service_id)
                        .await
                        .map_err(upstream)?;
                    session.draft.staff = None;
                    session.state = DialogueState::SelectingStaff;
                    Ok(Reply::empty().with_menu("Who would you like?", staff_options(&staff)))
                } else {
                    let category_id = session.draft.category_id;
                    self.enter_service_selection(session, category_id).await
                }
            }
            _ => self.reprompt(session, MSG_NOT_UNDERSTOOD).await,
        }
    }

    /// Computes offerable start times for the drafted service/staff on one
    /// date, truncated to the menu limit.
    async fn compute_times(
        &self,
        session: &Session,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<NaiveTime>, StepError> {
        let tenant_id = session.tenant_id;
        let Some(service_id) = session.draft.service_id else {
            return Ok(Vec::new());
        };
        let service = self
            .catalog
            .get_service(tenant_id, service_id)
            .await
            .map_err(upstream)?;
        let settings = self
            .settings
            .booking_settings(tenant_id)
            .await
            .map_err(upstream)?;
        let leaves = self
            .staffing
            .list_leaves_on(tenant_id, date)
            .await
            .map_err(upstream)?;

        let slots = match session.draft.staff {
            Some(StaffChoice::Specific { staff_id }) => {
                let staff = self
                    .staffing
                    .get_staff(tenant_id, staff_id)
                    .await
                    .map_err(upstream)?;
                let booked = self.booked_windows(tenant_id, staff_id, date).await?;
                slots_for_staff(&service, &staff, date, &settings, &leaves, &booked, now)
                    .map_err(upstream)?
            }
            _ => {
                let staff = self
                    .staffing
                    .list_staff_for_service(tenant_id, service_id)
                    .await
                    .map_err(upstream)?;
                self.any_staff_slots(&service, &staff, date, &settings, &leaves, now)
                    .await?
            }
        };

        let mut starts: Vec<_> = slots.iter().map(|slot| slot.start).collect();
        starts.truncate(self.config.time_menu_limit);
        Ok(starts)
    }

    /// Union availability across every qualified staff member; per-staff
    /// booking lookups run concurrently.
    async fn any_staff_slots(
        &self,
        service: &ServiceItem,
        staff: &[Staff],
        date: NaiveDate,
        settings: &bookline_availability::BookingSettings,
        leaves: &[Leave],
        now: NaiveDateTime,
    ) -> Result<Vec<TimeWindow>, StepError> {
        let lookups = staff
            .iter()
            .map(|s| self.booked_windows(service.tenant_id, s.id, date));
        let booked: Vec<Vec<TimeWindow>> = future::try_join_all(lookups).await?;

        let staff_days: Vec<StaffDay<'_>> = staff
            .iter()
            .zip(booked.iter())
            .map(|(staff, booked)| StaffDay {
                staff,
                leaves,
                booked,
            })
            .collect();
        slots_for_any_staff(service, date, settings, &staff_days, now).map_err(upstream)
    }

    async fn booked_windows(
        &self,
        tenant_id: TenantId,
        staff_id: bookline_core::StaffId,
        date: NaiveDate,
    ) -> Result<Vec<TimeWindow>, StepError> {
        let bookings = self
            .ledger
            .find_active_bookings(tenant_id, staff_id, date)
            .await
            .map_err(upstream)?;
        Ok(bookings.iter().map(Booking::window).collect())
    }

    async fn on_selecting_time(
        &self,
        session: &mut Session,
        offered: &[NaiveTime],
        input: Input,
        now: NaiveDateTime,
    ) -> Result<Reply, StepError> {
        match input {
            Input::Act(Action::SelectTime(time)) if offered.contains(&time) => {
                session.draft.time = Some(time);
                session.state = DialogueState::InputtingNote;
                Ok(Reply::text("Anything we should know? Type a note, or skip.")
                    .with_menu("Note", vec![MenuOption::new(&Action::SkipNote, "Skip")]))
            }
            Input::Act(Action::Back) => self.enter_date_selection(session, now, None).await,
            _ => self.reprompt(session, MSG_NOT_UNDERSTOOD).await,
        }
    }

    // ---- note and confirmation ----------------------------------------

    async fn on_inputting_note(
        &self,
        session: &mut Session,
        input: Input,
    ) -> Result<Reply, StepError> {
        match input {
            Input::Text(text) => {
                let note = text.trim();
                session.draft.note = (!note.is_empty()).then(|| note.to_string());
                self.enter_confirmation(session).await
            }
            Input::Act(Action::SkipNote) => {
                session.draft.note = None;
                self.enter_confirmation(session).await
            }
            _ => self.reprompt(session, MSG_NOT_UNDERSTOOD).await,
        }
    }

    async fn enter_confirmation(&self, session: &mut Session) -> Result<Reply, StepError> {
        let (Some(service_id), Some(staff), Some(date), Some(time)) = (
            session.draft.service_id,
            session.draft.staff,
            session.draft.date,
            session.draft.time,
        ) else {
            return Ok(self.restart(session));
        };

        let service = self
            .catalog
            .get_service(session.tenant_id, service_id)
            .await
            .map_err(upstream)?;
        let staff_line = match staff {
            StaffChoice::Specific { staff_id } => {
                let staff = self
                    .staffing
                    .get_staff(session.tenant_id, staff_id)
                    .await
                    .map_err(upstream)?;
                staff.name
            }
            StaffChoice::Any => "Anyone available".to_string(),
        };

        let mut summary = format!(
            "{} with {} on {} at {}.",
            service.name,
            staff_line,
            date_label(date),
            time.format("%H:%M"),
        );
        if let Some(note) = &session.draft.note {
            summary.push_str(&format!(" Note: {note}"));
        }

        session.state = DialogueState::ConfirmingBooking;
        Ok(Reply::text(summary).with_menu("Confirm this booking?", confirm_options()))
    }

    async fn on_confirming_booking(
        &self,
        session: &mut Session,
        input: Input,
        now: NaiveDateTime,
    ) -> Result<Reply, StepError> {
        match input {
            Input::Act(Action::Confirm) => {
                let (Some(service_id), Some(staff), Some(date), Some(time)) = (
                    session.draft.service_id,
                    session.draft.staff,
                    session.draft.date,
                    session.draft.time,
                ) else {
                    return Ok(self.restart(session));
                };
                let request = BookingRequest {
                    tenant_id: session.tenant_id,
                    customer: session.user_id.clone(),
                    service_id,
                    staff_id: match staff {
                        StaffChoice::Specific { staff_id } => Some(staff_id),
                        StaffChoice::Any => None,
                    },
                    date,
                    start: time,
                    note: session.draft.note.clone(),
                    source: BookingSource::ChatBot,
                };

                match self.commit.commit_booking(request, now).await {
                    Ok(booking) => {
                        session.reset();
                        Ok(Reply::text(format!(
                            "You're booked for {} at {}. Your cancellation code is {}.",
                            date_label(booking.date),
                            booking.start.format("%H:%M"),
                            booking.cancel_token,
                        )))
                    }
                    Err(e) if e.is_conflict() => {
                        // The slot was consumed while the user dawdled.
                        // Drop the stale time, keep the rest of the draft,
                        // and re-offer fresh availability.
                        session.draft.time = None;
                        let starts = self.compute_times(session, date, now).await?;
                        if starts.is_empty() {
                            return self
                                .enter_date_selection(
                                    session,
                                    now,
                                    Some(
                                        "That time was just taken and the day has filled up. \
                                         Pick another date.",
                                    ),
                                )
                                .await;
                        }
                        session.state = DialogueState::SelectingTime {
                            offered: starts.clone(),
                        };
                        Ok(Reply::text("That time was just taken. Here's what's still open.")
                            .with_menu("Pick a time", time_options(&starts)))
                    }
                    Err(
                        CommitError::ServiceUnavailable { .. } | CommitError::Invalid { .. },
                    ) => {
                        session.reset();
                        Ok(Reply::text(MSG_UNAVAILABLE))
                    }
                    Err(e) => Err(upstream(e)),
                }
            }
            Input::Act(Action::Decline) => {
                session.reset();
                Ok(Reply::text("No problem, nothing was booked.")
                    .with_menu("What can I do for you?", self.main_menu()))
            }
            _ => self.reprompt(session, MSG_NOT_UNDERSTOOD).await,
        }
    }

    // ---- product flow -------------------------------------------------

    async fn enter_products(&self, session: &mut Session) -> Result<Reply, StepError> {
        let products = self
            .catalog
            .list_products(session.tenant_id)
            .await
            .map_err(upstream)?;
        if products.is_empty() {
            return Ok(Reply::text("We have no products for sale right now."));
        }
        session.state = DialogueState::BrowsingProducts;
        Ok(Reply::empty().with_menu("Our products", product_options(&products)))
    }

    async fn on_browsing_products(
        &self,
        session: &mut Session,
        input: Input,
    ) -> Result<Reply, StepError> {
        match input {
            Input::Act(Action::ViewProduct(id)) => {
                let product = match self.catalog.get_product(session.tenant_id, id).await {
                    Ok(product) if product.active => product,
                    Ok(_) => return self.reprompt(session, MSG_NOT_UNDERSTOOD).await,
                    Err(bookline_catalog::CatalogError::ProductNotFound { .. }) => {
                        return self.reprompt(session, MSG_NOT_UNDERSTOOD).await;
                    }
                    Err(e) => return Err(upstream(e)),
                };
                session.state = DialogueState::ViewingProductDetail { product_id: id };
                let mut card = format!("{} — {}", product.name, price_label(product.price));
                if let Some(description) = &product.description {
                    card.push_str(&format!("\n{description}"));
                }
                Ok(Reply::text(card).with_menu(
                    product.name,
                    vec![
                        MenuOption::new(&Action::Buy(id), "Buy"),
                        MenuOption::new(&Action::Back, "Back"),
                    ],
                ))
            }
            Input::Act(Action::Back) => {
                session.state = DialogueState::Idle;
                Ok(self.main_menu_reply("What can I do for you?"))
            }
            _ => self.reprompt(session, MSG_NOT_UNDERSTOOD).await,
        }
    }

    async fn on_viewing_product_detail(
        &self,
        session: &mut Session,
        product_id: ProductId,
        input: Input,
    ) -> Result<Reply, StepError> {
        match input {
            Input::Act(Action::Buy(id)) if id == product_id => {
                let product = self
                    .catalog
                    .get_product(session.tenant_id, product_id)
                    .await
                    .map_err(upstream)?;
                if !product.has_stock(1) {
                    session.state = DialogueState::BrowsingProducts;
                    let products = self
                        .catalog
                        .list_products(session.tenant_id)
                        .await
                        .map_err(upstream)?;
                    return Ok(Reply::text("Sorry, that product is out of stock.")
                        .with_menu("Our products", product_options(&products)));
                }
                session.state = DialogueState::SelectingQuantity { product_id };
                Ok(Reply::empty().with_menu(
                    "How many?",
                    quantity_options(self.config.max_order_quantity, product.stock),
                ))
            }
            Input::Act(Action::Back) => self.enter_products(session).await,
            _ => self.reprompt(session, MSG_NOT_UNDERSTOOD).await,
        }
    }

    async fn on_selecting_quantity(
        &self,
        session: &mut Session,
        product_id: ProductId,
        input: Input,
    ) -> Result<Reply, StepError> {
        match input {
            Input::Act(Action::SelectQuantity(quantity))
                if (1..=self.config.max_order_quantity).contains(&quantity) =>
            {
                let product = self
                    .catalog
                    .get_product(session.tenant_id, product_id)
                    .await
                    .map_err(upstream)?;
                session.state = DialogueState::ConfirmingPurchase {
                    product_id,
                    quantity,
                };
                let total = product.price * i64::from(quantity);
                Ok(Reply::text(format!(
                    "{} × {} — total {}.",
                    product.name,
                    quantity,
                    price_label(total),
                ))
                .with_menu("Confirm this order?", confirm_options()))
            }
            Input::Act(Action::Back) => {
                session.state = DialogueState::ViewingProductDetail { product_id };
                self.reprompt(session, "Back to the product.").await
            }
            _ => self.reprompt(session, MSG_NOT_UNDERSTOOD).await,
        }
    }

    async fn on_confirming_purchase(
        &self,
        session: &mut Session,
        product_id: ProductId,
        quantity: u32,
        input: Input,
    ) -> Result<Reply, StepError> {
        match input {
            Input::Act(Action::Confirm) => {
                let product = self
                    .catalog
                    .get_product(session.tenant_id, product_id)
                    .await
                    .map_err(upstream)?;
                let request = OrderRequest {
                    tenant_id: session.tenant_id,
                    customer: session.user_id.clone(),
                    product_id,
                    quantity,
                    unit_price: product.price,
                };
                match self.commit.commit_order(request).await {
                    Ok(order) => {
                        session.reset();
                        Ok(Reply::text(format!(
                            "Order received! {} × {} — total {}. We'll be in touch about payment.",
                            product.name,
                            order.quantity,
                            price_label(order.total()),
                        )))
                    }
                    Err(CommitError::OutOfStock { .. }) => {
                        session.state = DialogueState::SelectingQuantity { product_id };
                        Ok(Reply::text("Sorry, there isn't enough stock left for that.")
                            .with_menu(
                                "How many?",
                                quantity_options(self.config.max_order_quantity, product.stock),
                            ))
                    }
                    Err(CommitError::Invalid { .. }) => {
                        session.reset();
                        Ok(Reply::text("Sorry, that product can't be ordered right now."))
                    }
                    Err(e) => Err(upstream(e)),
                }
            }
            Input::Act(Action::Decline) => {
                session.reset();
                Ok(Reply::text("No problem, nothing was ordered.")
                    .with_menu("What can I do for you?", self.main_menu()))
            }
            _ => self.reprompt(session, MSG_NOT_UNDERSTOOD).await,
        }
    }

    // ---- coupons ------------------------------------------------------

    async fn enter_coupons(
        &self,
        session: &mut Session,
        now: NaiveDateTime,
    ) -> Result<Reply, StepError> {
        let coupons = self
            .catalog
            .list_coupons(session.tenant_id)
            .await
            .map_err(upstream)?;
        let today = now.date();
        let current: Vec<_> = coupons.iter().filter(|c| c.is_valid_on(today)).collect();
        if current.is_empty() {
            return Ok(Reply::text("No coupons are running right now."));
        }

        let mut text = String::from("Current coupons:");
        for coupon in &current {
            text.push_str(&format!(
                "\n• {} (until {})",
                coupon.title,
                date_label(coupon.valid_until)
            ));
            if let Some(description) = &coupon.description {
                text.push_str(&format!(" — {description}"));
            }
        }
        session.state = DialogueState::BrowsingCoupons;
        Ok(Reply::text(text).with_menu("Coupons", vec![MenuOption::new(&Action::Back, "Back")]))
    }

    async fn on_browsing_coupons(
        &self,
        session: &mut Session,
        input: Input,
    ) -> Result<Reply, StepError> {
        match input {
            Input::Act(Action::Back) => {
                session.state = DialogueState::Idle;
                Ok(self.main_menu_reply("What can I do for you?"))
            }
            _ => self.reprompt(session, MSG_NOT_UNDERSTOOD).await,
        }
    }

    // ---- viewing and cancelling bookings ------------------------------

    async fn enter_bookings(
        &self,
        session: &mut Session,
        now: NaiveDateTime,
    ) -> Result<Reply, StepError> {
        let bookings = self
            .ledger
            .find_upcoming_for_customer(session.tenant_id, &session.user_id, now.date())
            .await
            .map_err(upstream)?;
        if bookings.is_empty() {
            return Ok(Reply::text("You have no upcoming bookings."));
        }

        session.state = DialogueState::ViewingBookings {
            offered: bookings.iter().map(|b| b.id).collect(),
        };
        Ok(Reply::empty().with_menu("Your bookings — tap one to cancel", booking_options(&bookings)))
    }

    async fn on_viewing_bookings(
        &self,
        session: &mut Session,
        offered: &[BookingId],
        input: Input,
    ) -> Result<Reply, StepError> {
        match input {
            Input::Act(Action::CancelBooking(id)) if offered.contains(&id) => {
                let booking = self
                    .ledger
                    .find_booking(session.tenant_id, id)
                    .await
                    .map_err(upstream)?;
                let Some(booking) = booking.filter(Booking::is_active) else {
                    session.state = DialogueState::Idle;
                    return Ok(Reply::text("That booking is no longer active."));
                };
                session.state = DialogueState::ConfirmingCancelBooking { booking_id: id };
                Ok(Reply::text(format!(
                    "Cancel your booking on {} at {}?",
                    date_label(booking.date),
                    booking.start.format("%H:%M"),
                ))
                .with_menu("Cancel this booking?", confirm_options()))
            }
            Input::Act(Action::Back) => {
                session.state = DialogueState::Idle;
                Ok(self.main_menu_reply("What can I do for you?"))
            }
            _ => self.reprompt(session, MSG_NOT_UNDERSTOOD).await,
        }
    }

    async fn on_confirming_cancel_booking(
        &self,
        session: &mut Session,
        booking_id: BookingId,
        input: Input,
    ) -> Result<Reply, StepError> {
        match input {
            Input::Act(Action::Confirm) => {
                let booking = self
                    .ledger
                    .find_booking(session.tenant_id, booking_id)
                    .await
                    .map_err(upstream)?;
                let Some(booking) = booking else {
                    session.state = DialogueState::Idle;
                    return Ok(Reply::text("That booking is no longer active."));
                };
                match self
                    .commit
                    .cancel_booking(session.tenant_id, booking.cancel_token)
                    .await
                {
                    Ok(_) => {
                        session.reset();
                        Ok(Reply::text("Your booking has been cancelled."))
                    }
                    Err(CommitError::BookingNotFound { .. }) => {
                        session.state = DialogueState::Idle;
                        Ok(Reply::text("That booking is no longer active."))
                    }
                    Err(e) => Err(upstream(e)),
                }
            }
            Input::Act(Action::Decline) => {
                session.state = DialogueState::Idle;
                Ok(Reply::text("Your booking is unchanged.")
                    .with_menu("What can I do for you?", self.main_menu()))
            }
            _ => self.reprompt(session, MSG_NOT_UNDERSTOOD).await,
        }
    }

    // ---- shared menus and re-prompts ----------------------------------

    fn main_menu(&self) -> Vec<MenuOption> {
        vec![
            MenuOption::new(&Action::StartBooking, "Book an appointment"),
            MenuOption::new(&Action::ViewBookings, "My bookings"),
            MenuOption::new(&Action::BrowseProducts, "Products"),
            MenuOption::new(&Action::BrowseCoupons, "Coupons"),
        ]
    }

    fn main_menu_reply(&self, lead: &str) -> Reply {
        Reply::empty().with_menu(lead, self.main_menu())
    }

    fn restart(&self, session: &mut Session) -> Reply {
        session.reset();
        Reply::text(MSG_RESTART).with_menu("What can I do for you?", self.main_menu())
    }

    /// Re-shows the current state's options after input outside its
    /// alphabet. The state and draft are untouched.
    async fn reprompt(&self, session: &Session, lead: &str) -> Result<Reply, StepError> {
        let mut reply = Reply::text(lead);
        let menu = self.state_menu(session).await?;
        reply.messages.extend(menu.messages);
        Ok(reply)
    }

    /// Rebuilds the menu for the session's current state.
    async fn state_menu(&self, session: &Session) -> Result<Reply, StepError> {
        let tenant_id = session.tenant_id;
        let reply = match &session.state {
            DialogueState::Idle => self.main_menu_reply("What can I do for you?"),
            DialogueState::SelectingCategory => {
                let categories = self
                    .catalog
                    .list_categories(tenant_id)
                    .await
                    .map_err(upstream)?;
                let options = categories
                    .iter()
                    .map(|c| MenuOption::new(&Action::SelectCategory(c.id), &c.name))
                    .collect();
                Reply::empty().with_menu("Which category?", options)
            }
            DialogueState::SelectingService => {
                let services = self
                    .catalog
                    .list_services(tenant_id, session.draft.category_id)
                    .await
                    .map_err(upstream)?;
                Reply::empty().with_menu("Which service?", service_options(&services))
            }
            DialogueState::SelectingStaff => {
                let Some(service_id) = session.draft.service_id else {
                    return Ok(Reply::empty());
                };
                let staff = self
                    .staffing
                    .list_staff_for_service(tenant_id, service_id)
                    .await
                    .map_err(upstream)?;
                Reply::empty().with_menu("Who would you like?", staff_options(&staff))
            }
            DialogueState::SelectingDate { offered } => {
                Reply::empty().with_menu("Pick a date", date_options(offered))
            }
            DialogueState::SelectingTime { offered } => {
                Reply::empty().with_menu("Pick a time", time_options(offered))
            }
            DialogueState::InputtingNote => Reply::empty().with_menu(
                "Type a note, or skip",
                vec![MenuOption::new(&Action::SkipNote, "Skip")],
            ),
            DialogueState::ConfirmingBooking => {
                Reply::empty().with_menu("Confirm this booking?", confirm_options())
            }
            DialogueState::BrowsingProducts => {
                let products = self
                    .catalog
                    .list_products(tenant_id)
                    .await
                    .map_err(upstream)?;
                Reply::empty().with_menu("Our products", product_options(&products))
            }
            DialogueState::ViewingProductDetail { product_id } => Reply::empty().with_menu(
                "This product",
                vec![
                    MenuOption::new(&Action::Buy(*product_id), "Buy"),
                    MenuOption::new(&Action::Back, "Back"),
                ],
            ),
            DialogueState::SelectingQuantity { product_id } => {
                let product = self
                    .catalog
                    .get_product(tenant_id, *product_id)
                    .await
                    .map_err(upstream)?;
                Reply::empty().with_menu(
                    "How many?",
                    quantity_options(self.config.max_order_quantity, product.stock),
                )
            }
            DialogueState::ConfirmingPurchase { .. } => {
                Reply::empty().with_menu("Confirm this order?", confirm_options())
            }
            DialogueState::BrowsingCoupons => Reply::empty()
                .with_menu("Coupons", vec![MenuOption::new(&Action::Back, "Back")]),
            DialogueState::ViewingBookings { offered } => {
                let mut bookings = Vec::new();
                for id in offered {
                    if let Some(booking) = self
                        .ledger
                        .find_booking(tenant_id, *id)
                        .await
                        .map_err(upstream)?
                    {
                        bookings.push(booking);
                    }
                }
                Reply::empty()
                    .with_menu("Your bookings — tap one to cancel", booking_options(&bookings))
            }
            DialogueState::ConfirmingCancelBooking { .. } => {
                Reply::empty().with_menu("Cancel this booking?", confirm_options())
            }
        };
        Ok(reply)
    }
}

// ---- option builders and labels ---------------------------------------

fn service_options(services: &[ServiceItem]) -> Vec<MenuOption> {
    services
        .iter()
        .map(|s| {
            MenuOption::new(
                &Action::SelectService(s.id),
                format!("{} ({} min)", s.name, s.duration_minutes),
            )
        })
        .collect()
}

fn staff_options(staff: &[Staff]) -> Vec<MenuOption> {
    let mut options: Vec<_> = staff
        .iter()
        .map(|s| MenuOption::new(&Action::SelectStaff(s.id), &s.name))
        .collect();
    options.push(MenuOption::new(&Action::AnyStaff, "Anyone is fine"));
    options
}

fn date_options(dates: &[NaiveDate]) -> Vec<MenuOption> {
    dates
        .iter()
        .map(|d| MenuOption::new(&Action::SelectDate(*d), date_label(*d)))
        .collect()
}

fn time_options(times: &[NaiveTime]) -> Vec<MenuOption> {
    times
        .iter()
        .map(|t| MenuOption::new(&Action::SelectTime(*t), t.format("%H:%M").to_string()))
        .collect()
}

fn product_options(products: &[Product]) -> Vec<MenuOption> {
    products
        .iter()
        .map(|p| {
            MenuOption::new(
                &Action::ViewProduct(p.id),
                format!("{} — {}", p.name, price_label(p.price)),
            )
        })
        .collect()
}

fn booking_options(bookings: &[Booking]) -> Vec<MenuOption> {
    bookings
        .iter()
        .map(|b| {
            MenuOption::new(
                &Action::CancelBooking(b.id),
                format!("{} {}", date_label(b.date), b.start.format("%H:%M")),
            )
        })
        .collect()
}

fn quantity_options(limit: u32, stock: u32) -> Vec<MenuOption> {
    (1..=limit.min(stock).max(1))
        .map(|n| MenuOption::new(&Action::SelectQuantity(n), n.to_string()))
        .collect()
}

fn confirm_options() -> Vec<MenuOption> {
    vec![
        MenuOption::new(&Action::Confirm, "Yes"),
        MenuOption::new(&Action::Decline, "No"),
    ]
}

fn date_label(date: NaiveDate) -> String {
    date.format("%a, %b %-d").to_string()
}

fn price_label(minor_units: i64) -> String {
    format!("¥{minor_units}")
}
