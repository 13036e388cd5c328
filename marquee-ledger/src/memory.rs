use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_core::repository::{
    EventFilter, EventPage, EventPatch, NewEvent, OrganizerStats, Refund, ReminderTarget,
    Reservation, ReserveRequest,
};
use marquee_core::{
    Actor, BookingLedger, EventRepository, LedgerError, LedgerResult, ReminderRepository,
    UserRepository,
};
use marquee_shared::{
    Booking, BookingDetails, BookingStatus, Event, EventListing, EventStatus, Masked, User,
};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::policy;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    events: HashMap<Uuid, Event>,
    bookings: Vec<Booking>,
}

impl State {
    fn confirmed_tickets(&self, event_id: Uuid) -> i64 {
        self.bookings
            .iter()
            .filter(|b| b.event_id == event_id && b.is_confirmed())
            .map(|b| i64::from(b.tickets_booked))
            .sum()
    }

    fn listing(&self, event: &Event) -> EventListing {
        let organizer_name = self.users.get(&event.organizer_id).map(|u| u.name.clone());
        EventListing::new(event.clone(), organizer_name, self.confirmed_tickets(event.id))
    }

    fn details(&self, booking: &Booking) -> LedgerResult<BookingDetails> {
        let event = self
            .events
            .get(&booking.event_id)
            .ok_or(LedgerError::NotFound("Event"))?;
        let attendee = self.users.get(&booking.attendee_id);
        Ok(BookingDetails {
            booking: booking.clone(),
            event_name: event.name.clone(),
            venue: event.venue.clone(),
            event_date: event.date_time,
            organizer_id: event.organizer_id,
            attendee_name: attendee.map(|u| u.name.clone()),
            attendee_email: attendee.map(|u| Masked(u.email.clone())),
        })
    }

    fn details_newest_first<'a, I>(&self, bookings: I) -> LedgerResult<Vec<BookingDetails>>
    where
        I: Iterator<Item = &'a Booking>,
    {
        let mut rows = bookings
            .map(|b| self.details(b))
            .collect::<LedgerResult<Vec<_>>>()?;
        rows.sort_by(|a, b| b.booking.booking_time.cmp(&a.booking.booking_time));
        Ok(rows)
    }
}

/// Process-local store implementing every repository trait. A single async
/// mutex serializes writers the way the event row lock does in Postgres.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingLedger for MemoryStore {
    async fn reserve(&self, request: ReserveRequest, now: DateTime<Utc>) -> LedgerResult<Reservation> {
        policy::validate_ticket_count(request.tickets)?;

        let mut state = self.state.lock().await;

        let event = state
            .events
            .get(&request.event_id)
            .cloned()
            .ok_or(LedgerError::NotFound("Event"))?;
        if !state.users.contains_key(&request.attendee_id) {
            return Err(LedgerError::NotFound("User"));
        }

        policy::check_bookable(&event, now)?;
        let already_booked = state.confirmed_tickets(event.id);
        policy::check_capacity(event.capacity, already_booked, request.tickets)?;

        let booking_id = Uuid::new_v4();
        let booking = Booking {
            id: booking_id,
            event_id: event.id,
            attendee_id: request.attendee_id,
            tickets_booked: request.tickets,
            total_price: policy::total_price(event.ticket_price, request.tickets),
            status: BookingStatus::Confirmed,
            ticket_code: policy::ticket_code(booking_id, event.id, now),
            reminder_sent: false,
            booking_time: now,
        };
        state.bookings.push(booking.clone());

        info!(booking_id = %booking.id, event_id = %event.id, tickets = request.tickets, "Booking confirmed");

        Ok(Reservation {
            booking,
            event_name: event.name,
            event_date: event.date_time,
            venue: event.venue,
        })
    }

    async fn cancel(&self, booking_id: Uuid, actor: &Actor, now: DateTime<Utc>) -> LedgerResult<Refund> {
        let mut state = self.state.lock().await;

        let index = state
            .bookings
            .iter()
            .position(|b| b.id == booking_id)
            .ok_or(LedgerError::NotFound("Booking"))?;
        let details = state.details(&state.bookings[index])?;

        policy::authorize_cancel(
            actor,
            &details.booking,
            details.organizer_id,
            details.event_date,
            now,
        )?;
        policy::mark_cancelled(&mut state.bookings[index])?;

        info!(booking_id = %booking_id, actor = %actor.user_id, "Booking cancelled");

        Ok(Refund {
            booking_id,
            amount: details.booking.total_price,
            note: policy::REFUND_NOTE.to_string(),
            booking: details,
        })
    }

    async fn get_booking(&self, booking_id: Uuid) -> LedgerResult<Option<BookingDetails>> {
        let state = self.state.lock().await;
        state
            .bookings
            .iter()
            .find(|b| b.id == booking_id)
            .map(|b| state.details(b))
            .transpose()
    }

    async fn bookings_for_attendee(&self, attendee_id: Uuid) -> LedgerResult<Vec<BookingDetails>> {
        let state = self.state.lock().await;
        state.details_newest_first(state.bookings.iter().filter(|b| b.attendee_id == attendee_id))
    }

    async fn event_attendees(&self, event_id: Uuid) -> LedgerResult<Vec<BookingDetails>> {
        let state = self.state.lock().await;
        state.details_newest_first(
            state
                .bookings
                .iter()
                .filter(|b| b.event_id == event_id && b.is_confirmed()),
        )
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn create_event(&self, organizer_id: Uuid, draft: &NewEvent) -> LedgerResult<Event> {
        let event = Event {
            id: Uuid::new_v4(),
            organizer_id,
            name: draft.name.clone(),
            description: draft.description.clone(),
            venue: draft.venue.clone(),
            date_time: draft.date_time,
            category: draft.category,
            capacity: draft.capacity,
            ticket_price: draft.ticket_price,
            image_url: draft.image_url.clone(),
            status: EventStatus::Active,
            created_at: Utc::now(),
        };
        self.state.lock().await.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: Uuid) -> LedgerResult<Option<EventListing>> {
        let state = self.state.lock().await;
        Ok(state.events.get(&id).map(|e| state.listing(e)))
    }

    async fn list_events(&self, filter: &EventFilter, now: DateTime<Utc>) -> LedgerResult<EventPage> {
        let state = self.state.lock().await;
        let mut events: Vec<&Event> = state
            .events
            .values()
            .filter(|e| e.status == EventStatus::Active && e.date_time > now)
            .filter(|e| filter.matches(e))
            .collect();
        events.sort_by_key(|e| e.date_time);

        let total = events.len() as i64;
        let page: Vec<EventListing> = match filter.pagination() {
            Some((page, limit)) => events
                .into_iter()
                .skip((page as usize - 1).saturating_mul(limit as usize))
                .take(limit as usize)
                .map(|e| state.listing(e))
                .collect(),
            None => events.into_iter().map(|e| state.listing(e)).collect(),
        };

        Ok(EventPage { events: page, total })
    }

    async fn events_by_organizer(&self, organizer_id: Uuid) -> LedgerResult<Vec<EventListing>> {
        let state = self.state.lock().await;
        let mut events: Vec<&Event> = state
            .events
            .values()
            .filter(|e| e.organizer_id == organizer_id)
            .collect();
        events.sort_by(|a, b| b.date_time.cmp(&a.date_time));
        Ok(events.into_iter().map(|e| state.listing(e)).collect())
    }

    async fn update_event(&self, id: Uuid, patch: &EventPatch) -> LedgerResult<Event> {
        let mut state = self.state.lock().await;
        let event = state.events.get_mut(&id).ok_or(LedgerError::NotFound("Event"))?;
        patch.apply(event);
        Ok(event.clone())
    }

    async fn cancel_event(&self, id: Uuid) -> LedgerResult<u64> {
        let mut state = self.state.lock().await;
        let event = state.events.get_mut(&id).ok_or(LedgerError::NotFound("Event"))?;
        event.status = EventStatus::Cancelled;

        let mut cancelled = 0;
        for booking in state
            .bookings
            .iter_mut()
            .filter(|b| b.event_id == id && b.is_confirmed())
        {
            booking.status = BookingStatus::Cancelled;
            cancelled += 1;
        }

        info!(event_id = %id, bookings = cancelled, "Event cancelled");
        Ok(cancelled)
    }

    async fn organizer_stats(&self, organizer_id: Uuid, now: DateTime<Utc>) -> LedgerResult<OrganizerStats> {
        let state = self.state.lock().await;
        let mut stats = OrganizerStats::default();

        for event in state.events.values().filter(|e| e.organizer_id == organizer_id) {
            stats.total_events += 1;
            if event.status == EventStatus::Active && event.date_time > now {
                stats.active_events += 1;
            }
            for booking in state
                .bookings
                .iter()
                .filter(|b| b.event_id == event.id && b.is_confirmed())
            {
                stats.total_attendees += i64::from(booking.tickets_booked);
                stats.total_revenue += booking.total_price;
                stats.total_bookings += 1;
            }
        }

        Ok(stats)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn ensure_user(&self, user: &User) -> LedgerResult<()> {
        let mut state = self.state.lock().await;
        let email_taken = state.users.values().any(|u| u.email == user.email);
        if !state.users.contains_key(&user.id) && !email_taken {
            state.users.insert(user.id, user.clone());
        }
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> LedgerResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn update_profile(&self, id: Uuid, name: &str, email: &str) -> LedgerResult<User> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == email && u.id != id) {
            return Err(LedgerError::Conflict("Email is already taken".to_string()));
        }
        let user = state.users.get_mut(&id).ok_or(LedgerError::NotFound("User"))?;
        user.name = name.to_string();
        user.email = email.to_string();
        Ok(user.clone())
    }
}

#[async_trait]
impl ReminderRepository for MemoryStore {
    async fn due_reminders(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> LedgerResult<Vec<ReminderTarget>> {
        let state = self.state.lock().await;
        let mut targets = Vec::new();

        for booking in state.bookings.iter().filter(|b| b.is_confirmed() && !b.reminder_sent) {
            let (Some(event), Some(user)) = (
                state.events.get(&booking.event_id),
                state.users.get(&booking.attendee_id),
            ) else {
                continue;
            };
            if event.status != EventStatus::Active || event.date_time < from || event.date_time >= to {
                continue;
            }
            targets.push(ReminderTarget {
                booking_id: booking.id,
                attendee_name: user.name.clone(),
                attendee_email: user.email.clone(),
                event_name: event.name.clone(),
                event_date: event.date_time,
                venue: event.venue.clone(),
                tickets_booked: booking.tickets_booked,
            });
        }

        Ok(targets)
    }

    async fn mark_reminder_sent(&self, booking_id: Uuid) -> LedgerResult<()> {
        let mut state = self.state.lock().await;
        let booking = state
            .bookings
            .iter_mut()
            .find(|b| b.id == booking_id)
            .ok_or(LedgerError::NotFound("Booking"))?;
        booking.reminder_sent = true;
        Ok(())
    }
}

impl MemoryStore {
    /// Tickets held by confirmed bookings of one event.
    pub async fn confirmed_tickets(&self, event_id: Uuid) -> i64 {
        self.state.lock().await.confirmed_tickets(event_id)
    }
}
