//! Command dispatch

use chrono::{DateTime, Local};
use lotkeeper_api::{
    ClientInfo, Command, ErrorInfo, Event, EventPayload, HealthStatus, Response, ResponsePayload,
};
use lotkeeper_config::{RawLotLayout, validate_layout};
use lotkeeper_core::{CoreEvent, LotEngine};
use lotkeeper_util::{LotError, Result};
use tracing::{debug, error, warn};

/// Upper bound on `recent_records` page size
pub const MAX_RECORDS_PER_REQUEST: usize = 500;

/// Run one command against the engine on behalf of `client`
pub fn handle_command(
    engine: &mut LotEngine,
    client: &ClientInfo,
    request_id: u64,
    command: Command,
    now: DateTime<Local>,
) -> Response {
    match execute(engine, client, command, now) {
        Ok(payload) => Response::success(request_id, payload),
        Err(e) => {
            if e.is_invariant_violation() {
                error!(client_id = %client.client_id, error = %e, "Request hit an invariant violation");
            } else {
                debug!(client_id = %client.client_id, reason = e.as_label(), "Request failed");
            }
            Response::error(request_id, ErrorInfo::from(&e))
        }
    }
}

fn execute(
    engine: &mut LotEngine,
    client: &ClientInfo,
    command: Command,
    now: DateTime<Local>,
) -> Result<ResponsePayload> {
    match command {
        Command::GetState => Ok(ResponsePayload::State(engine.get_state()?)),

        Command::CheckIn(request) => {
            require(client, client.role.can_check_in(), "check in vehicles")?;
            Ok(ResponsePayload::CheckedIn(engine.check_in(request, now)?))
        }

        Command::ManualCheckIn { plate, driver } => {
            require(client, client.role.can_check_in(), "check in vehicles")?;
            Ok(ResponsePayload::CheckedIn(
                engine.manual_check_in(&plate, &driver, now)?,
            ))
        }

        Command::CheckOut { plate } => {
            require(client, client.role.can_check_out(), "check out vehicles")?;
            Ok(ResponsePayload::CheckedOut(engine.check_out(&plate, now)?))
        }

        Command::ListActiveSessions => Ok(ResponsePayload::Sessions {
            sessions: engine.active_sessions()?,
        }),

        Command::ListSlots => Ok(ResponsePayload::Slots {
            slots: engine.slots()?,
        }),

        Command::GetSummary => Ok(ResponsePayload::Summary(engine.summary()?)),

        Command::RecentRecords { limit } => Ok(ResponsePayload::Records {
            records: engine.recent_records(limit.min(MAX_RECORDS_PER_REQUEST))?,
        }),

        Command::ProvisionSlots { rows, per_row } => {
            require(client, client.role.can_manage_slots(), "provision slots")?;

            let errors = validate_layout(&RawLotLayout {
                rows: rows.clone(),
                slots_per_row: Some(per_row),
            });
            if !errors.is_empty() {
                let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                return Err(LotError::invalid_request(messages.join("; ")));
            }

            Ok(ResponsePayload::Provisioned {
                added: engine.provision(&rows, per_row)?,
            })
        }

        Command::RemoveSlot { code } => {
            require(client, client.role.can_manage_slots(), "remove slots")?;
            engine.remove_slot(&code)?;
            Ok(ResponsePayload::SlotRemoved { code })
        }

        // The IPC layer flips the subscription flag; we only acknowledge
        Command::SubscribeEvents => Ok(ResponsePayload::Subscribed {
            client_id: client.client_id.clone(),
        }),

        Command::UnsubscribeEvents => Ok(ResponsePayload::Unsubscribed),

        Command::GetHealth => {
            let store_ok = engine.is_store_healthy();
            Ok(ResponsePayload::Health(HealthStatus {
                live: true,
                ready: store_ok,
                store_ok,
            }))
        }

        Command::Ping => Ok(ResponsePayload::Pong),
    }
}

fn require(client: &ClientInfo, allowed: bool, action: &str) -> Result<()> {
    if allowed {
        return Ok(());
    }
    warn!(client_id = %client.client_id, role = ?client.role, action, "Permission denied");
    Err(LotError::permission(format!(
        "{:?} clients may not {}",
        client.role, action
    )))
}

/// Protocol event for a core event
pub fn to_event(event: CoreEvent) -> Event {
    let payload = match event {
        CoreEvent::VehicleCheckedIn { session } => EventPayload::VehicleCheckedIn {
            plate: session.plate,
            slot: session.slot,
            entry_time: session.entry_time,
        },
        CoreEvent::VehicleCheckedOut { record } => EventPayload::VehicleCheckedOut { record },
        CoreEvent::SlotsProvisioned { added } => EventPayload::SlotsProvisioned { added },
        CoreEvent::SlotRemoved { code } => EventPayload::SlotRemoved { code },
    };
    Event::new(payload)
}

/// Events to broadcast after a command: one per core event, then a fresh
/// state snapshot if anything changed.
pub fn collect_events(engine: &mut LotEngine) -> Vec<Event> {
    let core_events = engine.drain_events();
    if core_events.is_empty() {
        return Vec::new();
    }

    let mut events: Vec<Event> = core_events.into_iter().map(to_event).collect();
    match engine.get_state() {
        Ok(state) => events.push(Event::new(EventPayload::StateChanged(state))),
        Err(e) => warn!(error = %e, "Failed to build state snapshot"),
    }
    events
}
