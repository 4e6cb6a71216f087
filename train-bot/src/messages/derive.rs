//! Turning a train's schedule into timed messages.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;

use crate::domain::{Location, RailTime, ScheduleError, Train};

use super::templates::{MessageTemplates, Slots, Template};
use super::towns::{TownEntry, TownRegistry};

/// Location key used for the origin departure message.
pub const ORIGIN_KEY: &str = "origin";

/// Location key used for the destination arrival message.
pub const DESTINATION_KEY: &str = "destination";

/// Which template a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageRole {
    Departure,
    Passing,
    PassingWithoutTown,
    Arrival,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MessageRole::Departure => "departure",
            MessageRole::Passing => "passing",
            MessageRole::PassingWithoutTown => "passing_without_town",
            MessageRole::Arrival => "arrival",
        })
    }
}

/// A message to send at a particular time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// When to send, in railway local time.
    pub send_at: NaiveDateTime,
    pub text: String,
    /// Stable identifier of the location within the train's journey.
    pub location_key: String,
    pub role: MessageRole,
}

/// Derive the messages for one populated train.
///
/// The result is in journey order: the origin departure, then one message
/// per calling point found in the town registry, then the destination
/// arrival. Calling points are timed at their arrival, or at their
/// departure (passing time) when there is no arrival.
///
/// A calling point visited more than once gets a `#2`, `#3`... suffix on
/// its location key so every message has a distinct key.
///
/// Fails with `Malformed` if the train is unpopulated or a required time
/// is missing; no partial result is returned.
pub fn derive_messages(
    train: &Train,
    towns: &TownRegistry,
    templates: &MessageTemplates,
) -> Result<Vec<Message>, ScheduleError> {
    let malformed = |reason: String| ScheduleError::Malformed {
        uid: train.uid().clone(),
        reason,
    };

    let origin = train
        .origin()
        .ok_or_else(|| malformed("train has no origin".into()))?;
    let destination = train
        .destination()
        .ok_or_else(|| malformed("train has no destination".into()))?;

    let url = train.reference_url();
    let headcode = train.headcode();
    let base = Slots {
        origin: towns.describe(origin),
        destination: towns.describe(destination),
        town: None,
        url: &url,
        headcode: headcode.as_ref().map(|h| h.as_str()),
        time: "",
    };

    let render = |template: &Template, at: RailTime, town: Option<&str>| {
        let time = at.to_string();
        template.render(&Slots {
            town,
            time: &time,
            ..base
        })
    };

    let mut messages = Vec::with_capacity(train.calling_points().len() + 2);

    let departs = origin
        .effective_departure()
        .ok_or_else(|| malformed(format!("origin {} has no departure time", origin.name())))?;
    messages.push(Message {
        send_at: departs.to_datetime(),
        text: render(&templates.departure, departs, None),
        location_key: ORIGIN_KEY.to_string(),
        role: MessageRole::Departure,
    });

    let mut visits: HashMap<&str, usize> = HashMap::new();
    for location in train.calling_points() {
        let Some(entry) = towns.lookup(location) else {
            continue;
        };

        let at = passing_time(location)
            .ok_or_else(|| malformed(format!("no time at {}", location.name())))?;

        let (template, town, role) = match entry {
            TownEntry::Town(town) => (&templates.passing, Some(town), MessageRole::Passing),
            TownEntry::NoTown => (
                &templates.passing_without_town,
                None,
                MessageRole::PassingWithoutTown,
            ),
        };

        let visit = visits.entry(location.key()).or_insert(0);
        *visit += 1;
        let location_key = match *visit {
            1 => location.key().to_string(),
            n => format!("{}#{}", location.key(), n),
        };

        messages.push(Message {
            send_at: at.to_datetime(),
            text: render(template, at, town),
            location_key,
            role,
        });
    }

    let arrives = destination.effective_arrival().ok_or_else(|| {
        malformed(format!(
            "destination {} has no arrival time",
            destination.name()
        ))
    })?;
    messages.push(Message {
        send_at: arrives.to_datetime(),
        text: render(&templates.arrival, arrives, None),
        location_key: DESTINATION_KEY.to_string(),
        role: MessageRole::Arrival,
    });

    Ok(messages)
}

/// The moment a train is at a calling point: arrival if there is one,
/// else departure (a pass point's passing time).
fn passing_time(location: &Location) -> Option<RailTime> {
    location
        .effective_arrival()
        .or_else(|| location.effective_departure())
}
