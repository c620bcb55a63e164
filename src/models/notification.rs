// src/models/notification.rs

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{booking::Booking, payment::Refund};

/// Eventos do ciclo de vida que geram e-mail (hóspede + hotel).
#[derive(Debug, Clone)]
pub enum BookingEvent {
    Confirmed { booking: Booking, room_name: String },
    Cancelled { booking: Booking, room_name: String, refund: Option<Refund> },
}

impl BookingEvent {
    pub fn booking(&self) -> &Booking {
        match self {
            BookingEvent::Confirmed { booking, .. } | BookingEvent::Cancelled { booking, .. } => booking,
        }
    }
}

/// Mensagem pronta para a API de e-mail: assunto + campos estruturados.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub fields: BTreeMap<String, String>,
}
