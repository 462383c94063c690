//! Fire-and-forget email delivery.
//!
//! Mail never blocks or fails a request: messages are sent on a spawned
//! task and a delivery failure is only logged.

use pawmart_core::ShippingAddress;
use pawmart_mail::templates::{self, OrderEmail, OrderEmailLine, ReservationEmail};
use pawmart_mail::OutgoingEmail;

use crate::state::{AppState, OrderRecord, ReservationRecord};

/// Send `email` in the background if a mail client is configured.
pub fn send_in_background(state: &AppState, kind: &'static str, email: OutgoingEmail) {
    let Some(client) = state.mail.clone() else {
        tracing::debug!(kind, "mail not configured, skipping");
        return;
    };
    tokio::spawn(async move {
        match client.send(&email).await {
            Ok(sent) => tracing::info!(kind, message_id = %sent.id, "email sent"),
            Err(e) => tracing::warn!(kind, error = %e, "email delivery failed"),
        }
    });
}

fn address_lines(address: &ShippingAddress) -> Vec<String> {
    let mut lines = vec![address.full_name.clone(), address.line1.clone()];
    if let Some(line2) = &address.line2 {
        lines.push(line2.clone());
    }
    let mut city = format!("{} {}", address.postal_code, address.city);
    if let Some(region) = &address.region {
        city.push_str(", ");
        city.push_str(region);
    }
    lines.push(city);
    lines.push(address.country.clone());
    lines
}

/// Confirmation email for a freshly placed order.
pub fn order_confirmation(order: &OrderRecord) -> OutgoingEmail {
    templates::order_confirmation(&OrderEmail {
        to: order.contact_email.clone(),
        customer_name: order.shipping_address.full_name.clone(),
        order_number: order.order_number.clone(),
        lines: order
            .lines
            .iter()
            .map(|l| OrderEmailLine {
                name: l.name.clone(),
                quantity: l.quantity,
                line_total: l.line_total,
            })
            .collect(),
        subtotal: order.subtotal,
        shipping: order.shipping,
        tax: order.tax,
        total: order.total,
        address_lines: address_lines(&order.shipping_address),
    })
}

/// Status-change email for an order.
pub fn order_status(order: &OrderRecord) -> OutgoingEmail {
    templates::order_status_update(
        &order.contact_email,
        &order.shipping_address.full_name,
        &order.order_number,
        order.status,
    )
}

/// Reservation email reflecting the reservation's current status.
pub fn reservation(reservation: &ReservationRecord, pet_name: &str) -> OutgoingEmail {
    templates::reservation_notice(&ReservationEmail {
        to: reservation.contact_email.clone(),
        contact_name: reservation.contact_name.clone(),
        pet_name: pet_name.to_string(),
        scheduled_for: reservation.scheduled_for,
        party_size: reservation.party_size,
        status: reservation.status,
    })
}
