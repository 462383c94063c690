//! Email bodies for storefront events.
//!
//! Every template produces a plain-text part and a minimal HTML part. All
//! interpolated values are HTML-escaped.

use chrono::{DateTime, Utc};
use pawmart_core::{Money, OrderStatus, ReservationStatus};

use crate::OutgoingEmail;

/// One line of an order confirmation.
#[derive(Debug, Clone)]
pub struct OrderEmailLine {
    pub name: String,
    pub quantity: u32,
    pub line_total: Money,
}

/// Data for the order confirmation email.
#[derive(Debug, Clone)]
pub struct OrderEmail {
    pub to: String,
    pub customer_name: String,
    pub order_number: String,
    pub lines: Vec<OrderEmailLine>,
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
    pub address_lines: Vec<String>,
}

/// Data for a reservation notice.
#[derive(Debug, Clone)]
pub struct ReservationEmail {
    pub to: String,
    pub contact_name: String,
    pub pet_name: String,
    pub scheduled_for: DateTime<Utc>,
    pub party_size: u32,
    pub status: ReservationStatus,
}

/// Escape text for inclusion in HTML.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn wrap_html(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html><body style=\"font-family:sans-serif\">\
         <h2>{}</h2>{}<p>The PawMart team</p></body></html>",
        escape_html(title),
        body
    )
}

/// Welcome email sent after registration.
pub fn welcome(to: &str, name: &str) -> OutgoingEmail {
    let subject = "Welcome to PawMart".to_string();
    let text = format!(
        "Hi {name},\n\nThanks for joining PawMart. Browse our pets and supplies any time.\n\nThe PawMart team\n"
    );
    let html = wrap_html(
        &subject,
        &format!(
            "<p>Hi {},</p><p>Thanks for joining PawMart. Browse our pets and supplies any time.</p>",
            escape_html(name)
        ),
    );
    OutgoingEmail {
        to: vec![to.to_string()],
        subject,
        html,
        text,
    }
}

/// Order confirmation with a line-item table and totals.
pub fn order_confirmation(order: &OrderEmail) -> OutgoingEmail {
    let subject = format!("Order {} confirmed", order.order_number);

    let mut text = format!(
        "Hi {},\n\nThanks for your order {}.\n\n",
        order.customer_name, order.order_number
    );
    for line in &order.lines {
        text.push_str(&format!(
            "  {} x {}  {}\n",
            line.quantity, line.name, line.line_total
        ));
    }
    text.push_str(&format!(
        "\nSubtotal: {}\nShipping: {}\nTax: {}\nTotal: {}\n",
        order.subtotal, order.shipping, order.tax, order.total
    ));
    if !order.address_lines.is_empty() {
        text.push_str("\nShipping to:\n");
        for l in &order.address_lines {
            text.push_str(&format!("  {l}\n"));
        }
    }
    text.push_str("\nThe PawMart team\n");

    let mut rows = String::new();
    for line in &order.lines {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td style=\"text-align:right\">{}</td></tr>",
            escape_html(&line.name),
            line.quantity,
            line.line_total
        ));
    }
    let address = order
        .address_lines
        .iter()
        .map(|l| escape_html(l))
        .collect::<Vec<_>>()
        .join("<br>");
    let html = wrap_html(
        &subject,
        &format!(
            "<p>Hi {},</p><p>Thanks for your order.</p>\
             <table><tr><th>Item</th><th>Qty</th><th>Total</th></tr>{rows}</table>\
             <p>Subtotal: {}<br>Shipping: {}<br>Tax: {}<br><strong>Total: {}</strong></p>\
             <p>{address}</p>",
            escape_html(&order.customer_name),
            order.subtotal,
            order.shipping,
            order.tax,
            order.total,
        ),
    );

    OutgoingEmail {
        to: vec![order.to.clone()],
        subject,
        html,
        text,
    }
}

/// Notice that an order moved to a new status.
pub fn order_status_update(
    to: &str,
    customer_name: &str,
    order_number: &str,
    status: OrderStatus,
) -> OutgoingEmail {
    let phrase = match status {
        OrderStatus::Pending => "has been received",
        OrderStatus::Processing => "is being prepared",
        OrderStatus::Shipped => "is on its way",
        OrderStatus::Delivered => "has been delivered",
        OrderStatus::Cancelled => "has been cancelled",
    };
    let subject = format!("Order {order_number} {phrase}");
    let text = format!(
        "Hi {customer_name},\n\nYour order {order_number} {phrase}.\n\nThe PawMart team\n"
    );
    let html = wrap_html(
        &subject,
        &format!(
            "<p>Hi {},</p><p>Your order {} {phrase}.</p>",
            escape_html(customer_name),
            escape_html(order_number)
        ),
    );
    OutgoingEmail {
        to: vec![to.to_string()],
        subject,
        html,
        text,
    }
}

/// Reservation notice. Wording follows the reservation status.
pub fn reservation_notice(r: &ReservationEmail) -> OutgoingEmail {
    let when = r.scheduled_for.format("%A %d %B %Y at %H:%M UTC").to_string();
    let (subject, sentence) = match r.status {
        ReservationStatus::Pending => (
            format!("Visit request for {} received", r.pet_name),
            format!(
                "We received your request to meet {} on {when} for {} guest(s). We will confirm shortly.",
                r.pet_name, r.party_size
            ),
        ),
        ReservationStatus::Confirmed => (
            format!("Your visit with {} is confirmed", r.pet_name),
            format!(
                "Your visit to meet {} on {when} for {} guest(s) is confirmed. See you soon!",
                r.pet_name, r.party_size
            ),
        ),
        ReservationStatus::Completed => (
            format!("Thanks for visiting {}", r.pet_name),
            format!("Thanks for visiting {}. We hope to see you again.", r.pet_name),
        ),
        ReservationStatus::Cancelled => (
            format!("Your visit with {} was cancelled", r.pet_name),
            format!("Your visit to meet {} on {when} has been cancelled.", r.pet_name),
        ),
    };

    let text = format!("Hi {},\n\n{sentence}\n\nThe PawMart team\n", r.contact_name);
    let html = wrap_html(
        &subject,
        &format!(
            "<p>Hi {},</p><p>{}</p>",
            escape_html(&r.contact_name),
            escape_html(&sentence)
        ),
    );
    OutgoingEmail {
        to: vec![r.to.clone()],
        subject,
        html,
        text,
    }
}
