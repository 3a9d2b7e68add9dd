//! Plain-text notification bodies. No templates — every message is a small
//! `format!` over the records it describes.

use uuid::Uuid;

use leadflow_store::models::{Broker, Contract, Invoice, Lead};
use leadflow_store::NewEmail;

pub fn format_cents(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

pub fn format_amount(cents: i64, currency: &str) -> String {
    format!("{} {}", format_cents(cents), currency.to_uppercase())
}

/// Full contact block — only ever rendered for unlocked deliveries.
fn contact_block(lead: &Lead) -> String {
    let mut lines = vec![format!("Lead #{}: {}", lead.lead_number, lead.display_name())];
    if let Some(email) = &lead.email {
        lines.push(format!("  Email: {email}"));
    }
    if let Some(phone) = &lead.phone {
        lines.push(format!("  Phone: {phone}"));
    }
    match (&lead.postal_code, &lead.city) {
        (Some(plz), Some(city)) => lines.push(format!("  Location: {plz} {city}")),
        (None, Some(city)) => lines.push(format!("  Location: {city}")),
        (Some(plz), None) => lines.push(format!("  Location: {plz}")),
        (None, None) => {}
    }
    if let Some(extra) = lead.extra_data.as_object() {
        for (key, value) in extra {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            lines.push(format!("  {key}: {rendered}"));
        }
    }
    lines.join("\n")
}

/// Payment gates delivery: the broker gets the link, not the contact data.
pub fn payment_request(
    broker: &Broker,
    what: &str,
    invoice: &Invoice,
    link: &str,
    currency: &str,
) -> NewEmail {
    NewEmail {
        recipient: broker.email.clone(),
        subject: format!("Payment required — invoice {}", invoice.invoice_number),
        body: format!(
            "Hello {},\n\n\
             {what} is reserved for you. Contact details are released as soon\n\
             as the payment below is confirmed.\n\n\
             Invoice:  {}\n\
             Amount:   {}\n\
             Due date: {}\n\n\
             Pay here: {link}\n",
            broker.name,
            invoice.invoice_number,
            format_amount(invoice.amount_cents, currency),
            invoice.due_date,
        ),
        kind: "payment_request".to_string(),
        assignment_id: None,
    }
}

pub fn lead_delivered(broker: &Broker, lead: &Lead, assignment_id: Option<Uuid>) -> NewEmail {
    NewEmail {
        recipient: broker.email.clone(),
        subject: format!("New lead: {}", lead.display_name()),
        body: format!(
            "Hello {},\n\nA new lead has been assigned to you.\n\n{}\n",
            broker.name,
            contact_block(lead),
        ),
        kind: "lead_delivered".to_string(),
        assignment_id,
    }
}

/// One consolidated email for a bulk or package delivery — never one email
/// per lead.
pub fn leads_delivered(broker: &Broker, title: &str, leads: &[Lead], note: Option<&str>) -> NewEmail {
    let blocks: Vec<String> = leads.iter().map(contact_block).collect();
    let mut body = format!(
        "Hello {},\n\n{title} — {} lead(s):\n\n{}\n",
        broker.name,
        leads.len(),
        blocks.join("\n\n"),
    );
    if let Some(note) = note {
        body.push_str("\n");
        body.push_str(note);
        body.push('\n');
    }
    NewEmail {
        recipient: broker.email.clone(),
        subject: format!("{title} — {} lead(s)", leads.len()),
        body,
        kind: "leads_delivered".to_string(),
        assignment_id: None,
    }
}

pub fn followup_request(
    broker: &Broker,
    lead: &Lead,
    link: &str,
    assignment_id: Uuid,
) -> NewEmail {
    NewEmail {
        recipient: broker.email.clone(),
        subject: format!("Follow-up requested: {}", lead.display_name()),
        body: format!(
            "Hello {},\n\n\
             How did it go with {}? Please let us know the current status:\n\n\
             {link}\n\n\
             Possible answers: reached, scheduled, not reached, closed.\n",
            broker.name,
            lead.display_name(),
        ),
        kind: "followup_request".to_string(),
        assignment_id: Some(assignment_id),
    }
}

pub fn contract_confirmation(broker: &Broker, contract: &Contract, link: &str) -> NewEmail {
    NewEmail {
        recipient: broker.email.clone(),
        subject: "Please confirm your contract".to_string(),
        body: format!(
            "Hello {},\n\n\
             A new {} contract has been prepared for you. Review and confirm\n\
             it here:\n\n{link}\n\n\
             The contract becomes active once confirmed.\n",
            broker.name, contract.pricing_model,
        ),
        kind: "contract_confirmation".to_string(),
        assignment_id: None,
    }
}

/// Commission and subscription invoices share one shape.
pub fn invoice_notice(
    broker: &Broker,
    what: &str,
    invoice: &Invoice,
    link: &str,
    currency: &str,
) -> NewEmail {
    NewEmail {
        recipient: broker.email.clone(),
        subject: format!("Invoice {} — {what}", invoice.invoice_number),
        body: format!(
            "Hello {},\n\n\
             {what}.\n\n\
             Invoice:  {}\n\
             Amount:   {}\n\
             Due date: {}\n\n\
             Pay here: {link}\n",
            broker.name,
            invoice.invoice_number,
            format_amount(invoice.amount_cents, currency),
            invoice.due_date,
        ),
        kind: "invoice_notice".to_string(),
        assignment_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_cents_with_two_decimals() {
        assert_eq!(format_cents(4000), "40.00");
        assert_eq!(format_cents(25000), "250.00");
        assert_eq!(format_cents(199), "1.99");
        assert_eq!(format_cents(5), "0.05");
    }

    #[test]
    fn formats_amount_with_currency() {
        assert_eq!(format_amount(4000, "eur"), "40.00 EUR");
    }
}
