//! Contract emails.
//!
//! Delivery is best-effort: a missing recipient or a provider failure is
//! logged and never fails the operation that triggered the email.

use std::sync::Arc;

use crate::domain::contract::{Contract, FeeKind, OtpCode, Party, PurchaseRequest};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{EmailMessage, Notifier, UserDirectory};

/// Resolves user addresses and sends contract emails.
pub struct ContractMailer {
    notifier: Arc<dyn Notifier>,
    users: Arc<dyn UserDirectory>,
}

impl ContractMailer {
    pub fn new(notifier: Arc<dyn Notifier>, users: Arc<dyn UserDirectory>) -> Self {
        Self { notifier, users }
    }

    /// Sends one email. Returns whether the provider accepted it.
    pub async fn send_to(&self, user_id: UserId, subject: &str, html_body: String) -> bool {
        let profile = match self.users.find_user(user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::warn!(user_id = %user_id, subject, "Email recipient not found, skipping");
                return false;
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Recipient lookup failed, skipping email");
                return false;
            }
        };

        match self
            .notifier
            .send(EmailMessage::new(profile.email, subject, html_body))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(user_id = %user_id, subject, error = %e, "Email delivery failed");
                false
            }
        }
    }

    /// Sends the same email to buyer and seller.
    pub async fn send_to_parties(&self, contract: &Contract, subject: &str, html_body: String) -> usize {
        let mut delivered = 0;
        for party in [Party::Buyer, Party::Seller] {
            if self
                .send_to(contract.party_user(party), subject, html_body.clone())
                .await
            {
                delivered += 1;
            }
        }
        delivered
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Templates
// ════════════════════════════════════════════════════════════════════════════

pub(crate) fn contract_opened(contract: &Contract) -> (String, String) {
    let subject = "Your purchase contract has been opened".to_string();
    let body = format!(
        "<p>A contract for listing #{} has been opened.</p>\
         <p>Contract reference: <strong>{}</strong></p>\
         <p>A member of our staff will contact you to arrange an appointment.</p>",
        contract.listing_id(),
        contract.id()
    );
    (subject, body)
}

pub(crate) fn purchase_request_received(request: &PurchaseRequest) -> (String, String) {
    let subject = "New purchase request for your listing".to_string();
    let message = request
        .message()
        .map(|m| format!("<blockquote>{}</blockquote>", escape_html(m)))
        .unwrap_or_default();
    let body = format!(
        "<p>A buyer has asked to purchase listing #{}.</p>{}\
         <p>The request expires on {}.</p>",
        request.listing_id(),
        message,
        request.expires_at().as_datetime().format("%Y-%m-%d %H:%M UTC")
    );
    (subject, body)
}

pub(crate) fn purchase_request_rejected(request: &PurchaseRequest) -> (String, String) {
    let subject = "Your purchase request was declined".to_string();
    let body = format!(
        "<p>Your request to purchase listing #{} was declined.</p>\
         <p>Reason: {}</p>",
        request.listing_id(),
        escape_html(request.reject_reason().unwrap_or("not given"))
    );
    (subject, body)
}

pub(crate) fn signing_code(contract: &Contract, code: &OtpCode, expires_at: Timestamp) -> (String, String) {
    let subject = "Your contract signing code".to_string();
    let body = format!(
        "<p>Use this code to sign contract <strong>{}</strong>:</p>\
         <p style=\"font-size:24px;letter-spacing:4px\"><strong>{}</strong></p>\
         <p>The code expires at {}. Never share it with anyone, including our staff.</p>",
        contract.id(),
        code.expose(),
        expires_at.as_datetime().format("%H:%M UTC")
    );
    (subject, body)
}

pub(crate) fn draft_terms(contract: &Contract) -> (String, String) {
    let subject = "Draft contract for your review".to_string();
    let body = format!(
        "<p>Please review the terms of contract <strong>{}</strong> before signing.</p>{}{}",
        contract.id(),
        appointment_html(contract),
        terms_html(contract)
    );
    (subject, body)
}

pub(crate) fn contract_completed(contract: &Contract) -> (String, String) {
    let subject = "Your contract is complete".to_string();
    let body = format!(
        "<p>Contract <strong>{}</strong> has been completed. Thank you for trading with us.</p>{}",
        contract.id(),
        terms_html(contract)
    );
    (subject, body)
}

fn appointment_html(contract: &Contract) -> String {
    let Some(appointment) = contract.appointment() else {
        return String::new();
    };
    let note = appointment
        .note
        .as_deref()
        .map(|n| format!("<br>{}", escape_html(n)))
        .unwrap_or_default();
    format!(
        "<p><strong>Appointment:</strong> {} at {}{}</p>",
        appointment.scheduled_at.as_datetime().format("%Y-%m-%d %H:%M UTC"),
        escape_html(&appointment.place),
        note
    )
}

fn terms_html(contract: &Contract) -> String {
    let Some(terms) = contract.terms() else {
        return String::new();
    };

    let rows: String = FeeKind::ALL
        .iter()
        .map(|kind| {
            let payer = terms
                .responsibility
                .party_for(*kind)
                .map(|p| p.as_str())
                .unwrap_or("-");
            format!(
                "<tr><td>{}</td><td align=\"right\">{}</td><td>{}</td></tr>",
                kind.label(),
                format_amount(terms.fees.amount(*kind)),
                payer
            )
        })
        .collect();

    format!(
        "<p><strong>Agreed price:</strong> {}</p>\
         <table><tr><th>Fee</th><th>Amount</th><th>Paid by</th></tr>{}</table>\
         <p>Buyer pays {} in fees; seller pays {}.</p>",
        format_amount(terms.agreed_price),
        rows,
        format_amount(terms.responsibility.total_for(Party::Buyer, &terms.fees)),
        format_amount(terms.responsibility.total_for(Party::Seller, &terms.fees))
    )
}

/// Groups digits in threes: `1500000` becomes `1,500,000`.
pub(crate) fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if amount < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::email::RecordingNotifier;
    use crate::application::handlers::test_support::{email_of, user, Fixture, BUYER};

    #[test]
    fn amounts_are_grouped_in_thousands() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(1_000), "1,000");
        assert_eq!(format_amount(850_000_000), "850,000,000");
        assert_eq!(format_amount(-12_345), "-12,345");
    }

    #[test]
    fn user_text_is_escaped() {
        assert_eq!(
            escape_html("<b>Tom & \"Jerry\"</b>"),
            "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;"
        );
    }

    #[tokio::test]
    async fn send_to_resolves_address() {
        let fixture = Fixture::new();
        let mailer = fixture.mailer();

        assert!(mailer.send_to(user(BUYER), "Hello", "<p>hi</p>".into()).await);
        assert_eq!(fixture.notifier.sent_to(&email_of(BUYER)).len(), 1);
    }

    #[tokio::test]
    async fn unknown_recipient_is_skipped() {
        let fixture = Fixture::new();
        let mailer = fixture.mailer();

        assert!(!mailer.send_to(user(999), "Hello", String::new()).await);
        assert!(fixture.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_swallowed() {
        let fixture = Fixture::new();
        let mailer = ContractMailer::new(Arc::new(RecordingNotifier::failing()), fixture.store.clone());

        assert!(!mailer.send_to(user(BUYER), "Hello", String::new()).await);
    }
}
