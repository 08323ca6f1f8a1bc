//! EHS Notify - Delivery of notification plans
//!
//! The workflow only produces a delivery plan; executing it is this
//! collaborator's job. A delivery failure is recorded on the run's
//! notification outcome, never fatal - nothing downstream depends on it.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use ehs_types::{EmailReceipt, NotificationPlan, NotificationReceipts, TicketReceipt};
use uuid::Uuid;

/// Delivery errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeliveryError {
    /// The ticketing or mail integration failed
    #[error("delivery failed: {0}")]
    Integration(String),
}

/// Delivery boundary for tickets and emails
#[async_trait::async_trait]
pub trait NotificationDelivery: Send + Sync {
    /// Execute the plan, returning one receipt per ticket and email
    ///
    /// # Errors
    /// `DeliveryError` when the integration cannot process the plan.
    async fn execute(&self, plan: &NotificationPlan) -> Result<NotificationReceipts, DeliveryError>;
}

/// Stub delivery: assigns receipt ids without contacting any system
#[derive(Debug, Clone, Copy, Default)]
pub struct StubDelivery;

#[async_trait::async_trait]
impl NotificationDelivery for StubDelivery {
    async fn execute(&self, plan: &NotificationPlan) -> Result<NotificationReceipts, DeliveryError> {
        let tickets = plan
            .tickets
            .iter()
            .map(|ticket| {
                let ticket_id = format!("TCK-{}", short_id(8).to_uppercase());
                tracing::info!(
                    ticket_id = %ticket_id,
                    priority = ?ticket.priority,
                    "created ticket"
                );
                TicketReceipt {
                    ticket_id,
                    request: ticket.clone(),
                }
            })
            .collect();

        let emails = plan
            .emails
            .iter()
            .map(|email| {
                let message_id = format!("MSG-{}", short_id(10));
                tracing::info!(
                    recipient = %email.recipient,
                    subject = %email.subject,
                    "queued email"
                );
                EmailReceipt {
                    message_id,
                    request: email.clone(),
                }
            })
            .collect();

        Ok(NotificationReceipts {
            tickets,
            emails,
            notes: Some("Tickets and emails processed via stub integrations.".to_string()),
        })
    }
}

fn short_id(len: usize) -> String {
    Uuid::new_v4().simple().to_string()[..len].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ehs_types::{EmailRequest, TicketPriority, TicketRequest};

    fn plan() -> NotificationPlan {
        NotificationPlan {
            tickets: vec![TicketRequest {
                title: "Inspect dock 4".to_string(),
                description: "Coolant spill follow-up".to_string(),
                priority: TicketPriority::High,
            }],
            emails: vec![EmailRequest {
                recipient: "safety@example.com".to_string(),
                subject: "Incident follow-up".to_string(),
                body: "See attached plan.".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn stub_issues_one_receipt_per_request() {
        let receipts = StubDelivery.execute(&plan()).await.unwrap();
        assert_eq!(receipts.tickets.len(), 1);
        assert_eq!(receipts.emails.len(), 1);
        assert!(receipts.tickets[0].ticket_id.starts_with("TCK-"));
        assert!(receipts.emails[0].message_id.starts_with("MSG-"));
        assert!(receipts.notes.is_some());
    }

    #[tokio::test]
    async fn empty_plan_yields_empty_receipts() {
        let receipts = StubDelivery
            .execute(&NotificationPlan {
                tickets: vec![],
                emails: vec![],
            })
            .await
            .unwrap();
        assert!(receipts.tickets.is_empty());
        assert!(receipts.emails.is_empty());
    }
}
