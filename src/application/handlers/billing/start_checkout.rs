//! StartCheckoutHandler - Command handler for beginning a plan purchase.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PlanType, Subscription, SubscriptionStatus};
use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use crate::ports::{CheckoutCustomer, CheckoutRequest, PaymentGateway, SubscriptionRepository};

/// Command to start a checkout for a plan.
#[derive(Debug, Clone)]
pub struct StartCheckoutCommand {
    /// Authenticated caller buying the plan.
    pub user_id: UserId,
    pub plan_type: PlanType,
    /// Email from the auth token; the gateway bills against it.
    pub customer_email: String,
    /// Display name, when the caller supplied one.
    pub customer_name: Option<String>,
    /// CPF, when the caller supplied one. Formatting is stripped.
    pub customer_document: Option<String>,
}

/// Result of a started checkout.
#[derive(Debug, Clone)]
pub struct StartCheckoutResult {
    pub subscription_id: SubscriptionId,
    /// Gateway-hosted page the user completes the purchase on.
    pub checkout_url: String,
    /// Payment link id, stored as the row's gateway reference.
    pub gateway_link_id: String,
}

/// Handler for starting a checkout.
///
/// Creates a hosted payment link at the gateway and records the purchase
/// attempt as a pending subscription. The row only turns active once the
/// payment webhook confirms the charge. A user who already has an active
/// subscription is turned away before the gateway is called.
pub struct StartCheckoutHandler {
    repository: Arc<dyn SubscriptionRepository>,
    gateway: Arc<dyn PaymentGateway>,
}

impl StartCheckoutHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            repository,
            gateway,
        }
    }

    pub async fn handle(
        &self,
        cmd: StartCheckoutCommand,
    ) -> Result<StartCheckoutResult, BillingError> {
        // 1. An active subscriber has nothing to check out for
        let existing = self.repository.find_by_user_id(&cmd.user_id).await?;
        if let Some(subscription) = &existing {
            if subscription.status == SubscriptionStatus::Active {
                return Err(BillingError::invalid_state(
                    "User already has an active subscription",
                ));
            }
        }

        // 2. Create the hosted payment link at the gateway
        let request = checkout_request(&cmd);
        let session = self.gateway.create_checkout(&request).await?;

        // 3. Record the purchase attempt as a pending row. A user keeps a
        //    single subscription row, so a returning user's row is re-armed
        //    instead of inserted again.
        let now = Timestamp::now();
        let subscription = match existing {
            Some(mut subscription) => {
                subscription.start_checkout(
                    cmd.plan_type,
                    session.gateway_link_id.clone(),
                    now,
                )?;
                self.repository.update(&subscription).await?;
                subscription
            }
            None => {
                let mut subscription = Subscription::create_pending(
                    SubscriptionId::new(),
                    cmd.user_id.clone(),
                    cmd.plan_type,
                    now,
                );
                subscription.start_checkout(
                    cmd.plan_type,
                    session.gateway_link_id.clone(),
                    now,
                )?;
                self.repository.save(&subscription).await?;
                subscription
            }
        };

        tracing::info!(
            subscription_id = %subscription.id,
            user_id = %cmd.user_id,
            plan = %cmd.plan_type.as_str(),
            link_id = %session.gateway_link_id,
            "checkout started"
        );

        Ok(StartCheckoutResult {
            subscription_id: subscription.id,
            checkout_url: session.checkout_url,
            gateway_link_id: session.gateway_link_id,
        })
    }
}

/// Builds the gateway request, filling customer gaps from the auth token.
fn checkout_request(cmd: &StartCheckoutCommand) -> CheckoutRequest {
    let name = cmd
        .customer_name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| {
            cmd.customer_email
                .split('@')
                .next()
                .unwrap_or("Cliente")
                .to_string()
        });

    let document: String = cmd
        .customer_document
        .as_deref()
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();

    CheckoutRequest {
        plan_code: format!("plan_{}", cmd.plan_type.as_str()),
        description: format!("Plano {} - AnestEasy", cmd.plan_type.display_name()),
        amount_cents: cmd.plan_type.price_cents(),
        customer: CheckoutCustomer {
            name,
            email: cmd.customer_email.clone(),
            document,
        },
        user_id: cmd.user_id.to_string(),
    }
}
