//! GetSubscriptionHandler - Query handler for retrieving subscription details.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Subscription};
use crate::domain::foundation::UserId;
use crate::ports::SubscriptionRepository;

/// Query to get a user's subscription.
#[derive(Debug, Clone)]
pub struct GetSubscriptionQuery {
    pub user_id: UserId,
}

/// Result of a successful subscription query.
pub type GetSubscriptionResult = Subscription;

/// Handler for retrieving the authenticated user's subscription.
///
/// Returns the full aggregate for API serialization. A user without a
/// subscription gets a not-found error; the access endpoint is the one
/// that answers "no subscription" softly.
pub struct GetSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
}

impl GetSubscriptionHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionQuery,
    ) -> Result<GetSubscriptionResult, BillingError> {
        self.repository
            .find_by_user_id(&query.user_id)
            .await?
            .ok_or_else(|| BillingError::not_found_for_user(query.user_id))
    }
}
