//! HTTP handlers for billing endpoints.
//!
//! These handlers connect axum routes to application layer command/query
//! handlers. Authenticated routes receive the caller through the
//! `RequireAuth` extractor filled in by the auth middleware; the webhook
//! route authenticates by signature instead.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::billing::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, ChangePlanCommand, ChangePlanHandler,
    CheckAccessHandler, CheckAccessQuery, GetSubscriptionHandler, GetSubscriptionQuery,
    ProcessWebhookCommand, ProcessWebhookHandler, RequestRefundCommand, RequestRefundHandler,
    StartCheckoutCommand, StartCheckoutHandler,
};
use crate::domain::billing::{BillingError, PagarmeWebhookVerifier, WebhookError};
use crate::domain::foundation::Timestamp;
use crate::ports::{
    EventPublisher, PaymentGateway, SubscriptionRepository, TransactionRepository,
    WebhookEventRepository,
};

use crate::adapters::http::middleware::RequireAuth;

use super::dto::{
    AccessResponse, CancelSubscriptionRequest, CancelSubscriptionResponse, ChangePlanRequest,
    ChangePlanResponse, CheckoutResponse, ErrorResponse, HealthResponse, RefundResponse,
    RequestRefundRequest, StartCheckoutRequest, SubscriptionResponse, WebhookAckResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped
/// dependencies for efficient sharing across handlers.
#[derive(Clone)]
pub struct BillingAppState {
    pub subscription_repository: Arc<dyn SubscriptionRepository>,
    pub transaction_repository: Arc<dyn TransactionRepository>,
    pub webhook_repository: Arc<dyn WebhookEventRepository>,
    pub payment_gateway: Arc<dyn PaymentGateway>,
    pub event_publisher: Arc<dyn EventPublisher>,
    pub webhook_verifier: PagarmeWebhookVerifier,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn get_subscription_handler(&self) -> GetSubscriptionHandler {
        GetSubscriptionHandler::new(self.subscription_repository.clone())
    }

    pub fn check_access_handler(&self) -> CheckAccessHandler {
        CheckAccessHandler::new(self.subscription_repository.clone())
    }

    pub fn start_checkout_handler(&self) -> StartCheckoutHandler {
        StartCheckoutHandler::new(
            self.subscription_repository.clone(),
            self.payment_gateway.clone(),
        )
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(
            self.subscription_repository.clone(),
            self.payment_gateway.clone(),
            self.event_publisher.clone(),
        )
    }

    pub fn change_plan_handler(&self) -> ChangePlanHandler {
        ChangePlanHandler::new(
            self.subscription_repository.clone(),
            self.event_publisher.clone(),
        )
    }

    pub fn request_refund_handler(&self) -> RequestRefundHandler {
        RequestRefundHandler::new(
            self.subscription_repository.clone(),
            self.transaction_repository.clone(),
            self.payment_gateway.clone(),
            self.event_publisher.clone(),
        )
    }

    pub fn webhook_handler(&self) -> ProcessWebhookHandler {
        ProcessWebhookHandler::new(
            self.webhook_verifier.clone(),
            self.subscription_repository.clone(),
            self.transaction_repository.clone(),
            self.webhook_repository.clone(),
            self.event_publisher.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/subscription - Get current user's subscription
pub async fn get_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.get_subscription_handler();
    let query = GetSubscriptionQuery { user_id: user.id };

    let subscription = handler.handle(query).await?;

    let response = SubscriptionResponse::new(&subscription, Timestamp::now());
    Ok(Json(response))
}

/// GET /api/subscription/access - Check if user has access
pub async fn check_access(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.check_access_handler();
    let query = CheckAccessQuery { user_id: user.id };

    let result = handler.handle(query).await?;

    Ok(Json(AccessResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/subscription/checkout - Start a checkout for a plan
///
/// Creates a hosted payment link at the gateway and records a pending
/// subscription. The row turns active once the payment webhook confirms
/// the charge.
pub async fn start_checkout(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<StartCheckoutRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.start_checkout_handler();
    let cmd = StartCheckoutCommand {
        user_id: user.id,
        plan_type: request.plan_type,
        customer_email: user.email,
        customer_name: request.customer_name.or(user.display_name),
        customer_document: request.customer_document,
    };

    let result = handler.handle(cmd).await?;

    Ok(Json(CheckoutResponse::from(result)))
}

/// POST /api/subscription/cancel - Cancel a subscription
///
/// Repeating the call for an already cancelled subscription answers 200
/// with `already_cancelled: true` instead of an error.
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CancelSubscriptionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.cancel_subscription_handler();
    let cmd = CancelSubscriptionCommand {
        subscription_id: request.subscription_id,
        user_id: user.id,
        cancel_immediately: request.cancel_immediately,
    };

    let result = handler.handle(cmd).await?;

    Ok(Json(CancelSubscriptionResponse::from(result)))
}

/// POST /api/subscription/change-plan - Schedule a plan change
///
/// The change is deferred: the current plan keeps billing until the end
/// of the period, then the new plan takes over.
pub async fn change_plan(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<ChangePlanRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.change_plan_handler();
    let cmd = ChangePlanCommand {
        subscription_id: request.subscription_id,
        user_id: user.id,
        new_plan: request.new_plan_type,
    };

    let result = handler.handle(cmd).await?;

    Ok(Json(ChangePlanResponse::from(result)))
}

/// POST /api/subscription/refund - Request a refund
///
/// Only allowed inside the 8 day usage window and only once.
pub async fn request_refund(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<RequestRefundRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.request_refund_handler();
    let cmd = RequestRefundCommand {
        subscription_id: request.subscription_id,
        user_id: user.id,
    };

    let result = handler.handle(cmd).await?;

    Ok(Json(RefundResponse::from(result)))
}

/// POST /webhooks/pagarme - Handle Pagar.me webhook events
///
/// Unauthenticated; the HMAC signature in `X-Pagarme-Signature` is the
/// credential. The raw body bytes are passed through untouched because
/// the digest covers the exact bytes sent.
pub async fn handle_pagarme_webhook(
    State(state): State<BillingAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get("X-Pagarme-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            WebhookError::ParseError("missing X-Pagarme-Signature header".to_string())
        })?;

    let handler = state.webhook_handler();
    let cmd = ProcessWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    handler.handle(cmd).await?;

    Ok(Json(WebhookAckResponse { received: true }))
}

/// GET /health - Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = match &self.0 {
            BillingError::NotFound(_) | BillingError::NotFoundForUser(_) => {
                (StatusCode::NOT_FOUND, "SUBSCRIPTION_NOT_FOUND")
            }
            BillingError::TransactionNotFound(_) => {
                (StatusCode::NOT_FOUND, "TRANSACTION_NOT_FOUND")
            }
            BillingError::InvalidPlan(_) => (StatusCode::BAD_REQUEST, "INVALID_PLAN"),
            BillingError::InvalidState { .. } => (StatusCode::BAD_REQUEST, "INVALID_STATE"),
            BillingError::RefundWindowExpired { .. } => {
                (StatusCode::BAD_REQUEST, "REFUND_WINDOW_EXPIRED")
            }
            BillingError::RefundAlreadyProcessed => {
                (StatusCode::BAD_REQUEST, "REFUND_ALREADY_PROCESSED")
            }
            BillingError::VersionConflict => (StatusCode::CONFLICT, "CONCURRENT_MODIFICATION"),
            BillingError::GatewayFailed(_) => (StatusCode::BAD_GATEWAY, "GATEWAY_ERROR"),
            BillingError::InvalidWebhookSignature => {
                (StatusCode::UNAUTHORIZED, "INVALID_WEBHOOK_SIGNATURE")
            }
            BillingError::ValidationFailed { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            BillingError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "billing request failed");
        }

        // Use the error's built-in message() method for consistent messaging
        let body = match &self.0 {
            BillingError::RefundWindowExpired { days_used } => ErrorResponse::with_details(
                error_code,
                self.0.message(),
                serde_json::json!({ "days_used": days_used }),
            ),
            _ => ErrorResponse::new(error_code, self.0.message()),
        };
        (status, Json(body)).into_response()
    }
}

/// API error type for the webhook endpoint.
///
/// The status code drives the gateway's redelivery: 4xx drops the event,
/// 5xx makes Pagar.me retry later.
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        let error_code = match &self.0 {
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::ParseError(_) => "PARSE_ERROR",
            WebhookError::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            WebhookError::InvalidTransition(_) => "INVALID_TRANSITION",
            WebhookError::Ignored(_) => {
                // Ignored events never escape the webhook handler, but the
                // status mapping acknowledges them just in case
                return (status, Json(WebhookAckResponse { received: true })).into_response();
            }
            WebhookError::Database(_) => "DATABASE_ERROR",
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "webhook processing failed");
        } else {
            tracing::warn!(error = %self.0, "webhook rejected");
        }

        let body = ErrorResponse::new(error_code, self.0.to_string());
        (status, Json(body)).into_response()
    }
}
