use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::card::{self, CardInput, CardType};
use crate::db::models::{NewPayment, Payment, PaymentStatus};
use crate::db::queries;
use crate::error::AppError;
use crate::middleware::auth::CurrentUser;
use crate::services::settlement::{spawn_settlement, SettlementConfig};
use crate::services::RefundService;
use crate::validation;
use crate::{crypto::CardCipher, txid, AppState};

/// `original * rate + fixed_fee`, rounded to cents.
pub fn compute_commission(
    original: &BigDecimal,
    rate: &BigDecimal,
    fixed_fee: &BigDecimal,
) -> BigDecimal {
    (original * rate + fixed_fee).round(2)
}

fn decrypted_view(payment: &Payment, cipher: &CardCipher) -> Result<PaymentView, AppError> {
    let card_last_four = cipher
        .decrypt(&payment.card_last_four)
        .map_err(|e| AppError::Internal(format!("card decrypt failed: {}", e)))?;

    Ok(PaymentView {
        transaction_id: payment.transaction_id.clone(),
        status: payment.status.clone(),
        amount: payment.amount.clone(),
        original_amount: payment.original_amount.clone(),
        commission_amount: payment.commission_amount.clone(),
        currency: payment.currency.clone(),
        card_last_four,
        description: payment.description.clone(),
        created_at: payment.created_at,
        updated_at: payment.updated_at,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub transaction_id: String,
    pub status: String,
    pub amount: BigDecimal,
    pub original_amount: BigDecimal,
    pub commission_amount: BigDecimal,
    pub currency: String,
    pub card_last_four: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- POST /payments/validate-card ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCardRequest {
    pub card_number: Option<String>,
    pub cvv: Option<String>,
    pub expiry_month: Option<u32>,
    pub expiry_year: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCardResponse {
    pub valid: bool,
    pub card_type: CardType,
    pub masked_number: String,
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

pub async fn validate_card(
    Json(body): Json<ValidateCardRequest>,
) -> Result<impl IntoResponse, AppError> {
    validation::require_fields(&[
        ("cardNumber", body.card_number.is_some()),
        ("cvv", body.cvv.is_some()),
        ("expiryMonth", body.expiry_month.is_some()),
        ("expiryYear", body.expiry_year.is_some()),
    ])?;

    let result = card::validate_card(&CardInput {
        number: body.card_number.as_deref().unwrap_or_default(),
        cvv: body.cvv.as_deref().unwrap_or_default(),
        expiry_month: body.expiry_month.unwrap_or_default(),
        expiry_year: body.expiry_year.unwrap_or_default(),
    });

    Ok(Json(ValidateCardResponse {
        valid: result.valid,
        card_type: result.card_type,
        masked_number: result.masked_number,
        errors: result.errors,
        timestamp: Utc::now(),
    }))
}

// --- POST /payments/create ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub user_id: Option<i64>,
    pub amount: Option<BigDecimal>,
    pub currency: Option<String>,
    pub card_number: Option<String>,
    pub cvv: Option<String>,
    pub expiry_month: Option<u32>,
    pub expiry_year: Option<i32>,
    pub description: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub message: String,
    pub transaction_id: String,
    pub status: String,
    pub original_amount: BigDecimal,
    pub commission_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub currency: String,
    pub card_type: CardType,
    pub masked_card_number: String,
    pub estimated_processing_time: String,
}

pub async fn create_payment(
    State(state): State<AppState>,
    Json(body): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    validation::require_fields(&[
        ("userId", body.user_id.is_some()),
        ("amount", body.amount.is_some()),
        ("cardNumber", body.card_number.is_some()),
        ("cvv", body.cvv.is_some()),
        ("expiryMonth", body.expiry_month.is_some()),
        ("expiryYear", body.expiry_year.is_some()),
    ])?;

    let user_id = body.user_id.unwrap_or_default();
    let amount = body.amount.clone().unwrap_or_default();
    validation::validate_positive_amount(&amount)?;

    let card_validation = card::validate_card(&CardInput {
        number: body.card_number.as_deref().unwrap_or_default(),
        cvv: body.cvv.as_deref().unwrap_or_default(),
        expiry_month: body.expiry_month.unwrap_or_default(),
        expiry_year: body.expiry_year.unwrap_or_default(),
    });
    if !card_validation.valid {
        return Err(AppError::InvalidCard(card_validation.errors));
    }

    // All fee math happens at cent precision so the accounting identity
    // amount == original + commission survives the NUMERIC(12,2) columns.
    let original = amount.round(2);
    let commission = compute_commission(
        &original,
        &state.config.commission_rate,
        &state.config.commission_fixed_fee,
    );
    let total = &original + &commission;

    let currency = body.currency.unwrap_or_else(|| "USD".to_string());
    let encrypted_last_four = state
        .cipher
        .encrypt(card_validation.last_four())
        .map_err(|e| AppError::Internal(format!("card encrypt failed: {}", e)))?;

    let payment = queries::insert_payment(
        &state.db,
        &NewPayment {
            transaction_id: txid::generate(),
            user_id,
            amount: total.clone(),
            original_amount: original.clone(),
            commission_amount: commission.clone(),
            currency: currency.clone(),
            status: PaymentStatus::Pending,
            card_last_four: encrypted_last_four,
            payment_method: "credit_card".to_string(),
            description: body
                .description
                .unwrap_or_else(|| "Movie ticket purchase".to_string()),
        },
    )
    .await?;

    tracing::info!(
        transaction_id = %payment.transaction_id,
        user_id,
        amount = %total,
        commission = %commission,
        "payment created, settlement scheduled"
    );

    // The caller never waits for settlement; a detached task resolves the
    // pending row after the simulated processor delay.
    spawn_settlement(
        state.db.clone(),
        SettlementConfig {
            delay_ms: state.config.settlement_delay_ms,
            success_rate: state.config.settlement_success_rate,
        },
        payment.transaction_id.clone(),
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatePaymentResponse {
            message: "Payment processing initiated".to_string(),
            transaction_id: payment.transaction_id,
            status: payment.status,
            original_amount: original,
            commission_amount: commission,
            total_amount: total,
            currency,
            card_type: card_validation.card_type,
            masked_card_number: card_validation.masked_number,
            estimated_processing_time: format!(
                "{} seconds",
                state.config.settlement_delay_ms.div_ceil(1000)
            ),
        }),
    ))
}

// --- GET /payments/status/:transaction_id ---

pub async fn payment_status(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let payment = queries::get_payment(&state.db, &transaction_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;

    Ok(Json(decrypted_view(&payment, &state.cipher)?))
}

// --- GET /payments/history/:user_id ---

#[derive(Deserialize)]
pub struct HistoryParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub user_id: i64,
    pub payments: Vec<PaymentView>,
    pub pagination: PaginationMeta,
}

pub async fn payment_history(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    // Ownership: callers may only read their own ledger.
    if user.id != user_id {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let status = match params.status.as_deref() {
        None => None,
        Some(raw) => Some(PaymentStatus::parse(raw).ok_or_else(|| {
            AppError::BadRequest(format!(
                "invalid status filter '{}', expected one of: pending, completed, failed, refunded",
                raw
            ))
        })?),
    };

    let (page, limit) = validation::clamp_pagination(params.page, params.limit);
    let offset = (page - 1) * limit;

    let payments = queries::list_user_payments(&state.db, user_id, status, limit, offset).await?;
    let total = queries::count_user_payments(&state.db, user_id, status).await?;

    let payments = payments
        .iter()
        .map(|p| decrypted_view(p, &state.cipher))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(HistoryResponse {
        user_id,
        payments,
        pagination: PaginationMeta {
            page,
            limit,
            total,
            pages: validation::total_pages(total, limit),
        },
    }))
}

// --- POST /payments/refund ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub transaction_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub message: String,
    pub original_transaction_id: String,
    pub refund_transaction_id: String,
    pub refunded_amount: BigDecimal,
    pub refunded_original_amount: BigDecimal,
    pub refunded_commission_amount: BigDecimal,
    pub currency: String,
    pub reason: String,
}

pub async fn refund_payment(
    State(state): State<AppState>,
    Json(body): Json<RefundRequest>,
) -> Result<impl IntoResponse, AppError> {
    validation::require_fields(&[("transactionId", body.transaction_id.is_some())])?;
    let transaction_id = body.transaction_id.unwrap_or_default();

    let outcome = RefundService::new(state.db.clone())
        .refund(&transaction_id, body.reason)
        .await?;

    Ok(Json(RefundResponse {
        message: "Refund processed successfully".to_string(),
        original_transaction_id: outcome.original.transaction_id,
        refund_transaction_id: outcome.ledger_row.transaction_id,
        refunded_amount: outcome.original.amount,
        refunded_original_amount: outcome.original.original_amount,
        refunded_commission_amount: outcome.original.commission_amount,
        currency: outcome.original.currency,
        reason: outcome.refund.reason,
    }))
}

// --- GET /payments/stats ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsPeriod {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBody {
    pub total_transactions: i64,
    pub total_revenue: BigDecimal,
    pub total_original_revenue: BigDecimal,
    pub total_commission: BigDecimal,
    pub pending_transactions: i64,
    pub failed_transactions: i64,
    pub average_transaction_amount: BigDecimal,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub period: StatsPeriod,
    pub statistics: StatsBody,
}

pub async fn payment_stats(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<impl IntoResponse, AppError> {
    let start = params
        .start_date
        .as_deref()
        .map(|raw| validation::parse_window_bound(raw, false))
        .transpose()?;
    let end = params
        .end_date
        .as_deref()
        .map(|raw| validation::parse_window_bound(raw, true))
        .transpose()?;

    let stats = queries::ledger_stats(&state.db, start, end).await?;

    Ok(Json(StatsResponse {
        period: StatsPeriod {
            start_date: params.start_date.unwrap_or_else(|| "all time".to_string()),
            end_date: params.end_date.unwrap_or_else(|| "now".to_string()),
        },
        statistics: StatsBody {
            total_transactions: stats.total_transactions,
            total_revenue: stats.total_revenue,
            total_original_revenue: stats.total_original_revenue,
            total_commission: stats.total_commission,
            pending_transactions: stats.pending_transactions,
            failed_transactions: stats.failed_transactions,
            average_transaction_amount: stats.average_transaction_amount.round(2),
        },
    }))
}
