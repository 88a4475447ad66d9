//! Payments Module
//!
//! Payment initiation and gateway callback reconciliation:
//!
//! - **gateway**: pure client: signed redirect URL building, callback
//!   signature verification
//! - **reconciler**: owns the Payment record lifecycle and drives the
//!   order PAID transition on verified success
//!
//! # Callback Flow
//!
//! ```text
//! gateway ──► browser redirect ──► /api/payments/callback
//!                                        │
//!                         verify ► lookup ► idempotency ► amount ► settle
//!                                        │
//!                              OrderService.transition(PAID)
//!                                        │
//!                              FanoutHub (order:<id> + admin)
//! ```

pub mod gateway;
pub mod reconciler;

pub use gateway::{GatewayClient, GatewayConfig};
pub use reconciler::{PaymentError, PaymentInitiation, PaymentReconciler, ReconcileOutcome};
