use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::ApiResult;

/// One-time fee a student pays to enroll with a teacher.
pub const ENROLLMENT_FEE: f64 = 100.0;

/// One-time subscription fee for teacher onboarding.
pub const TEACHER_FEE: f64 = 50.0;

impl ApiClient {
    /// Forward a completed payment-provider capture to the backend. The
    /// `payment` blob is the provider's order record, passed through opaquely.
    pub async fn record_payment(&self, payment: Value, subject: &str) -> ApiResult<()> {
        self.post_unit("/payment/create", json!({ "payment": payment, "subject": subject }))
            .await
    }

    /// Register the teacher-onboarding subscription after its payment
    /// captured successfully.
    pub async fn create_subscription(&self, provider_subscription_id: &str, amount: f64) -> ApiResult<()> {
        self.post_unit(
            "/subscription/create",
            json!({ "paypalSubscriptionId": provider_subscription_id, "amount": amount }),
        )
        .await
    }

    /// The whole become-a-teacher transition as the onboarding modal runs
    /// it: request the role, record the payment, register the subscription.
    pub async fn activate_teacher(&self, subjects: &[String], payment: Value) -> ApiResult<()> {
        let subject = subjects.first().map(|s| s.as_str()).unwrap_or("");
        let provider_id = payment
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        self.request_teacher(subjects).await?;
        self.record_payment(payment, subject).await?;
        self.create_subscription(&provider_id, TEACHER_FEE).await
    }
}
