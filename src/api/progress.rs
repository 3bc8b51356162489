use serde_json::json;

use crate::client::ApiClient;
use crate::error::ApiResult;
use crate::models::Progress;

impl ApiClient {
    pub async fn student_progress(&self, student_id: &str) -> ApiResult<Vec<Progress>> {
        let path = format!("/progress/student/{}", urlencoding::encode(student_id));
        self.get_json(&path).await
    }

    /// Record the certificate fee as paid for a completed course.
    pub async fn record_certificate_payment(&self, progress_id: &str) -> ApiResult<()> {
        let path = format!("/progress/{}/payment", urlencoding::encode(progress_id));
        self.put_unit(&path, json!({})).await
    }

    /// Ask the server to issue the certificate for a paid, completed course.
    pub async fn issue_certificate(&self, progress_id: &str) -> ApiResult<()> {
        let path = format!("/progress/{}/certificate", urlencoding::encode(progress_id));
        self.put_unit(&path, json!({})).await
    }

    /// The progress screen's pay-and-get action: payment first, issuance
    /// second. Issuance is not attempted when the payment call failed.
    pub async fn claim_certificate(&self, progress_id: &str) -> ApiResult<()> {
        self.record_certificate_payment(progress_id).await?;
        self.issue_certificate(progress_id).await
    }
}
