/// Fixed body for the hosting platform's "is the process alive" probe.
pub const LIVENESS_BODY: &str = "Billow HubSpot Update Service is running!";

/// Says nothing about reconciliation health, only that the process answers.
pub async fn get_liveness() -> &'static str {
    LIVENESS_BODY
}
