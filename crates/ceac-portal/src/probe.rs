use ceac_core::{format_portal_date, Credentials, QueryCredentials, QueryRequest, StatusRecord};
use chrono::Local;

/// Case number answered locally when the debug probe is enabled.
pub const PROBE_CASE_NUMBER: &str = "TEST";

/// Whether `request` targets the debug probe case.
#[must_use]
pub fn is_probe(request: &QueryRequest) -> bool {
    request.case_number.as_str() == PROBE_CASE_NUMBER
}

/// Synthetic record that echoes the request, for checking a deployment
/// end to end without touching the portal.
#[must_use]
pub fn probe_record(request: &QueryRequest) -> StatusRecord {
    let now = Local::now();
    let (passport_number, surname) = match &request.credentials {
        QueryCredentials::Plain(Credentials {
            passport_number,
            surname,
        }) => (passport_number.as_str(), surname.as_str()),
        QueryCredentials::None | QueryCredentials::Encrypted(_) => ("", ""),
    };
    StatusRecord {
        status: format!("DEBUG_INFO_{}", now.format("%Y-%m-%d %H:%M:%S%.6f")),
        submit_date: "01-Jan-2024".to_string(),
        status_date: format_portal_date(now.date_naive()),
        message: format!(
            "DEBUG_{}_{}_{passport_number}_{surname}",
            request.location, request.case_number
        ),
    }
}
