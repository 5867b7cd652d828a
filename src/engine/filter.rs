use serde::Deserialize;

use crate::models::request::{AssignmentStatus, PickupRequest, RequestStatus};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<RequestStatus>,
    #[serde(default)]
    pub assignment_status: Option<AssignmentStatus>,
}

impl RequestFilter {
    pub fn matches(&self, request: &PickupRequest) -> bool {
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            let haystacks = [
                Some(request.code.as_str()),
                Some(request.material.as_str()),
                request.user_name.as_deref(),
                request.user_lastname.as_deref(),
            ];
            let found = haystacks
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&term));
            if !found {
                return false;
            }
        }

        if self.status.is_some_and(|status| request.status != status) {
            return false;
        }

        if self
            .assignment_status
            .is_some_and(|assignment| request.assignment_status != assignment)
        {
            return false;
        }

        true
    }
}

pub fn filter_requests(requests: Vec<PickupRequest>, filter: &RequestFilter) -> Vec<PickupRequest> {
    requests
        .into_iter()
        .filter(|request| filter.matches(request))
        .collect()
}
