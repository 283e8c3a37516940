use crate::{
    research::roles::{Complexity, HunterCapabilities, HunterProfile, TeamCoverage},
    types::HunterType,
    AppState,
};
use axum::{extract::State, Json};
use serde::Serialize;
use std::collections::BTreeMap;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Hunter profiles and the team picked for each complexity.
pub async fn list_roles(State(state): State<AppState>) -> Json<RolesResponse> {
    let roles = &state.roles;
    let teams = [
        Complexity::Simple,
        Complexity::Standard,
        Complexity::Complex,
        Complexity::VerificationHeavy,
    ]
    .into_iter()
    .map(|complexity| {
        let members = roles.optimal_team(complexity);
        let coverage = roles.validate_team_coverage(&members);
        (
            complexity.as_str().to_string(),
            TeamInfo { members, coverage },
        )
    })
    .collect();

    Json(RolesResponse {
        profiles: roles.profiles().into_iter().cloned().collect(),
        capabilities: HunterType::SEQUENCE
            .iter()
            .filter_map(|t| roles.capabilities(*t))
            .collect(),
        teams,
    })
}

#[derive(Serialize)]
pub struct RolesResponse {
    pub profiles: Vec<HunterProfile>,
    pub capabilities: Vec<HunterCapabilities>,
    pub teams: BTreeMap<String, TeamInfo>,
}

#[derive(Serialize)]
pub struct TeamInfo {
    pub members: Vec<HunterType>,
    pub coverage: TeamCoverage,
}
