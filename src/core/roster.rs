//! Eligible worker resolution.

use super::error::DispatchError;
use super::model::WorkerId;
use super::store::WorkerRoster;

/// Resolve the workers that may receive kitchen work.
///
/// Active roster members win. When nobody is marked active the set falls back
/// to every enabled account holding `cook_role`. The result keeps the
/// backend's order and drops duplicates.
pub async fn resolve_eligible<R>(roster: &R, cook_role: &str) -> Result<Vec<WorkerId>, DispatchError>
where
    R: WorkerRoster + ?Sized,
{
    let active = dedup(roster.active_workers().await?);
    if !active.is_empty() {
        return Ok(active);
    }

    let cooks = dedup(roster.enabled_with_role(cook_role).await?);
    tracing::debug!(role = cook_role, cooks = ?cooks, "no active roster, falling back to role");
    Ok(cooks)
}

fn dedup(ids: Vec<WorkerId>) -> Vec<WorkerId> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
