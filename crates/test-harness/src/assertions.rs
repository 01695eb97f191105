//! Assertion helpers with diagnostic output.
//!
//! Every failure names the context and shows expected vs actual.

use customizer::{DecalSummary, SessionToUi};
use placement::{AttachedShape, CascadeTier, DecalResult};
use scene_kernel::{MaterialId, NodeId, ResourceCounts};

use crate::helpers::HarnessError;
use crate::workflow::SessionDriver;

/// The decal carried by a `DecalPlaced` or `ModelReady` response.
pub fn placed_decal<'a>(response: &'a SessionToUi, ctx: &str) -> Result<&'a DecalSummary, HarnessError> {
    match response {
        SessionToUi::DecalPlaced { decal } => Ok(decal),
        SessionToUi::ModelReady { decal: Some(decal), .. } => Ok(decal),
        other => Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] expected a placed decal, got {other:?}"),
        }),
    }
}

/// Assert the response reports a bake produced by the given tier.
pub fn assert_baked(response: &SessionToUi, tier: CascadeTier, ctx: &str) -> Result<(), HarnessError> {
    match placed_decal(response, ctx)? {
        DecalSummary::Baked { tier: actual, .. } if *actual == tier => Ok(()),
        other => Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] expected bake via {tier:?}, got {other:?}"),
        }),
    }
}

/// Assert the response reports an attached decal of the given shape.
pub fn assert_attached(
    response: &SessionToUi,
    shape: AttachedShape,
    ctx: &str,
) -> Result<(), HarnessError> {
    match placed_decal(response, ctx)? {
        DecalSummary::PlaneAttached { shape: actual, .. } if *actual == shape => Ok(()),
        other => Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] expected {shape:?} decal, got {other:?}"),
        }),
    }
}

pub fn assert_skipped(response: &SessionToUi, ctx: &str) -> Result<(), HarnessError> {
    match response {
        SessionToUi::DecalSkipped { .. } => Ok(()),
        other => Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] expected DecalSkipped, got {other:?}"),
        }),
    }
}

/// Assert two resource snapshots are identical.
pub fn assert_counts_eq(
    expected: ResourceCounts,
    actual: ResourceCounts,
    ctx: &str,
) -> Result<(), HarnessError> {
    if expected == actual {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] resource counts changed: expected {expected:?}, got {actual:?}"),
        })
    }
}

/// Assert `mesh` currently carries exactly `slots`.
pub fn assert_material_slots(
    driver: &SessionDriver,
    mesh: NodeId,
    slots: &[MaterialId],
    ctx: &str,
) -> Result<(), HarnessError> {
    let actual = &driver
        .session
        .scene()
        .mesh_data(mesh)
        .map_err(|e| HarnessError::AssertionFailed {
            detail: format!("[{ctx}] {e}"),
        })?
        .materials;
    if actual.as_slice() == slots {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] material slots: expected {slots:?}, got {actual:?}"),
        })
    }
}

/// Assert the current decal is baked into `mesh`.
pub fn assert_baked_on(driver: &SessionDriver, mesh: NodeId, ctx: &str) -> Result<(), HarnessError> {
    match driver.decal() {
        Some(DecalResult::Baked { mesh: actual, .. }) if *actual == mesh => Ok(()),
        other => Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] expected bake on {mesh:?}, got {other:?}"),
        }),
    }
}
