// ABOUTME: Promotion state marker types for the type state pattern.
// ABOUTME: Zero-sized types make out-of-order stages unrepresentable.

/// Nothing deployed yet.
/// Available actions: `deploy_staging()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Pending;

/// Staging deploy exited cleanly.
/// Available actions: `verify_staging()`
#[derive(Debug, Clone, Copy, Default)]
pub struct StagingDeployed;

/// Staging verified healthy.
/// Available actions: `request_approval()`
#[derive(Debug, Clone, Copy, Default)]
pub struct StagingVerified;

/// Promotion approved.
/// Available actions: `deploy_production()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Approved;

/// Production deploy exited cleanly.
/// Available actions: `verify_production()`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductionDeployed;

/// Production verified healthy.
/// Available actions: `finish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Promoted;
