//! Tests for the node resolver module.
//!
//! Organized by functionality:
//! - Dispatch and unsupported tags
//! - Simple-entity strategy (outcomes, outcome groups, courses, assignments)
//! - External-id strategy (terms and courses by SIS id)
//! - Composite-key strategy and anonymous grading
//! - Tenant isolation, soft deletes and store failures
