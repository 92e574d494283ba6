//! Errors reported by re-render hosts.
//!
//! These never escape a notification: the binding that asked for the
//! re-render absorbs and logs them. Hosts return them so that a
//! [`Fallback`](crate::render::Fallback) chain can move on to the next
//! strategy.

use thiserror::Error;

use crate::render::ComponentId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RerenderError {
    #[error("component {0} is not mounted")]
    Unmounted(ComponentId),

    #[error("render queue is closed")]
    QueueClosed,

    #[error("render queue is full. capacity: {capacity}")]
    QueueFull { capacity: usize },

    #[error("render queue lock not acquired in time")]
    Busy,

    #[error("render channel receiver dropped")]
    Disconnected,

    #[error("re-render host panicked: {0}")]
    Panicked(String),

    #[error("all {attempts} re-render strategies failed. last: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<RerenderError>,
    },
}

pub type RerenderResult = Result<(), RerenderError>;
