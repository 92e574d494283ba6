//! Re-render Adapter
//!
//! Connects cells to a UI framework's components. The framework supplies two
//! things: a stable [`ComponentId`] per component instance and a
//! [`RerenderHost`] that can schedule a re-render. [`bind`] subscribes a
//! component to any cell, signal or computed, and returns a [`Binding`]
//! whose value accessor the component reads while rendering.
//!
//! # Threading
//!
//! Bindings live on the cells' thread. Hosts that hand work to a UI thread
//! ([`RenderQueue`], [`RenderChannel`]) never block for long: the queue
//! waits at most [`QueueConfig::lock_timeout`] for its lock and the channel
//! never waits.

mod binding;
mod component;
mod config;
mod host;

pub use binding::{bind, bind_fn, Binding, BindingState};
pub use component::ComponentId;
pub use config::{BindOptions, QueueConfig};
pub use host::{render_channel, Fallback, RenderChannel, RenderQueue, RerenderHost};
