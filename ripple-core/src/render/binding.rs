//! Re-render bindings.
//!
//! A [`Binding`] ties one cell to one component: every time the cell
//! notifies, the binding asks its [`RerenderHost`] to re-render the
//! component. It also exposes the cell's current value for the component's
//! render code.
//!
//! # Failure Handling
//!
//! A binding never lets a UI-plumbing failure escape into the cell's
//! notification. Errors and panics from the host are counted, logged, and
//! dropped, so the `set` that triggered them completes normally and later
//! listeners still run.
//!
//! # Lifecycle
//!
//! `Bound` → `Disposed`, once. Disposal only stops re-render requests; the
//! value accessor keeps reading the live cell.

use std::borrow::Cow;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::component::ComponentId;
use super::config::BindOptions;
use super::host::{attempt, RerenderHost};
use crate::reactive::{Observable, Subscription};

/// State of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Bound,
    Disposed,
}

/// Per-binding state shared with the cell listener.
struct BindingShared {
    component: ComponentId,
    label: Option<Cow<'static, str>>,
    quiet_failures: bool,
    host: Box<dyn RerenderHost>,
    state: Cell<BindingState>,
    requests: Cell<u64>,
    failures: Cell<u64>,
}

impl BindingShared {
    fn rerender(&self) {
        if self.state.get() == BindingState::Disposed {
            return;
        }
        self.requests.set(self.requests.get() + 1);

        if let Err(error) = attempt(self.host.as_ref(), self.component) {
            self.failures.set(self.failures.get() + 1);
            let label = self.label.as_deref().unwrap_or("");
            if self.quiet_failures {
                tracing::debug!(component = %self.component, label, %error, "re-render request dropped");
            } else {
                tracing::warn!(component = %self.component, label, %error, "re-render request dropped");
            }
        }
    }
}

/// A cell bound to a component's re-render.
///
/// Dropping the binding disposes it.
pub struct Binding<T> {
    cell: Rc<dyn Observable<T>>,
    shared: Rc<BindingShared>,
    subscription: Subscription,
}

impl<T> Binding<T>
where
    T: 'static,
{
    /// Bind `cell` to `component` with default options.
    pub fn bind<C, H>(cell: &C, component: ComponentId, host: H) -> Self
    where
        C: Observable<T> + Clone + 'static,
        H: RerenderHost + 'static,
    {
        Self::bind_with(cell, component, host, BindOptions::default())
    }

    /// Bind `cell` to `component`.
    ///
    /// The cell replays its value on subscription; with
    /// [`BindOptions::rerender_on_bind`] set that replay also requests a
    /// re-render.
    pub fn bind_with<C, H>(cell: &C, component: ComponentId, host: H, options: BindOptions) -> Self
    where
        C: Observable<T> + Clone + 'static,
        H: RerenderHost + 'static,
    {
        let shared = Rc::new(BindingShared {
            component,
            label: options.label,
            quiet_failures: options.quiet_failures,
            host: Box::new(host),
            state: Cell::new(BindingState::Bound),
            requests: Cell::new(0),
            failures: Cell::new(0),
        });

        let skip_replay = Cell::new(!options.rerender_on_bind);
        let listener_shared = Rc::clone(&shared);
        let subscription = cell.subscribe_dyn(Rc::new(move |_: &T| {
            if skip_replay.replace(false) {
                return;
            }
            listener_shared.rerender();
        }));

        tracing::debug!(
            %component,
            cell = %cell.cell_id(),
            label = shared.label.as_deref().unwrap_or(""),
            "bound"
        );

        Self {
            cell: Rc::new(cell.clone()),
            shared,
            subscription,
        }
    }

    /// Current value of the bound cell.
    pub fn value(&self) -> T {
        self.cell.get()
    }

    /// Invoke-style accessor; same as [`value`](Binding::value).
    pub fn get(&self) -> T {
        self.value()
    }

    /// A standalone accessor for the bound cell's value.
    ///
    /// The accessor holds the cell, not the binding, so it keeps working
    /// after the binding is disposed or dropped.
    pub fn accessor(&self) -> impl Fn() -> T {
        let cell = Rc::clone(&self.cell);
        move || cell.get()
    }

    /// The component this binding re-renders.
    pub fn component(&self) -> ComponentId {
        self.shared.component
    }

    /// Label from [`BindOptions::label`], if any.
    pub fn label(&self) -> Option<&str> {
        self.shared.label.as_deref()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BindingState {
        self.shared.state.get()
    }

    /// Whether [`dispose`](Binding::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.state() == BindingState::Disposed
    }

    /// Stop requesting re-renders. Calling this again does nothing.
    pub fn dispose(&self) {
        if self.shared.state.replace(BindingState::Disposed) == BindingState::Disposed {
            return;
        }
        self.subscription.dispose();
        tracing::debug!(component = %self.shared.component, "binding disposed");
    }

    /// Re-render requests issued so far, failed ones included.
    pub fn requests(&self) -> u64 {
        self.shared.requests.get()
    }

    /// Requests the host rejected or panicked on.
    pub fn failures(&self) -> u64 {
        self.shared.failures.get()
    }
}

impl<T> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("component", &self.shared.component)
            .field("cell", &self.cell.cell_id())
            .field("label", &self.shared.label)
            .field("state", &self.shared.state.get())
            .field("requests", &self.shared.requests.get())
            .field("failures", &self.shared.failures.get())
            .finish()
    }
}

/// Bind `cell` to `component` with default options.
pub fn bind<T, C, H>(cell: &C, component: ComponentId, host: H) -> Binding<T>
where
    T: 'static,
    C: Observable<T> + Clone + 'static,
    H: RerenderHost + 'static,
{
    Binding::bind(cell, component, host)
}

/// Bind `cell` to `component` and return only the value accessor.
///
/// The closure owns the binding; dropping the closure disposes it.
pub fn bind_fn<T, C, H>(cell: &C, component: ComponentId, host: H) -> impl Fn() -> T
where
    T: 'static,
    C: Observable<T> + Clone + 'static,
    H: RerenderHost + 'static,
{
    let binding = Binding::bind(cell, component, host);
    move || binding.value()
}
