//! Lifecycle hooks.
//!
//! Hosts register [`Hooks`] implementations at startup through a
//! [`HookRegistry`]; the synchronizer calls every registered hook, in
//! registration order, at fixed points of the content lifecycle.
//!
//! ```rust
//! use shelf::hooks::{HookRegistry, Hooks};
//! use shelf::models::ContentObject;
//!
//! struct Signature;
//!
//! impl Hooks for Signature {
//!     fn before_create(&self, obj: &mut ContentObject) {
//!         obj.body.push_str("\n\n-- filed by shelf");
//!     }
//! }
//!
//! let mut hooks = HookRegistry::new();
//! hooks.register(Box::new(Signature));
//! assert_eq!(hooks.len(), 1);
//! ```

use crate::models::ContentObject;
use crate::users::User;

/// Callbacks invoked synchronously during content and user mutations.
///
/// Every method defaults to a no-op, so implementors only override the
/// events they care about. `on_*` hooks run only after the file (or user
/// record) has been durably written.
pub trait Hooks: Send + Sync {
    /// Called before an id is allocated; may edit the object in place.
    fn before_create(&self, _obj: &mut ContentObject) {}

    fn on_create(&self, _obj: &ContentObject) {}

    fn on_edit(&self, _obj: &ContentObject) {}

    fn on_user_create(&self, _user: &User) {}
}

#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Box<dyn Hooks>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn register(&mut self, hooks: Box<dyn Hooks>) {
        self.hooks.push(hooks);
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn before_create(&self, obj: &mut ContentObject) {
        for h in &self.hooks {
            h.before_create(obj);
        }
    }

    pub fn on_create(&self, obj: &ContentObject) {
        for h in &self.hooks {
            h.on_create(obj);
        }
    }

    pub fn on_edit(&self, obj: &ContentObject) {
        for h in &self.hooks {
            h.on_edit(obj);
        }
    }

    pub fn on_user_create(&self, user: &User) {
        for h in &self.hooks {
            h.on_user_create(user);
        }
    }
}
