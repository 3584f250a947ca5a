//! Observable Core
//!
//! A graph of observable values with lazy derived views and path-aware change
//! propagation.
//!
//! - Source values ([`Var`]) that notify observers synchronously on change
//! - Path-scoped views ([`PropObservable`]) into structured values
//! - Mapped views ([`TransformObservable`]), one-way or two-way
//! - Views combined from several dependencies ([`DependentObservable`])
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `observable`: the [`Observable`] contract and the [`Var`] source node
//! - `prop`, `transform`, `dependent`: derived observables
//! - `path`: ancestry classification and path reads/writes on structured values
//! - `maybe`: uniform handling of plain and observable values
//! - `observer`, `equality`, `truthy`, `error`: supporting types
//!
//! Derived observables are cold until the first observer registers: they hold
//! no upstream subscription and compute on every read. The first observer makes
//! them hot; the last one leaving makes them cold again.
//!
//! # Example
//!
//! ```rust
//! use observable_core::{Observable, ObservableExt, PathObservable, Var};
//! use serde_json::json;
//!
//! let state = Var::new(json!({"user": {"name": "Ada"}, "count": 0}));
//! let name = state.prop("user.name");
//!
//! let _sub = name.observe(|value, path| println!("name: {value} ({path:?})"));
//!
//! // Unrelated path: the name observer is not called.
//! state.set_path("count", json!(1)).unwrap();
//!
//! // Prints "name: "Grace" ("")".
//! state.set_path("user.name", json!("Grace")).unwrap();
//! assert_eq!(name.get(), json!("Grace"));
//! ```

pub mod dependent;
pub mod equality;
pub mod error;
mod link;
pub mod maybe;
pub mod observable;
pub mod observer;
pub mod path;
pub mod prop;
pub mod transform;
pub mod truthy;

pub use dependent::{all, any, Dependencies, DependentObservable, Upstream};
pub use equality::Equality;
pub use error::{ObservableError, Result};
pub use maybe::{combine, is_observable, observe, unwrap, wrap, MaybeObservable};
pub use observable::{
    Observable, ObservableExt, ObservableRef, PathObservable, PathObservableRef, Var,
};
pub use observer::{Observer, ObserverId, ObserverList, Subscription};
pub use path::{Ancestry, PathValue};
pub use prop::PropObservable;
pub use transform::{TransformObservable, Transformer};
pub use truthy::{Nullable, Truthy};
