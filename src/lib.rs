//! sweepbox: swept-AABB movement resolution over a persistent uniform-grid world

pub mod types;
pub mod api;
pub mod error;
pub mod tags;
pub mod world;
pub mod narrowphase;
pub mod movement;
pub mod response;

pub use crate::types::*;
pub use crate::api::*;
pub use crate::error::{CollisionError, Result, SelectorError};
pub use crate::tags::{Tag, TagSet};
pub use crate::world::World;
pub use crate::narrowphase::{Narrowphase, CONTACT_EPSILON};
pub use crate::movement::{BoxView, Collision};
pub use crate::response::{Response, TagRules};
