use glam::Vec2;

use crate::error::{CollisionError, Result};
use crate::movement::Collision;
use crate::tags::{Tag, TagSet};

/// How the simulator continues after a contact.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Response {
    /// Halt flush against the obstacle; the rest of the motion is dropped.
    Stop,
    /// Halt at contact, then continue with the normal component removed.
    Slide,
    /// Halt at contact, then continue with the normal component reflected and
    /// scaled by `restitution` (1.0 mirrors, 0.0 behaves like `Slide`).
    Bounce { restitution: f32 },
    /// Record the contact but let the motion pass through.
    Ignore,
}

impl Response {
    /// Perfectly elastic bounce.
    pub const BOUNCE: Response = Response::Bounce { restitution: 1.0 };

    /// Whether this response constrains the motion.
    pub fn is_blocking(self) -> bool {
        !matches!(self, Response::Ignore)
    }

    /// Motion to attempt after a blocking contact with `normal`, given the
    /// `remaining` part of the step. `None` ends the motion at the contact.
    pub fn redirect(self, remaining: Vec2, normal: Vec2) -> Option<Vec2> {
        match self {
            Response::Stop | Response::Ignore => None,
            Response::Slide => Some(remaining - normal * remaining.dot(normal)),
            Response::Bounce { restitution } => {
                Some(remaining - normal * ((1.0 + restitution) * remaining.dot(normal)))
            }
        }
    }

    pub(crate) fn validate(self) -> Result<()> {
        match self {
            Response::Bounce { restitution } if !(restitution.is_finite() && restitution >= 0.0) => {
                Err(CollisionError::InvalidGeometry {
                    reason: "bounce restitution must be finite and non-negative",
                })
            }
            _ => Ok(()),
        }
    }
}

/// Tag-driven response selection.
///
/// Rules are checked in insertion order against the other box's tags; the first
/// rule with a tag in common wins, otherwise `fallback` applies. A rule's
/// response may be `None` ("no constraint"). `ignore_shared` tags short-circuit
/// everything when both boxes carry one of them.
///
/// ```
/// use glam::Vec2;
/// use sweepbox::*;
///
/// const SOLID: u32 = 0;
/// const COIN: u32 = 1;
/// const GHOST: u32 = 2;
///
/// let rules = TagRules::new(None)
///     .ignore_shared([GHOST])
///     .rule([SOLID], Some(Response::Slide))
///     .rule([COIN], Some(Response::Ignore));
///
/// let mut world: World<()> = World::new(WorldConfig::default());
/// let hero = world.create(0.0, 0.0, 10.0, 10.0, ()).unwrap();
/// let wall = world.create(15.0, -20.0, 10.0, 50.0, ()).unwrap();
/// world.add_tags(wall, [SOLID]).unwrap();
///
/// let m = world.move_to(hero, Vec2::new(20.0, 10.0), |c| rules.select(c)).unwrap();
/// assert_eq!(m.destination.pos, Vec2::new(5.0, 10.0));
/// ```
#[derive(Clone, Debug, Default)]
pub struct TagRules {
    shared_ignore: TagSet,
    rules: Vec<(TagSet, Option<Response>)>,
    fallback: Option<Response>,
}

impl TagRules {
    pub fn new(fallback: Option<Response>) -> Self {
        Self {
            fallback,
            ..Self::default()
        }
    }

    pub fn rule<T: Tag>(mut self, tags: impl IntoIterator<Item = T>, response: Option<Response>) -> Self {
        self.rules.push((tags.into_iter().collect(), response));
        self
    }

    pub fn ignore_shared<T: Tag>(mut self, tags: impl IntoIterator<Item = T>) -> Self {
        self.shared_ignore.extend(tags);
        self
    }

    pub fn select<P>(&self, c: &Collision<'_, P>) -> Option<Response> {
        if c.mover.tags.has_any(&self.shared_ignore) && c.other.tags.has_any(&self.shared_ignore) {
            return None;
        }
        self.rules
            .iter()
            .find(|(tags, _)| c.other.tags.has_any(tags))
            .map_or(self.fallback, |(_, response)| *response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::movement::BoxView;
    use crate::types::{BoxId, Rect};

    fn collision<'a>(mover: &'a TagSet, other: &'a TagSet) -> Collision<'a, ()> {
        let view = |tags: &'a TagSet| BoxView {
            id: BoxId::default(),
            bounds: Rect::new(0.0, 0.0, 1.0, 1.0),
            tags,
            payload: &(),
        };
        Collision {
            mover: view(mover),
            other: view(other),
            toi: 0.5,
            normal: Vec2::new(-1.0, 0.0),
            delta: Vec2::new(2.0, 0.0),
            depth: 0,
        }
    }

    #[test]
    fn test_slide_removes_normal_component() {
        let out = Response::Slide
            .redirect(Vec2::new(15.0, 15.0), Vec2::new(-1.0, 0.0))
            .unwrap();
        assert_eq!(out, Vec2::new(0.0, 15.0));
    }

    #[test]
    fn test_bounce_reflects_normal_component() {
        let out = Response::BOUNCE
            .redirect(Vec2::new(4.0, 6.0), Vec2::new(0.0, -1.0))
            .unwrap();
        assert_eq!(out, Vec2::new(4.0, -6.0));
        let damped = Response::Bounce { restitution: 0.0 }
            .redirect(Vec2::new(4.0, 6.0), Vec2::new(0.0, -1.0))
            .unwrap();
        assert_eq!(damped, Vec2::new(4.0, 0.0));
    }

    #[test]
    fn test_stop_and_ignore_end_motion() {
        assert!(Response::Stop.redirect(Vec2::ONE, Vec2::X).is_none());
        assert!(Response::Ignore.redirect(Vec2::ONE, Vec2::X).is_none());
        assert!(Response::Stop.is_blocking());
        assert!(!Response::Ignore.is_blocking());
    }

    #[test]
    fn test_validate_restitution() {
        assert!(Response::BOUNCE.validate().is_ok());
        assert!(Response::Bounce { restitution: f32::NAN }.validate().is_err());
        assert!(Response::Bounce { restitution: -0.5 }.validate().is_err());
    }

    #[test]
    fn test_tag_rules_first_match_and_fallback() {
        let rules = TagRules::new(Some(Response::Stop))
            .rule([1u32], Some(Response::Slide))
            .rule([1u32, 2], None);
        let hero = TagSet::new();
        let solid: TagSet = [1u32].into_iter().collect();
        let pickup: TagSet = [2u32].into_iter().collect();
        let plain = TagSet::new();
        assert_eq!(rules.select(&collision(&hero, &solid)), Some(Response::Slide));
        assert_eq!(rules.select(&collision(&hero, &pickup)), None);
        assert_eq!(rules.select(&collision(&hero, &plain)), Some(Response::Stop));
    }

    #[test]
    fn test_tag_rules_shared_ignore_needs_both_sides() {
        let rules = TagRules::new(Some(Response::Slide)).ignore_shared([7u32]);
        let ghost: TagSet = [7u32].into_iter().collect();
        let plain = TagSet::new();
        assert_eq!(rules.select(&collision(&ghost, &ghost)), None);
        assert_eq!(rules.select(&collision(&ghost, &plain)), Some(Response::Slide));
        assert_eq!(rules.select(&collision(&plain, &ghost)), Some(Response::Slide));
    }
}
