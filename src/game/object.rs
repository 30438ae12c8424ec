//! Game objects and the arena that owns them
//!
//! Every object lives in a [`SlotMap`]; everything else (the spatial grid,
//! controllers, bombs pointing at their owner) holds an [`ObjectId`]. A
//! handle whose object has been removed never resolves again, so a stale
//! reference fails lookup instead of reaching freed data.

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::game::constants::{bomb, bomber, extra};
use crate::game::coords::GridCoord;
use crate::util::vec2::Vec2;

new_key_type! {
    /// Generation-checked handle to an object in the world arena
    pub struct ObjectId;
}

/// Arena of all objects in a match
pub type Objects = SlotMap<ObjectId, GameObject>;

/// Object category used for spatial filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Bomber,
    BomberCorpse,
    Bomb,
    Extra,
    Explosion,
}

/// Pickup variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtraKind {
    /// One more bomb on the field at once
    Bomb,
    /// One more tile of explosion range
    Flame,
    /// Faster movement
    Speed,
    /// Slower movement
    Disease,
}

impl ExtraKind {
    pub const ALL: [ExtraKind; 4] = [ExtraKind::Bomb, ExtraKind::Flame, ExtraKind::Speed, ExtraKind::Disease];
}

#[derive(Debug, Clone)]
pub struct BomberState {
    pub name: String,
    pub speed: f32,
    pub power: u32,
    pub max_bombs: u32,
    pub bombs_placed: u32,
    pub dead: bool,
    pub kills: u32,
}

impl BomberState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            speed: bomber::BASE_SPEED,
            power: bomber::BASE_POWER,
            max_bombs: bomber::BASE_MAX_BOMBS,
            bombs_placed: 0,
            dead: false,
            kills: 0,
        }
    }

    pub fn can_place_bomb(&self) -> bool {
        !self.dead && self.bombs_placed < self.max_bombs
    }

    /// Apply a pickup's effect
    pub fn apply_extra(&mut self, kind: ExtraKind) {
        match kind {
            ExtraKind::Bomb => self.max_bombs += 1,
            ExtraKind::Flame => self.power = (self.power + 1).min(bomber::MAX_POWER),
            ExtraKind::Speed => {
                self.speed = (self.speed + extra::SPEED_BONUS).min(bomber::MAX_SPEED);
            }
            ExtraKind::Disease => {
                self.speed = (self.speed - extra::DISEASE_PENALTY).max(bomber::MIN_SPEED);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct BombState {
    /// Seconds until detonation
    pub fuse: f32,
    pub power: u32,
    pub owner: Option<ObjectId>,
}

impl BombState {
    pub fn new(power: u32, owner: Option<ObjectId>) -> Self {
        Self {
            fuse: bomb::FUSE,
            power,
            owner,
        }
    }
}

/// Per-kind object data
#[derive(Debug, Clone)]
pub enum ObjectBody {
    Bomber(BomberState),
    BomberCorpse,
    Bomb(BombState),
    Extra(ExtraKind),
    Explosion {
        remaining: f32,
        owner: Option<ObjectId>,
    },
}

#[derive(Debug, Clone)]
pub struct GameObject {
    /// Centre of the object in pixels
    pub position: Vec2,
    /// Set when the object is logically destroyed; reaped at the end of the tick
    pub delete_me: bool,
    pub body: ObjectBody,
}

impl GameObject {
    pub fn new(position: Vec2, body: ObjectBody) -> Self {
        Self {
            position,
            delete_me: false,
            body,
        }
    }

    pub fn bomber(position: Vec2, name: impl Into<String>) -> Self {
        Self::new(position, ObjectBody::Bomber(BomberState::new(name)))
    }

    pub fn bomb(position: Vec2, power: u32, owner: Option<ObjectId>) -> Self {
        Self::new(position, ObjectBody::Bomb(BombState::new(power, owner)))
    }

    pub fn extra(position: Vec2, kind: ExtraKind) -> Self {
        Self::new(position, ObjectBody::Extra(kind))
    }

    pub fn kind(&self) -> ObjectKind {
        match self.body {
            ObjectBody::Bomber(_) => ObjectKind::Bomber,
            ObjectBody::BomberCorpse => ObjectKind::BomberCorpse,
            ObjectBody::Bomb(_) => ObjectKind::Bomb,
            ObjectBody::Extra(_) => ObjectKind::Extra,
            ObjectBody::Explosion { .. } => ObjectKind::Explosion,
        }
    }

    #[inline]
    pub fn is_kind(&self, kind: Option<ObjectKind>) -> bool {
        kind.map_or(true, |k| self.kind() == k)
    }

    /// Tile the object currently occupies
    #[inline]
    pub fn tile(&self) -> GridCoord {
        GridCoord::from_pixel(self.position)
    }

    /// Not marked for destruction, and not a dead bomber
    pub fn is_alive(&self) -> bool {
        if self.delete_me {
            return false;
        }
        match &self.body {
            ObjectBody::Bomber(b) => !b.dead,
            _ => true,
        }
    }

    pub fn as_bomber(&self) -> Option<&BomberState> {
        match &self.body {
            ObjectBody::Bomber(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bomber_mut(&mut self) -> Option<&mut BomberState> {
        match &mut self.body {
            ObjectBody::Bomber(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bomb(&self) -> Option<&BombState> {
        match &self.body {
            ObjectBody::Bomb(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bomb_mut(&mut self) -> Option<&mut BombState> {
        match &mut self.body {
            ObjectBody::Bomb(b) => Some(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_handle_fails_lookup() {
        let mut objects = Objects::with_key();
        let id = objects.insert(GameObject::extra(Vec2::ZERO, ExtraKind::Bomb));
        objects.remove(id);
        let reused = objects.insert(GameObject::extra(Vec2::ZERO, ExtraKind::Flame));

        assert!(objects.get(id).is_none());
        assert!(objects.get(reused).is_some());
        assert_ne!(id, reused);
    }

    #[test]
    fn test_kind_and_liveness() {
        let mut bomber = GameObject::bomber(Vec2::new(60.0, 60.0), "Test");
        assert_eq!(bomber.kind(), ObjectKind::Bomber);
        assert!(bomber.is_kind(None));
        assert!(bomber.is_kind(Some(ObjectKind::Bomber)));
        assert!(!bomber.is_kind(Some(ObjectKind::Bomb)));
        assert!(bomber.is_alive());

        bomber.as_bomber_mut().unwrap().dead = true;
        assert!(!bomber.is_alive());

        let mut bomb = GameObject::bomb(Vec2::ZERO, 2, None);
        bomb.delete_me = true;
        assert!(!bomb.is_alive());
    }

    #[test]
    fn test_apply_extra_clamps() {
        let mut b = BomberState::new("Test");
        for _ in 0..10 {
            b.apply_extra(ExtraKind::Disease);
        }
        assert_eq!(b.speed, bomber::MIN_SPEED);

        b.apply_extra(ExtraKind::Bomb);
        assert_eq!(b.max_bombs, 2);
        assert!(b.can_place_bomb());

        for _ in 0..20 {
            b.apply_extra(ExtraKind::Flame);
        }
        assert_eq!(b.power, bomber::MAX_POWER);
    }
}
